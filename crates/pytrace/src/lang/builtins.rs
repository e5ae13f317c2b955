//! The builtin function table every [`crate::scope::Scope`] starts from.
//!
//! Grounded in `original_source/src/core/scope.py`'s `default_builtins_names`
//! introspection helper: the original lists CPython's `__builtins__` dict
//! keys, then `sandboxScope` removes the dangerous ones. Here the table is
//! this crate's own small builtin-function set rather than CPython's.

/// Names resolvable as builtins before any sandboxing is applied.
///
/// `compile`, `exec`, and `open` are listed here (and removed by
/// [`crate::scope::sandbox_scope`]) purely so the sandboxed-removal codepath
/// has something concrete to demonstrate; none of the three currently does
/// anything, since neither dynamic code compilation nor file I/O is wired
/// into the interpreter either way.
pub fn default_builtin_names() -> &'static [&'static str] {
    &[
        "print", "len", "range", "str", "int", "float", "bool", "list", "dict", "set", "tuple", "abs", "min", "max", "sum", "sorted", "isinstance", "type", "repr", "compile", "exec", "open",
    ]
}
