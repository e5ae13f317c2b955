//! Scope Builder (`spec.md` §4.A).
//!
//! Produces the initial globals environment a run executes against: a copy
//! of the builtins table, the synthetic file name, and — in sandbox mode —
//! a guarded `import` that only lets the allow-listed modules through.
//!
//! Ported from `original_source/src/core/scope.py`'s `Globals`/`Modules`
//! classes, generalized from a CPython `__builtins__` dict to this crate's
//! own builtin-function table.

use std::fmt;

use ahash::AHashSet;

/// The modules a sandboxed run is permitted to `import`.
///
/// This is the exact allow-list from `spec.md` §4.A: `{copy, datetime,
/// functools, itertools, math, random, re, string, time}`.
pub const SANDBOX_MODULE_ALLOWLIST: &[&str] = &["copy", "datetime", "functools", "itertools", "math", "random", "re", "string", "time"];

/// Builtins removed in sandbox mode because they let user code escape the
/// interpreter (read/write the filesystem, compile/execute fresh code).
pub const SANDBOX_REMOVED_BUILTINS: &[&str] = &["compile", "exec", "open"];

/// Error raised when `ScopeBuilder::set_builtin` is called after the
/// builtins slot has been replaced by something that is not a table — a
/// programmer error at configuration time, matching `spec.md` §7's "Scope
/// misuse (builtins replaced)" row (internal, N/A).
#[derive(Debug, Clone)]
pub struct ScopeMisuseError(pub String);

impl fmt::Display for ScopeMisuseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeError: {}", self.0)
    }
}

impl std::error::Error for ScopeMisuseError {}

/// The builtins slot a scope carries. Normally a table of present names;
/// `original_source`'s generic `Globals.property(key, value)` lets a
/// controller reassign `__builtins__` itself to anything, including a
/// non-mapping, so this slot is its own small enum rather than a bare
/// `AHashSet` in order to have somewhere to represent that corruption.
#[derive(Debug, Clone)]
enum BuiltinsSlot {
    Table(AHashSet<String>),
    Replaced(String),
}

/// Import policy attached to a built scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportPolicy {
    /// No restriction: any module name is accepted.
    Unrestricted,
    /// Only modules in the given allow-list may be imported; everything
    /// else raises a module-not-found failure inside the user program.
    Sandboxed { allowed: AHashSet<String> },
}

impl ImportPolicy {
    #[must_use]
    pub fn allows(&self, module: &str) -> bool {
        match self {
            ImportPolicy::Unrestricted => true,
            ImportPolicy::Sandboxed { allowed } => allowed.contains(module),
        }
    }
}

/// The built global environment a run executes in.
///
/// Corresponds to `spec.md`'s `Env`: a copy of the default builtins table,
/// the file name attributed to compiled code, the module name, and the
/// import policy. `Scope` is cheap to `clone()`, which is how `build()`
/// achieves the "returns a deep copy" isolation guarantee — mutations to
/// one built scope's builtins table never reach another.
#[derive(Debug, Clone)]
pub struct Scope {
    builtins: BuiltinsSlot,
    pub file: String,
    pub name: String,
    pub import_policy: ImportPolicy,
}

impl Scope {
    fn with_default_builtins(file: impl Into<String>) -> Self {
        Self {
            builtins: BuiltinsSlot::Table(crate::lang::builtins::default_builtin_names().iter().copied().map(str::to_owned).collect()),
            file: file.into(),
            name: "__main__".to_owned(),
            import_policy: ImportPolicy::Unrestricted,
        }
    }

    #[must_use]
    pub fn has_builtin(&self, name: &str) -> bool {
        match &self.builtins {
            BuiltinsSlot::Table(table) => table.contains(name),
            BuiltinsSlot::Replaced(_) => false,
        }
    }

    /// Lists the builtin names visible in this scope, supplementing
    /// `original_source`'s `default_builtins_names()` introspection helper.
    #[must_use]
    pub fn builtin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match &self.builtins {
            BuiltinsSlot::Table(table) => table.iter().cloned().collect(),
            BuiltinsSlot::Replaced(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// Lists the module names importable from this scope, supplementing
    /// `original_source`'s `default_modules_names()` helper.
    #[must_use]
    pub fn module_names(&self) -> Vec<&'static str> {
        match &self.import_policy {
            ImportPolicy::Unrestricted => SANDBOX_MODULE_ALLOWLIST.to_vec(),
            ImportPolicy::Sandboxed { .. } => SANDBOX_MODULE_ALLOWLIST.to_vec(),
        }
    }
}

/// Fluent builder for a [`Scope`], mirroring `original_source`'s
/// `Globals` builder (`.property(...)`, `.builtin(...)`, `.build()`).
#[derive(Debug)]
pub struct ScopeBuilder {
    scope: Scope,
}

impl ScopeBuilder {
    #[must_use]
    pub fn new(file: impl Into<String>) -> Self {
        Self { scope: Scope::with_default_builtins(file) }
    }

    /// Sets a named scope property. Only `name` is meaningful today; kept
    /// generic the way the original `Globals.property` is, for forward
    /// compatibility with controller-supplied metadata.
    #[must_use]
    pub fn property_name(mut self, name: impl Into<String>) -> Self {
        self.scope.name = name.into();
        self
    }

    /// Sets or removes a named builtin. `Some(())` marks `name` present
    /// (the only "value" a builtin carries in this table is its presence);
    /// `None` removes it, matching `spec.md` §4.A's "setting a builtin to
    /// null removes it". Fails if the builtins slot has been replaced by
    /// something that is not a table (see [`Self::replace_builtins_slot`]),
    /// matching the original's `AttributeError` on a non-mapping
    /// `__builtins__`.
    pub fn set_builtin(mut self, name: &str, value: Option<()>) -> Result<Self, ScopeMisuseError> {
        match &mut self.scope.builtins {
            BuiltinsSlot::Table(table) => {
                match value {
                    Some(()) => table.insert(name.to_owned()),
                    None => table.remove(name),
                };
                Ok(self)
            }
            BuiltinsSlot::Replaced(with) => Err(ScopeMisuseError(format!("'{with}' object has no attribute '{name}'"))),
        }
    }

    /// Removes a builtin from the table. A thin wrapper over
    /// [`Self::set_builtin`] with `value: None`, kept as a named entry
    /// point since removal (not assignment) is `sandboxScope`'s only use.
    pub fn remove_builtin(self, name: &str) -> Result<Self, ScopeMisuseError> {
        self.set_builtin(name, None)
    }

    /// Replaces the builtins slot itself with something that is not a
    /// table, the way a controller could reassign `__builtins__` through
    /// the original's fully generic `Globals.property(key, value)`. Any
    /// later `set_builtin`/`remove_builtin` call on this builder then fails
    /// loudly instead of silently no-opping.
    #[must_use]
    pub fn replace_builtins_slot(mut self, with: impl Into<String>) -> Self {
        self.scope.builtins = BuiltinsSlot::Replaced(with.into());
        self
    }

    #[must_use]
    pub fn set_import_policy(mut self, policy: ImportPolicy) -> Self {
        self.scope.import_policy = policy;
        self
    }

    /// Returns the built scope. Because `Scope` holds only owned data
    /// (`AHashSet<String>`, `String`, `ImportPolicy`), this is already an
    /// independent copy from any other scope built from the same builder
    /// chain — the isolation guarantee `spec.md` §4.A requires.
    #[must_use]
    pub fn build(self) -> Scope {
        self.scope
    }
}

/// `defaultScope(fileName)` from `spec.md` §4.A.
#[must_use]
pub fn default_scope(file_name: &str) -> Scope {
    ScopeBuilder::new(file_name).property_name("__main__").build()
}

/// `sandboxScope(fileName)` from `spec.md` §4.A.
#[must_use]
pub fn sandbox_scope(file_name: &str) -> Scope {
    let mut builder = ScopeBuilder::new(file_name).property_name("__main__");
    for removed in SANDBOX_REMOVED_BUILTINS {
        builder = builder.remove_builtin(removed).expect("builtins table is always a table");
    }
    let allowed: AHashSet<String> = SANDBOX_MODULE_ALLOWLIST.iter().map(|s| (*s).to_owned()).collect();
    builder.set_import_policy(ImportPolicy::Sandboxed { allowed }).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_scope_removes_dangerous_builtins() {
        let scope = sandbox_scope("script.py");
        for name in SANDBOX_REMOVED_BUILTINS {
            assert!(!scope.has_builtin(name), "{name} should be removed");
        }
        assert!(scope.has_builtin("print"), "print should remain available");
    }

    #[test]
    fn sandbox_scope_rejects_modules_outside_allowlist() {
        let scope = sandbox_scope("script.py");
        assert!(!scope.import_policy.allows("os"));
        assert!(!scope.import_policy.allows("sys"));
        assert!(scope.import_policy.allows("math"));
        assert!(scope.import_policy.allows("random"));
    }

    #[test]
    fn default_scope_is_unrestricted() {
        let scope = default_scope("script.py");
        assert!(scope.import_policy.allows("os"));
    }

    #[test]
    fn building_twice_yields_independent_builtins_tables() {
        let a = sandbox_scope("script.py");
        let mut b = sandbox_scope("script.py");
        // mutate b's import policy only; a must be untouched (no shared state)
        b.import_policy = ImportPolicy::Unrestricted;
        assert!(!a.import_policy.allows("os"));
        assert!(b.import_policy.allows("os"));
    }

    #[test]
    fn set_builtin_adds_a_name_not_in_the_default_table() {
        let scope = ScopeBuilder::new("script.py").set_builtin("hexlify", Some(())).unwrap().build();
        assert!(scope.has_builtin("hexlify"));
    }

    #[test]
    fn set_builtin_to_null_removes_it() {
        let scope = ScopeBuilder::new("script.py").set_builtin("print", None).unwrap().build();
        assert!(!scope.has_builtin("print"));
    }

    #[test]
    fn set_builtin_fails_loudly_once_the_slot_is_replaced() {
        let err = ScopeBuilder::new("script.py").replace_builtins_slot("None").set_builtin("print", None).unwrap_err();
        assert!(err.to_string().contains("AttributeError"));
    }
}
