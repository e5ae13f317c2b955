//! Runtime value representation.
//!
//! Mirrors the teacher's split between `Value` (what a namespace slot or
//! operand stack entry holds) and `Object` (what lives on the heap), but
//! collapsed to the much smaller set of shapes this restricted language
//! needs. Scalars are inline per `spec.md`'s Value/heap rules; anything
//! composite is a [`crate::heap::HeapId`] indirection.

use std::fmt;
use std::rc::Rc;

use super::ast::{Param, Stmt};
use crate::heap::HeapId;

/// A runtime value: either an inline scalar or a reference into the heap.
///
/// This is `spec.md`'s "Value" from §3, minus the wire encoding — see
/// `crate::snapshot::SnapValue` for the serialized form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Class(Rc<ClassDef>),
    Function(Rc<FunctionDef>),
    NativeFunction(Rc<str>),
    Heap(HeapId),
    /// A bound module namespace, e.g. the `math` name after `import math`.
    Module(Rc<str>),
}

/// Structural equality used by `==`, `in`, dict/set membership, and `is`.
///
/// Heap values compare by identity (same [`HeapId`]), not by contents —
/// this interpreter has no recursive structural-equality pass, matching its
/// association-list containers rather than a hashing scheme.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => (*x as f64) == *y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Heap(x), Value::Heap(y)) => x == y,
        (Value::Module(x), Value::Module(y)) => x == y,
        _ => false,
    }
}

impl Value {
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Class(_) | Value::Function(_) | Value::NativeFunction(_) => true,
            Value::Heap(_) => true,
            Value::Module(_) => true,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Class(_) => "type",
            Value::Function(_) | Value::NativeFunction(_) => "function",
            Value::Heap(_) => "object",
            Value::Module(_) => "module",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Class(c) => write!(f, "<class '{}'>", c.name),
            Value::Function(func) => write!(f, "<function {}>", func.name),
            Value::NativeFunction(name) => write!(f, "<built-in function {name}>"),
            Value::Heap(id) => write!(f, "<object #{id}>", id = id.0),
            Value::Module(name) => write!(f, "<module '{name}'>"),
        }
    }
}

/// A user-defined class declared in the traced source module.
///
/// Every class this interpreter ever produces is declared in the single
/// user source string (there is no foreign-module class import), so
/// `spec.md` §3 Invariant 5 ("a class object is classified as user-defined
/// iff it was declared in the user source's module") always holds for
/// values of this variant.
#[derive(Debug, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub base: Option<Rc<ClassDef>>,
    pub methods: ahash::AHashMap<String, Rc<FunctionDef>>,
    pub line: u32,
}

impl ClassDef {
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<Rc<FunctionDef>> {
        if let Some(m) = self.methods.get(name) {
            return Some(m.clone());
        }
        self.base.as_ref().and_then(|base| base.find_method(name))
    }
}

#[derive(Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}
