//! Implementation of the `string` module.
//!
//! The teacher's `string_mod.rs` ports CPython's `Formatter`/`Template`
//! classes in full; this traced subset only needs the character-class
//! constants user scripts commonly import (`string.digits`, and friends).

use crate::lang::exception::Unwind;
use crate::lang::interp::Interpreter;
use crate::lang::value::Value;

pub const CONSTANTS: &[(&str, &str)] = &[
    ("ascii_lowercase", "abcdefghijklmnopqrstuvwxyz"),
    ("ascii_uppercase", "ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
    ("ascii_letters", "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ"),
    ("digits", "0123456789"),
    ("punctuation", "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~"),
    ("whitespace", " \t\n\r\x0b\x0c"),
];

/// `string` exposes only constants (resolved via [`super::constant`] from
/// attribute access, never a call), so every name reaching here is unknown.
pub fn call(interp: &mut Interpreter, name: &str, _args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
    interp.raise("AttributeError", format!("module 'string' has no attribute '{name}'"), line)
}
