//! The sandbox-allow-listed standard modules.
//!
//! Grounded in the teacher's `modules/` directory: one file per module, each
//! exposing the handful of functions it implements plus a `call` dispatcher
//! keyed on the unqualified function name. The teacher dispatches through a
//! `strum`-derived enum per module; this crate's module surface is small
//! enough that a `match` on `&str` plays the same role without the extra
//! dependency.

mod copy_mod;
mod datetime_mod;
mod functools_mod;
mod itertools_mod;
mod math_mod;
mod random_mod;
mod re_mod;
mod string_mod;
mod time_mod;

use crate::lang::exception::Unwind;
use crate::lang::interp::Interpreter;
use crate::lang::value::Value;

/// Extracts the `idx`-th argument as an `f64`, accepting both `int` and
/// `float`. Shared by every module that does numeric work.
pub(crate) fn arg_f64(interp: &mut Interpreter, args: &[Value], idx: usize, line: u32) -> Result<f64, Unwind> {
    match args.get(idx) {
        Some(Value::Int(n)) => Ok(*n as f64),
        Some(Value::Float(n)) => Ok(*n),
        Some(other) => interp.raise("TypeError", format!("expected a number, got '{}'", other.type_name()), line),
        None => interp.raise("TypeError", "missing required argument", line),
    }
}

pub(crate) fn arg_i64(interp: &mut Interpreter, args: &[Value], idx: usize, line: u32) -> Result<i64, Unwind> {
    match args.get(idx) {
        Some(Value::Int(n)) => Ok(*n),
        Some(other) => interp.raise("TypeError", format!("expected an int, got '{}'", other.type_name()), line),
        None => interp.raise("TypeError", "missing required argument", line),
    }
}

pub(crate) fn arg_str<'a>(interp: &mut Interpreter, args: &'a [Value], idx: usize, line: u32) -> Result<&'a str, Unwind> {
    match args.get(idx) {
        Some(Value::Str(s)) => Ok(s.as_ref()),
        Some(other) => interp.raise("TypeError", format!("expected a string, got '{}'", other.type_name()), line),
        None => interp.raise("TypeError", "missing required argument", line),
    }
}

/// Whether `module` is one of the nine sandbox-allow-listed modules this
/// crate actually implements.
#[must_use]
pub fn is_known(module: &str) -> bool {
    crate::scope::SANDBOX_MODULE_ALLOWLIST.contains(&module)
}

/// Whether `module.name` resolves to a callable function (used by `from X
/// import Y` and plain attribute access on an imported module). Constants
/// such as `math.pi` or `string.digits` are resolved through [`constant`]
/// instead — they evaluate directly to a value, not to something callable.
#[must_use]
pub fn has_function(module: &str, name: &str) -> bool {
    match module {
        "copy" => copy_mod::FUNCTIONS.contains(&name),
        "datetime" => datetime_mod::FUNCTIONS.contains(&name),
        "functools" => functools_mod::FUNCTIONS.contains(&name),
        "itertools" => itertools_mod::FUNCTIONS.contains(&name),
        "math" => math_mod::FUNCTIONS.contains(&name),
        "random" => random_mod::FUNCTIONS.contains(&name),
        "re" => re_mod::FUNCTIONS.contains(&name),
        "string" => false,
        "time" => time_mod::FUNCTIONS.contains(&name),
        _ => false,
    }
}

/// Resolves a module-level constant, if `module.name` names one.
#[must_use]
pub fn constant(module: &str, name: &str) -> Option<Value> {
    match module {
        "math" => math_mod::CONSTANTS.iter().find(|(n, _)| *n == name).map(|(_, v)| Value::Float(*v)),
        "string" => string_mod::CONSTANTS.iter().find(|(n, _)| *n == name).map(|(_, v)| Value::Str(std::rc::Rc::from(*v))),
        _ => None,
    }
}

/// Dispatches a call to `module.function`, given a `module.function`
/// qualified name (what `Value::NativeFunction` and `Value::Module`
/// attribute lookups carry).
pub fn call(interp: &mut Interpreter, qualified: &str, args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
    let (module, name) = qualified.split_once('.').unwrap_or(("", qualified));
    match module {
        "copy" => copy_mod::call(interp, name, args, line),
        "datetime" => datetime_mod::call(interp, name, args, line),
        "functools" => functools_mod::call(interp, name, args, line),
        "itertools" => itertools_mod::call(interp, name, args, line),
        "math" => math_mod::call(interp, name, args, line),
        "random" => random_mod::call(interp, name, args, line),
        "re" => re_mod::call(interp, name, args, line),
        "string" => string_mod::call(interp, name, args, line),
        "time" => time_mod::call(interp, name, args, line),
        _ => interp.raise("ImportError", format!("no such module '{module}'"), line),
    }
}
