//! Implementation of the `datetime` module.
//!
//! The teacher's `datetime_mod.rs` ports CPython's `datetime.date`/`time`/
//! `datetime` classes as full heap objects. This interpreter has no
//! user-facing date type, so `now()`/`today()` return their ISO-8601 string
//! representation directly via `chrono` rather than a structured object.

use chrono::Utc;

use crate::lang::exception::Unwind;
use crate::lang::interp::Interpreter;
use crate::lang::value::Value;
use std::rc::Rc;

pub const FUNCTIONS: &[&str] = &["now", "today", "utcnow"];

pub fn call(interp: &mut Interpreter, name: &str, _args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
    match name {
        "now" | "utcnow" => Ok(Value::Str(Rc::from(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string().as_str()))),
        "today" => Ok(Value::Str(Rc::from(Utc::now().format("%Y-%m-%d").to_string().as_str()))),
        _ => interp.raise("AttributeError", format!("module 'datetime' has no attribute '{name}'"), line),
    }
}
