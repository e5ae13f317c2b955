//! Implementation of the `time` module.
//!
//! `sleep` is a no-op: a traced run has no wall-clock to block, and letting
//! user scripts busy-wait the controller thread would defeat the
//! single-step protocol. Shrunk from the teacher's `time_mod.rs`, which
//! backs a real process clock.

use crate::lang::exception::Unwind;
use crate::lang::interp::Interpreter;
use crate::lang::value::Value;

pub const FUNCTIONS: &[&str] = &["time", "sleep"];

pub fn call(interp: &mut Interpreter, name: &str, _args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
    match name {
        "time" => Ok(Value::Float(0.0)),
        "sleep" => Ok(Value::None),
        _ => interp.raise("AttributeError", format!("module 'time' has no attribute '{name}'"), line),
    }
}
