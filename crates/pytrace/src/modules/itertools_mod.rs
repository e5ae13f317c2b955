//! Implementation of the `itertools` module.
//!
//! Only the eager, list-returning shapes of `chain` and `count` are
//! implemented — `count` is bounded to a default cap of 10,000 terms since
//! this interpreter has no lazy iterator type to hang an infinite
//! generator off of. Shrunk from the teacher's `itertools.rs`, which
//! implements the full lazy-iterator protocol.

use super::arg_i64;
use crate::heap::HeapObject;
use crate::lang::exception::Unwind;
use crate::lang::interp::Interpreter;
use crate::lang::value::Value;

pub const FUNCTIONS: &[&str] = &["chain", "count"];

const COUNT_CAP: i64 = 10_000;

pub fn call(interp: &mut Interpreter, name: &str, args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
    match name {
        "chain" => {
            let mut items = Vec::new();
            for arg in &args {
                match arg {
                    Value::Heap(id) => match interp.heap.get(*id) {
                        Some(HeapObject::List(seq) | HeapObject::Tuple(seq) | HeapObject::Set(seq)) => items.extend(seq.clone()),
                        _ => return interp.raise("TypeError", "chain() arguments must be iterable", line),
                    },
                    _ => return interp.raise("TypeError", "chain() arguments must be iterable", line),
                }
            }
            Ok(Value::Heap(interp.heap.allocate(HeapObject::List(items))))
        }
        "count" => {
            let start = if args.is_empty() { 0 } else { arg_i64(interp, &args, 0, line)? };
            let step = if args.len() > 1 { arg_i64(interp, &args, 1, line)? } else { 1 };
            let items = (0..COUNT_CAP).map(|i| Value::Int(start + i * step)).collect();
            Ok(Value::Heap(interp.heap.allocate(HeapObject::Tuple(items))))
        }
        _ => interp.raise("AttributeError", format!("module 'itertools' has no attribute '{name}'"), line),
    }
}
