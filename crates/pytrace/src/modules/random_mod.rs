//! Implementation of the `random` module.
//!
//! Shrunk from the teacher's `random_mod.rs` (a full Mersenne-Twister-backed
//! port of CPython's `random`) to the handful of entry points a traced
//! script typically exercises, backed by `rand` instead.

use rand::Rng;
use rand::SeedableRng;

use super::{arg_f64, arg_i64};
use crate::heap::HeapObject;
use crate::lang::exception::Unwind;
use crate::lang::interp::Interpreter;
use crate::lang::value::Value;

pub const FUNCTIONS: &[&str] = &["random", "randint", "uniform", "choice", "shuffle", "seed"];

pub fn call(interp: &mut Interpreter, name: &str, args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
    match name {
        "random" => Ok(Value::Float(interp.rng.gen::<f64>())),
        "randint" => {
            let lo = arg_i64(interp, &args, 0, line)?;
            let hi = arg_i64(interp, &args, 1, line)?;
            if lo > hi {
                return interp.raise("ValueError", "empty range for randint()", line);
            }
            Ok(Value::Int(interp.rng.gen_range(lo..=hi)))
        }
        "uniform" => {
            let lo = arg_f64(interp, &args, 0, line)?;
            let hi = arg_f64(interp, &args, 1, line)?;
            Ok(Value::Float(interp.rng.gen_range(lo..=hi)))
        }
        "choice" => {
            let seq = args.first().cloned().unwrap_or(Value::None);
            let items = match &seq {
                Value::Heap(id) => match interp.heap.get(*id) {
                    Some(HeapObject::List(items) | HeapObject::Tuple(items)) => items.clone(),
                    _ => return interp.raise("TypeError", "object is not a sequence", line),
                },
                _ => return interp.raise("TypeError", "object is not a sequence", line),
            };
            if items.is_empty() {
                return interp.raise("IndexError", "cannot choose from an empty sequence", line);
            }
            let idx = interp.rng.gen_range(0..items.len());
            Ok(items[idx].clone())
        }
        "shuffle" => {
            let seq = args.first().cloned().unwrap_or(Value::None);
            if let Value::Heap(id) = seq {
                if let Some(HeapObject::List(items)) = interp.heap.get_mut(id) {
                    for i in (1..items.len()).rev() {
                        let j = interp.rng.gen_range(0..=i);
                        items.swap(i, j);
                    }
                    return Ok(Value::None);
                }
            }
            interp.raise("TypeError", "shuffle() requires a list", line)
        }
        "seed" => {
            let seed = arg_i64(interp, &args, 0, line).unwrap_or(0) as u64;
            interp.rng = rand::rngs::StdRng::seed_from_u64(seed);
            Ok(Value::None)
        }
        _ => interp.raise("AttributeError", format!("module 'random' has no attribute '{name}'"), line),
    }
}

