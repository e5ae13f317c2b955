//! Implementation of the `functools` module.
//!
//! Only `reduce` is provided: the interpreter has no decorator machinery to
//! hang `lru_cache`/`wraps` off of, which the teacher's `functools.rs`
//! otherwise spends most of its length on.

use crate::heap::HeapObject;
use crate::lang::exception::Unwind;
use crate::lang::interp::Interpreter;
use crate::lang::value::Value;

pub const FUNCTIONS: &[&str] = &["reduce"];

pub fn call(interp: &mut Interpreter, name: &str, args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
    match name {
        "reduce" => {
            let func = args.first().cloned().unwrap_or(Value::None);
            let iterable = args.get(1).cloned().unwrap_or(Value::None);
            let items = match &iterable {
                Value::Heap(id) => match interp.heap.get(*id) {
                    Some(HeapObject::List(items) | HeapObject::Tuple(items)) => items.clone(),
                    _ => return interp.raise("TypeError", "reduce() argument 2 must be iterable", line),
                },
                _ => return interp.raise("TypeError", "reduce() argument 2 must be iterable", line),
            };
            let mut iter = items.into_iter();
            let mut acc = match args.get(2) {
                Some(initial) => initial.clone(),
                None => match iter.next() {
                    Some(first) => first,
                    None => return interp.raise("TypeError", "reduce() of empty iterable with no initial value", line),
                },
            };
            for item in iter {
                acc = interp.invoke_callable(func.clone(), vec![acc, item], line)?;
            }
            Ok(acc)
        }
        _ => interp.raise("AttributeError", format!("module 'functools' has no attribute '{name}'"), line),
    }
}
