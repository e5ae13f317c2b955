//! Implementation of the `copy` module.
//!
//! `copy()` allocates a fresh heap object with the same top-level contents;
//! `deepcopy()` recurses into nested heap references. Grounded in the
//! teacher's `copy_mod.rs`, which draws the same shallow/deep distinction
//! against its own richer object model.

use crate::heap::HeapObject;
use crate::lang::exception::Unwind;
use crate::lang::interp::Interpreter;
use crate::lang::value::Value;

pub const FUNCTIONS: &[&str] = &["copy", "deepcopy"];

pub fn call(interp: &mut Interpreter, name: &str, args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
    let value = args.first().cloned().unwrap_or(Value::None);
    match name {
        "copy" => shallow_copy(interp, &value, line),
        "deepcopy" => deep_copy(interp, &value, line),
        _ => interp.raise("AttributeError", format!("module 'copy' has no attribute '{name}'"), line),
    }
}

fn shallow_copy(interp: &mut Interpreter, value: &Value, line: u32) -> Result<Value, Unwind> {
    let Value::Heap(id) = value else { return Ok(value.clone()) };
    let cloned = match interp.heap.get(*id) {
        Some(obj) => obj.clone(),
        None => return interp.raise("RuntimeError", "object no longer exists", line),
    };
    Ok(Value::Heap(interp.heap.allocate(cloned)))
}

fn deep_copy(interp: &mut Interpreter, value: &Value, line: u32) -> Result<Value, Unwind> {
    let Value::Heap(id) = value else { return Ok(value.clone()) };
    let object = match interp.heap.get(*id) {
        Some(obj) => obj.clone(),
        None => return interp.raise("RuntimeError", "object no longer exists", line),
    };
    let recursed = match object {
        HeapObject::List(items) => HeapObject::List(deep_copy_all(interp, items, line)?),
        HeapObject::Tuple(items) => HeapObject::Tuple(deep_copy_all(interp, items, line)?),
        HeapObject::Set(items) => HeapObject::Set(deep_copy_all(interp, items, line)?),
        HeapObject::Dict(pairs) => {
            let mut out = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                out.push((deep_copy(interp, &k, line)?, deep_copy(interp, &v, line)?));
            }
            HeapObject::Dict(out)
        }
        instance @ HeapObject::Instance { .. } => instance,
    };
    Ok(Value::Heap(interp.heap.allocate(recursed)))
}

fn deep_copy_all(interp: &mut Interpreter, items: Vec<Value>, line: u32) -> Result<Vec<Value>, Unwind> {
    items.into_iter().map(|v| deep_copy(interp, &v, line)).collect()
}
