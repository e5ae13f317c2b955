//! Implementation of the `re` module.
//!
//! Delegates directly to the `regex` crate, which already implements the
//! teacher's own regex engine dependency. Shrunk from the teacher's `re.rs`
//! (a hand-rolled PCRE-flavoured engine matching CPython's `re` semantics
//! exactly) to the common `match`/`search`/`findall`/`sub` surface.

use super::arg_str;
use crate::heap::HeapObject;
use crate::lang::exception::Unwind;
use crate::lang::interp::Interpreter;
use crate::lang::value::Value;
use std::rc::Rc;

pub const FUNCTIONS: &[&str] = &["match", "search", "findall", "sub"];

fn compile(interp: &mut Interpreter, pattern: &str, line: u32) -> Result<regex::Regex, Unwind> {
    regex::Regex::new(pattern).or_else(|e| interp.raise("ValueError", format!("invalid regular expression: {e}"), line))
}

pub fn call(interp: &mut Interpreter, name: &str, args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
    match name {
        "match" | "search" => {
            let pattern = arg_str(interp, &args, 0, line)?.to_owned();
            let text = arg_str(interp, &args, 1, line)?.to_owned();
            let re = compile(interp, &pattern, line)?;
            let found = if name == "match" { re.find(&text).filter(|m| m.start() == 0) } else { re.find(&text) };
            match found {
                Some(m) => Ok(Value::Str(Rc::from(m.as_str()))),
                None => Ok(Value::None),
            }
        }
        "findall" => {
            let pattern = arg_str(interp, &args, 0, line)?.to_owned();
            let text = arg_str(interp, &args, 1, line)?.to_owned();
            let re = compile(interp, &pattern, line)?;
            let matches: Vec<Value> = re.find_iter(&text).map(|m| Value::Str(Rc::from(m.as_str()))).collect();
            Ok(Value::Heap(interp.heap.allocate(HeapObject::List(matches))))
        }
        "sub" => {
            let pattern = arg_str(interp, &args, 0, line)?.to_owned();
            let replacement = arg_str(interp, &args, 1, line)?.to_owned();
            let text = arg_str(interp, &args, 2, line)?.to_owned();
            let re = compile(interp, &pattern, line)?;
            Ok(Value::Str(Rc::from(re.replace_all(&text, replacement.as_str()).as_ref())))
        }
        _ => interp.raise("AttributeError", format!("module 're' has no attribute '{name}'"), line),
    }
}
