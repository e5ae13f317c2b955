//! Implementation of the `math` module.
//!
//! Covers the constants and functions exercised by the sandbox test
//! scenarios: rounding, roots, logarithms, trigonometry, and a couple of
//! integer functions. Grounded in the teacher's `math.rs`, shrunk from its
//! full C-library-width surface to this subset.

use super::{arg_f64, arg_i64};
use crate::lang::exception::Unwind;
use crate::lang::interp::Interpreter;
use crate::lang::value::Value;

pub const FUNCTIONS: &[&str] = &["sqrt", "floor", "ceil", "trunc", "fabs", "pow", "exp", "log", "log2", "log10", "sin", "cos", "tan", "isnan", "isinf", "gcd", "factorial"];

pub const CONSTANTS: &[(&str, f64)] = &[("pi", std::f64::consts::PI), ("e", std::f64::consts::E), ("tau", std::f64::consts::TAU), ("inf", f64::INFINITY), ("nan", f64::NAN)];

pub fn call(interp: &mut Interpreter, name: &str, args: Vec<Value>, line: u32) -> Result<Value, Unwind> {
    if let Some((_, value)) = CONSTANTS.iter().find(|(n, _)| *n == name) {
        return Ok(Value::Float(*value));
    }
    match name {
        "sqrt" => {
            let x = arg_f64(interp, &args, 0, line)?;
            if x < 0.0 {
                return interp.raise("ValueError", "math domain error", line);
            }
            Ok(Value::Float(x.sqrt()))
        }
        "floor" => Ok(Value::Int(arg_f64(interp, &args, 0, line)?.floor() as i64)),
        "ceil" => Ok(Value::Int(arg_f64(interp, &args, 0, line)?.ceil() as i64)),
        "trunc" => Ok(Value::Int(arg_f64(interp, &args, 0, line)?.trunc() as i64)),
        "fabs" => Ok(Value::Float(arg_f64(interp, &args, 0, line)?.abs())),
        "pow" => {
            let base = arg_f64(interp, &args, 0, line)?;
            let exp = arg_f64(interp, &args, 1, line)?;
            Ok(Value::Float(base.powf(exp)))
        }
        "exp" => Ok(Value::Float(arg_f64(interp, &args, 0, line)?.exp())),
        "log" => {
            let x = arg_f64(interp, &args, 0, line)?;
            if x <= 0.0 {
                return interp.raise("ValueError", "math domain error", line);
            }
            match args.get(1) {
                Some(_) => {
                    let base = arg_f64(interp, &args, 1, line)?;
                    Ok(Value::Float(x.log(base)))
                }
                None => Ok(Value::Float(x.ln())),
            }
        }
        "log2" => Ok(Value::Float(arg_f64(interp, &args, 0, line)?.log2())),
        "log10" => Ok(Value::Float(arg_f64(interp, &args, 0, line)?.log10())),
        "sin" => Ok(Value::Float(arg_f64(interp, &args, 0, line)?.sin())),
        "cos" => Ok(Value::Float(arg_f64(interp, &args, 0, line)?.cos())),
        "tan" => Ok(Value::Float(arg_f64(interp, &args, 0, line)?.tan())),
        "isnan" => Ok(Value::Bool(arg_f64(interp, &args, 0, line)?.is_nan())),
        "isinf" => Ok(Value::Bool(arg_f64(interp, &args, 0, line)?.is_infinite())),
        "gcd" => {
            let a = arg_i64(interp, &args, 0, line)?.unsigned_abs();
            let b = arg_i64(interp, &args, 1, line)?.unsigned_abs();
            Ok(Value::Int(gcd(a, b) as i64))
        }
        "factorial" => {
            let n = arg_i64(interp, &args, 0, line)?;
            if n < 0 {
                return interp.raise("ValueError", "factorial() not defined for negative values", line);
            }
            Ok(Value::Int((1..=n).product()))
        }
        _ => interp.raise("AttributeError", format!("module 'math' has no attribute '{name}'"), line),
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}
