//! Controller-supplied expression evaluation at a paused frame.
//!
//! Grounded in `original_source/inspector.py`'s `FrameProcessor.evaluate_expression`:
//! evaluation failures are caught and reified into data rather than allowed
//! to propagate, so a bad `EVAL` never takes down the run the way an
//! uncaught user-program exception does.

use crate::lang::exception::{PyException, Unwind};
use crate::lang::interp::Interpreter;
use crate::lang::parser::parse_expression;
use crate::lang::value::Value;

/// The outcome of one `EVAL` action: either the expression's value, or a
/// reified exception describing why evaluation failed.
#[derive(Debug, Clone)]
pub enum EvalProduct {
    Value(Value),
    Failed { kind: String, args: Vec<Value>, traceback: Vec<String> },
}

/// Evaluates `expression` against `interp`'s currently paused frame.
///
/// Parse failures and runtime failures are both folded into
/// `EvalProduct::Failed` — the caller never sees a `Result::Err` for a bad
/// expression, only for the engine-level `Unwind::Quit` signal a `QUIT`
/// action raised mid-evaluation (e.g. a call that itself pauses the hook).
pub fn evaluate(interp: &mut Interpreter, expression: &str) -> Result<EvalProduct, Unwind> {
    let expr = match parse_expression(expression) {
        Ok(expr) => expr,
        Err(err) => {
            let line = interp.current_frame().line;
            let exc = PyException::new("SyntaxError", err.to_string(), line);
            return Ok(EvalProduct::Failed { kind: exc.kind, args: exc.args, traceback: exc.traceback });
        }
    };
    match interp.eval_expr(&expr) {
        Ok(value) => Ok(EvalProduct::Value(value)),
        Err(Unwind::Quit) => Err(Unwind::Quit),
        Err(Unwind::Exception(exc)) => Ok(EvalProduct::Failed { kind: exc.kind, args: exc.args, traceback: exc.traceback }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::default_scope;

    #[test]
    fn arithmetic_expression_evaluates_to_a_value() {
        let mut interp = Interpreter::new(default_scope("<test>"));
        let product = evaluate(&mut interp, "1 + 2").unwrap();
        assert!(matches!(product, EvalProduct::Value(Value::Int(3))));
    }

    #[test]
    fn assignment_is_rejected_as_a_syntax_error() {
        let mut interp = Interpreter::new(default_scope("<test>"));
        let product = evaluate(&mut interp, "x = 1").unwrap();
        match product {
            EvalProduct::Failed { kind, .. } => assert_eq!(kind, "SyntaxError"),
            EvalProduct::Value(_) => panic!("assignment should not parse as an expression"),
        }
    }

    #[test]
    fn undefined_name_reifies_as_name_error() {
        let mut interp = Interpreter::new(default_scope("<test>"));
        let product = evaluate(&mut interp, "missing_name").unwrap();
        match product {
            EvalProduct::Failed { kind, .. } => assert_eq!(kind, "NameError"),
            EvalProduct::Value(_) => panic!("undefined name should fail"),
        }
    }
}
