//! Exception representation used both for uncaught-program termination
//! (`spec.md` §7, "User program unhandled failure") and for `EVAL` failures
//! (§4.C), which are reified into data rather than propagated.

use std::fmt;

use super::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct PyException {
    pub kind: String,
    pub args: Vec<Value>,
    pub traceback: Vec<String>,
}

impl PyException {
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>, line: u32) -> Self {
        let kind = kind.into();
        let message = message.into();
        Self {
            traceback: vec![
                "Traceback (most recent call last):".to_owned(),
                format!("  line {line}, in <module>"),
                format!("{kind}: {message}"),
            ],
            args: vec![Value::Str(message.into())],
            kind,
        }
    }
}

impl fmt::Display for PyException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.args.first().map(ToString::to_string).unwrap_or_default();
        write!(f, "{}: {}", self.kind, message)
    }
}

/// Non-local control transfer out of normal statement execution.
#[derive(Debug, Clone)]
pub enum Unwind {
    /// A user-program exception propagated uncaught.
    Exception(PyException),
    /// The controller sent `QUIT`; unwind all the way out to the engine entry.
    Quit,
}

impl From<PyException> for Unwind {
    fn from(exc: PyException) -> Self {
        Unwind::Exception(exc)
    }
}

/// Loop/function control signals that terminate a statement block early
/// without being an error.
#[derive(Debug, Clone)]
pub enum ExecSignal {
    Return(Value),
    Break,
    Continue,
}
