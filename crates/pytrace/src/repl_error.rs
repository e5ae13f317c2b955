use std::fmt;

use crate::lang::exception::PyException;
use crate::lang::parser::ParseError;

/// Error type for a non-channel trace run (`engine::run_to_completion`),
/// separating failures by pipeline stage.
///
/// There is no separate `Resource` variant: `Interpreter` turns a resource
/// limit breach into an ordinary `PyException` (`MemoryError`/`TimeoutError`/
/// `RecursionError`, see `crate::resource::ResourceError::into_exception`)
/// at the point it's raised, so by the time a run either completes or fails
/// it has already folded into `Runtime` like any other uncaught exception.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Parsing failed before the interpreter ran.
    Parse(ParseError),
    /// The user program raised an exception that reached the top of the
    /// call stack uncaught.
    Runtime(PyException),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(error) => write!(f, "parse error: {error}"),
            Self::Runtime(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ParseError> for EngineError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<PyException> for EngineError {
    fn from(error: PyException) -> Self {
        Self::Runtime(error)
    }
}
