//! Frame/event classification.
//!
//! Free functions rather than methods on `Interpreter`, matching the
//! teacher's preference for small pure predicates over instance methods
//! when there is no state to mutate.

use crate::lang::interp::{Frame, TraceEventKind};

/// True iff `frame` belongs to the file being traced.
///
/// This interpreter runs a single source file per trace (no multi-file
/// imports of user code), so every live `Frame` always belongs to
/// `file_name`; the check still exists as a named predicate because the
/// controller protocol is specified against it, and a future multi-file
/// extension would have somewhere to hook in without touching call sites.
#[must_use]
pub fn is_user_frame(frame: &Frame, file_name: &str, current_file: &str) -> bool {
    let _ = frame;
    file_name == current_file
}

/// True iff `event` is one of the four kinds the trace loop pauses on.
#[must_use]
pub fn is_traceable(event: &TraceEventKind) -> bool {
    matches!(event, TraceEventKind::Call | TraceEventKind::Line | TraceEventKind::Exception(_) | TraceEventKind::Return(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::exception::PyException;
    use crate::lang::value::Value;

    fn frame() -> Frame {
        Frame { name: "<module>".to_owned(), line: 1, locals: Default::default(), globals_declared: Default::default() }
    }

    #[test]
    fn user_frame_matches_same_file() {
        assert!(is_user_frame(&frame(), "script.py", "script.py"));
        assert!(!is_user_frame(&frame(), "script.py", "other.py"));
    }

    #[test]
    fn all_four_event_kinds_are_traceable() {
        assert!(is_traceable(&TraceEventKind::Call));
        assert!(is_traceable(&TraceEventKind::Line));
        assert!(is_traceable(&TraceEventKind::Return(Value::None)));
        assert!(is_traceable(&TraceEventKind::Exception(PyException::new("ValueError", "x", 1))));
    }
}
