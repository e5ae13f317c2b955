//! Stock `TraceHook` implementations.
//!
//! The controller-driven hook that actually answers EVAL/STEP/QUIT requests
//! lives in `engine.rs`; the two hooks here are the ones a caller reaches
//! for when it just wants default or diagnostic behavior, mirroring the
//! teacher's `NoopTracer`/`StderrTracer` pair at the top of its tracer
//! hierarchy (the opcode-level `ProfilingTracer`/`CoverageTracer`/
//! `RecordingTracer` below them have no counterpart here: this interpreter
//! has no instruction stream to profile or record, only the four
//! statement-level events `TraceEventKind` already closes over).

use crate::lang::interp::{Interpreter, PauseAction, TraceEventKind, TraceHook};

/// A hook that never pauses execution.
///
/// The default when a caller runs a script to completion without stepping
/// through it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl TraceHook for NoopHook {
    fn on_event(&mut self, _interp: &mut Interpreter, _event: TraceEventKind) -> PauseAction {
        PauseAction::Continue
    }
}

/// A hook that prints a human-readable execution log to stderr and never
/// pauses.
///
/// Useful for watching a script run without driving it through the
/// controller protocol. Output format:
/// ```text
/// [  3] CALL      <module>
/// [  3] LINE
/// [  5] LINE
///   <<< RETURN    None
/// ```
#[derive(Debug)]
pub struct StderrHook {
    /// Maximum number of `Line` events to log before going quiet. `None`
    /// means unlimited.
    limit: Option<usize>,
    count: usize,
    stopped: bool,
}

impl StderrHook {
    #[must_use]
    pub fn new() -> Self {
        Self { limit: None, count: 0, stopped: false }
    }

    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit), count: 0, stopped: false }
    }
}

impl Default for StderrHook {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceHook for StderrHook {
    fn on_event(&mut self, interp: &mut Interpreter, event: TraceEventKind) -> PauseAction {
        if self.stopped {
            return PauseAction::Continue;
        }
        let line = interp.current_frame().line;
        let name = &interp.current_frame().name;
        match &event {
            TraceEventKind::Call => eprintln!("[{line:>4}] CALL      {name}"),
            TraceEventKind::Line => eprintln!("[{line:>4}] LINE"),
            TraceEventKind::Return(value) => eprintln!("  <<< RETURN    {name} -> {value}"),
            TraceEventKind::Exception(exc) => eprintln!("  !!! EXCEPTION {exc}"),
        }
        self.count += 1;
        if let Some(limit) = self.limit {
            if self.count >= limit {
                eprintln!("--- trace limit reached ({limit} events) ---");
                self.stopped = true;
            }
        }
        PauseAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::default_scope;

    #[test]
    fn noop_hook_never_quits() {
        let mut interp = Interpreter::new(default_scope("<test>"));
        let mut hook = NoopHook;
        assert_eq!(hook.on_event(&mut interp, TraceEventKind::Call), PauseAction::Continue);
    }
}
