//! Trace Loop / Controller Protocol (§4.E) and Engine Entry (§4.F).
//!
//! `EngineHook` is the concrete `TraceHook` that drives the action/result
//! channels; `run_trace`/`spawn_trace` are the entry points a controller
//! calls. Grounded in the teacher's thread-per-session model (`ouros-repl`
//! spawns a worker thread and talks to it over channels) generalized from a
//! REPL's line-at-a-time input to this engine's action-at-a-time protocol.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use indexmap::IndexMap;

use crate::classify;
use crate::evaluator::{self, EvalProduct};
use crate::lang::exception::Unwind;
use crate::lang::interp::{Interpreter, PauseAction, TraceEventKind, TraceHook};
use crate::lang::parser::parse_module;
use crate::protocol::{Action, ProductValue, ProtocolResult};
use crate::repl_error::EngineError;
use crate::scope::{default_scope, sandbox_scope};
use crate::snapshot::{self, Snapshot, SnapshotKind};

/// Runs `source` to completion (or until `QUIT`), driven entirely by
/// actions arriving on `actions` and reporting through `results`.
///
/// Blocks the calling thread for the run's whole lifetime; callers that
/// want this off the calling thread should use [`spawn_trace`] instead.
pub fn run_trace(file_name: &str, source: &str, sandbox: bool, actions: Receiver<Action>, results: Sender<ProtocolResult>) {
    loop {
        match actions.recv() {
            Ok(Action::Start) => break,
            Ok(_) => continue,
            Err(_) => return,
        }
    }

    let stmts = match parse_module(source) {
        Ok(stmts) => stmts,
        Err(err) => {
            let _ = results.send(ProtocolResult::Error { message: err.to_string() });
            return;
        }
    };

    let _ = results.send(ProtocolResult::Started);

    let scope = if sandbox { sandbox_scope(file_name) } else { default_scope(file_name) };
    let mut interp = Interpreter::new(scope);
    interp.set_hook(Box::new(EngineHook::new(actions, results.clone())));
    let outcome = interp.run(&stmts);
    interp.hook = None;

    if let Err(Unwind::Exception(exc)) = outcome {
        let _ = results.send(ProtocolResult::Error { message: exc.to_string() });
    }
}

/// Spawns `run_trace` on a dedicated thread and returns the two channel
/// endpoints a controller drives it with, plus the thread's join handle.
#[must_use]
pub fn spawn_trace(file_name: impl Into<String>, source: impl Into<String>, sandbox: bool) -> (Sender<Action>, Receiver<ProtocolResult>, JoinHandle<()>) {
    let file_name = file_name.into();
    let source = source.into();
    let (action_tx, action_rx) = mpsc::channel();
    let (result_tx, result_rx) = mpsc::channel();
    let handle = thread::spawn(move || run_trace(&file_name, &source, sandbox, action_rx, result_tx));
    (action_tx, result_rx, handle)
}

/// Runs `source` to completion with no controller at all, collecting every
/// snapshot a full `STEP`-to-the-end run would have produced.
///
/// For callers that just want "what did this program do" without driving
/// the channel protocol — there is no `QUIT` to send here, so the run
/// always goes to completion or to its first uncaught exception.
pub fn run_to_completion(file_name: &str, source: &str, sandbox: bool) -> Result<Vec<Snapshot>, EngineError> {
    let stmts = parse_module(source)?;
    let scope = if sandbox { sandbox_scope(file_name) } else { default_scope(file_name) };
    let mut interp = Interpreter::new(scope);
    let snapshots = Rc::new(RefCell::new(Vec::new()));
    interp.set_hook(Box::new(BatchHook { snapshots: Rc::clone(&snapshots) }));
    let outcome = interp.run(&stmts);
    interp.hook = None;
    if let Err(Unwind::Exception(exc)) = outcome {
        return Err(EngineError::from(exc));
    }
    Ok(Rc::try_unwrap(snapshots).expect("hook dropped with interp.hook, no other references remain").into_inner())
}

/// A hook that never pauses, just records a snapshot at every traceable
/// event. Backs [`run_to_completion`].
struct BatchHook {
    snapshots: Rc<RefCell<Vec<Snapshot>>>,
}

impl TraceHook for BatchHook {
    fn on_event(&mut self, interp: &mut Interpreter, event: TraceEventKind) -> PauseAction {
        if classify::is_traceable(&event) {
            self.snapshots.borrow_mut().push(snapshot::capture(interp, SnapshotKind::from(&event)));
        }
        PauseAction::Continue
    }
}

/// The trace hook installed for the lifetime of one `run_trace` call.
///
/// Owns both channel endpoints. The first `Call` event only records the
/// sentinel depth and auto-continues; every subsequent traceable event
/// enters the action loop described by `spec.md` §4.E.
struct EngineHook {
    actions: Receiver<Action>,
    results: Sender<ProtocolResult>,
    sentinel_depth: Option<usize>,
}

impl EngineHook {
    fn new(actions: Receiver<Action>, results: Sender<ProtocolResult>) -> Self {
        Self { actions, results, sentinel_depth: None }
    }
}

impl TraceHook for EngineHook {
    fn on_event(&mut self, interp: &mut Interpreter, event: TraceEventKind) -> PauseAction {
        if !classify::is_traceable(&event) {
            return PauseAction::Continue;
        }
        if matches!(event, TraceEventKind::Call) {
            self.sentinel_depth.get_or_insert(interp.frames.len());
            return PauseAction::Continue;
        }
        let sentinel_depth = *self.sentinel_depth.get_or_insert(interp.frames.len());

        loop {
            let action = match self.actions.recv() {
                Ok(action) => action,
                Err(_) => return PauseAction::Quit,
            };
            match action {
                Action::Start => continue,
                Action::Input { .. } => {
                    let _ = self.results.send(ProtocolResult::Locked);
                    continue;
                }
                Action::Eval { expression, inspect } => {
                    match evaluator::evaluate(interp, &expression) {
                        Ok(EvalProduct::Value(value)) => {
                            let mut scratch = IndexMap::new();
                            let product = ProductValue::Value(snapshot::snap_value(&interp.heap, &mut scratch, &value));
                            let snap = inspect.then(|| snapshot::capture(interp, SnapshotKind::from(&event)));
                            let _ = self.results.send(ProtocolResult::Product { product, snapshot: snap });
                        }
                        Ok(EvalProduct::Failed { kind, args, traceback }) => {
                            let mut scratch = IndexMap::new();
                            let value = args.iter().map(|v| snapshot::snap_value(&interp.heap, &mut scratch, v)).collect();
                            let product = ProductValue::Failed { kind, value, traceback };
                            let snap = inspect.then(|| snapshot::capture(interp, SnapshotKind::from(&event)));
                            let _ = self.results.send(ProtocolResult::Product { product, snapshot: snap });
                        }
                        Err(Unwind::Quit) => return PauseAction::Quit,
                        Err(Unwind::Exception(_)) => unreachable!("evaluator::evaluate folds exceptions into EvalProduct::Failed"),
                    }
                }
                Action::Step => {
                    let at_outermost_return = matches!(event, TraceEventKind::Return(_)) && interp.frames.len() <= sentinel_depth;
                    if at_outermost_return {
                        let _ = self.results.send(ProtocolResult::Data { snapshot: None, finish: false });
                    } else {
                        let snap = snapshot::capture(interp, SnapshotKind::from(&event));
                        let _ = self.results.send(ProtocolResult::Data { snapshot: Some(snap), finish: true });
                    }
                    return PauseAction::Continue;
                }
                Action::Quit => {
                    let _ = self.results.send(ProtocolResult::Data { snapshot: None, finish: false });
                    return PauseAction::Quit;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_until<F: Fn(&ProtocolResult) -> bool>(results: &Receiver<ProtocolResult>, stop: F) -> Vec<ProtocolResult> {
        let mut out = Vec::new();
        loop {
            let r = results.recv().expect("engine should not hang up mid-run");
            let done = stop(&r);
            out.push(r);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn linear_program_steps_twice_then_terminates_naturally() {
        let (actions, results, handle) = spawn_trace("script.py", "a = 1\nb = 2\n", false);
        actions.send(Action::Start).unwrap();
        assert!(matches!(results.recv().unwrap(), ProtocolResult::Started));
        actions.send(Action::Step).unwrap();
        actions.send(Action::Step).unwrap();
        actions.send(Action::Step).unwrap();
        let got = drain_until(&results, |r| matches!(r, ProtocolResult::Data { finish: false, .. } | ProtocolResult::Error { .. }));
        assert_eq!(got.len(), 3);
        assert!(matches!(&got[0], ProtocolResult::Data { finish: true, .. }));
        assert!(matches!(&got[1], ProtocolResult::Data { finish: true, .. }));
        assert!(matches!(&got[2], ProtocolResult::Data { finish: false, .. }));
        handle.join().unwrap();
    }

    #[test]
    fn sandbox_denial_surfaces_as_terminal_error() {
        let (actions, results, handle) = spawn_trace("script.py", "import os\n", true);
        actions.send(Action::Start).unwrap();
        assert!(matches!(results.recv().unwrap(), ProtocolResult::Started));
        match results.recv().unwrap() {
            ProtocolResult::Error { message } => assert!(message.contains("os")),
            other => panic!("expected Error, got {other:?}"),
        }
        handle.join().unwrap();
    }

    #[test]
    fn quit_unwinds_a_long_running_loop() {
        let (actions, results, handle) = spawn_trace("script.py", "i = 0\nwhile True:\n    i = i + 1\n", false);
        actions.send(Action::Start).unwrap();
        assert!(matches!(results.recv().unwrap(), ProtocolResult::Started));
        actions.send(Action::Step).unwrap();
        assert!(matches!(results.recv().unwrap(), ProtocolResult::Data { finish: true, .. }));
        actions.send(Action::Quit).unwrap();
        assert!(matches!(results.recv().unwrap(), ProtocolResult::Data { finish: false, .. }));
        handle.join().unwrap();
    }

    #[test]
    fn eval_at_a_pause_returns_the_arithmetic_product() {
        let (actions, results, handle) = spawn_trace("script.py", "a = 1\n", false);
        actions.send(Action::Start).unwrap();
        assert!(matches!(results.recv().unwrap(), ProtocolResult::Started));
        actions.send(Action::Eval { expression: "1 + 2".to_owned(), inspect: false }).unwrap();
        match results.recv().unwrap() {
            ProtocolResult::Product { product: ProductValue::Value(value), .. } => {
                assert_eq!(value, crate::snapshot::SnapValue::Num(3.0));
            }
            other => panic!("expected Product, got {other:?}"),
        }
        actions.send(Action::Quit).unwrap();
        let _ = results.recv();
        handle.join().unwrap();
    }

    #[test]
    fn run_to_completion_collects_a_snapshot_per_traceable_event() {
        let snapshots = run_to_completion("script.py", "a = 1\nb = 2\n", false).unwrap();
        assert_eq!(snapshots.len(), 2);
    }

    #[test]
    fn run_to_completion_surfaces_a_parse_failure() {
        let err = run_to_completion("script.py", "a = \n", false).unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn run_to_completion_surfaces_an_uncaught_exception() {
        let err = run_to_completion("script.py", "import os\n", true).unwrap_err();
        match err {
            EngineError::Runtime(exc) => assert!(exc.to_string().contains("os")),
            other => panic!("expected Runtime, got {other:?}"),
        }
    }
}
