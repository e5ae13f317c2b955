//! A sandboxed, steppable interpreter for a restricted Python-like subset.
//!
//! A controller drives one run through [`engine::spawn_trace`] (or the
//! blocking [`engine::run_trace`]), sending [`protocol::Action`]s over a
//! channel and reading [`protocol::ProtocolResult`]s back. Each pause is
//! captured by [`snapshot::capture`] into a JSON-friendly, cycle-safe view
//! of the call stack and reachable heap.

pub mod classify;
pub mod engine;
pub mod evaluator;
pub mod heap;
pub mod lang;
pub mod modules;
pub mod protocol;
pub mod repl_error;
pub mod resource;
pub mod scope;
pub mod snapshot;
pub mod tracer;
pub mod wire;

pub use engine::{run_to_completion, run_trace, spawn_trace};
pub use protocol::{Action, ProtocolResult};
pub use repl_error::EngineError;
