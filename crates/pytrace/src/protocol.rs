//! Action/Result tagged records exchanged between controller and engine.
//!
//! `spec.md` §3 specifies these as tagged records with a `name` tag and an
//! optional `value` payload, and fixes the tag vocabulary to literal
//! upper-case strings (`START`, `STEP`, `EVAL`, `QUIT`, `INPUT`, `STARTED`,
//! `DATA`, `PRODUCT`, `ERROR`, `LOCKED`) — §6 says the wire schema
//! recognizes exactly those tags. `#[serde(tag = "name", content = "value",
//! rename_all = "SCREAMING_SNAKE_CASE")]` is the direct `serde` encoding of
//! that shape, the way the teacher's own wire types tag on a `kind`/`type`
//! field rather than relying on externally-tagged enum defaults.

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// Controller → engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Sent once before execution begins.
    Start,
    /// Resume until the next traceable event.
    Step,
    /// Evaluate `expression` in the paused frame's scope.
    Eval { expression: String, inspect: bool },
    /// Abandon execution; the engine unwinds and terminates cleanly.
    Quit,
    /// Satisfy a pending standard-input read. Unimplemented in the core: the
    /// restricted language has no `input()` builtin, so the engine answers
    /// any queued `Input` with `Result::Locked`.
    Input { text: String },
}

/// Engine → controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolResult {
    /// Emitted exactly once, after successful compilation, before the first
    /// hook fires.
    Started,
    /// The normal response to a progressive action (`Step`).
    Data { snapshot: Option<Snapshot>, finish: bool },
    /// Response to `Eval`.
    Product { product: ProductValue, snapshot: Option<Snapshot> },
    /// The user program raised an uncaught failure, or compilation failed.
    /// Terminal.
    Error { message: String },
    /// Reserved for I/O interception extensions; not produced by the core
    /// trace loop, only by a pending `Input` action.
    Locked,
}

/// The `product` payload of a `Product` result: either the evaluated
/// value, or structured exception info `spec.md` §4.C calls for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductValue {
    Value(crate::snapshot::SnapValue),
    Failed {
        #[serde(rename = "type")]
        kind: String,
        value: Vec<crate::snapshot::SnapValue>,
        traceback: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_action_round_trips_with_no_payload() {
        let json = serde_json::to_string(&Action::Start).unwrap();
        assert_eq!(json, r#"{"name":"START"}"#);
        let back: Action = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Action::Start));
    }

    #[test]
    fn eval_action_carries_expression_and_inspect_flag() {
        let action = Action::Eval { expression: "1 + 2".to_owned(), inspect: true };
        let json = serde_json::to_string(&action).unwrap();
        let back: Action = serde_json::from_str(&json).unwrap();
        match back {
            Action::Eval { expression, inspect } => {
                assert_eq!(expression, "1 + 2");
                assert!(inspect);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn error_result_is_tagged_by_name() {
        let result = ProtocolResult::Error { message: "boom".to_owned() };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""name":"ERROR""#));
        assert!(json.contains("boom"));
    }
}
