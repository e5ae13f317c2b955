//! Transport records for serialized engine invocations.
//!
//! `spec.md` §6's wire schema, encodable two ways: `postcard` for a compact
//! binary form (matching the teacher's `Runner::dump`/`load` use of
//! postcard for persisted session state) and `serde_json` for a
//! human-readable form, with `preserve_order` on so a `Step`'s heap map
//! round-trips in the walker's insertion order.

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// A request from an outer client to run a program producing up to `steps`
/// snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub source: String,
    pub input: String,
    pub steps: i32,
}

/// One produced snapshot, paired with the source line that triggered it.
///
/// `spec.md` defers `Step`'s exact bit layout to the Snapshot schema; this
/// wraps `Snapshot` directly rather than re-deriving its fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub snapshot: Snapshot,
}

/// The response to a `Trace` request: every snapshot produced, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Result {
    pub steps: Vec<Step>,
}

impl Trace {
    #[must_use]
    pub fn to_postcard(&self) -> Vec<u8> {
        postcard::to_allocvec(self).expect("Trace fields are all postcard-safe")
    }

    pub fn from_postcard(bytes: &[u8]) -> std::result::Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Trace fields are all JSON-safe")
    }
}

impl Result {
    #[must_use]
    pub fn to_postcard(&self) -> Vec<u8> {
        postcard::to_allocvec(self).expect("Result fields are all postcard-safe")
    }

    pub fn from_postcard(bytes: &[u8]) -> std::result::Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Result fields are all JSON-safe")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    use crate::snapshot::SnapshotKind;

    fn empty_snapshot() -> Snapshot {
        Snapshot { kind: SnapshotKind::Line, stack: Vec::new(), heap: IndexMap::new() }
    }

    #[test]
    fn trace_round_trips_through_postcard() {
        let trace = Trace { source: "a = 1\n".to_owned(), input: String::new(), steps: 3 };
        let bytes = trace.to_postcard();
        let back = Trace::from_postcard(&bytes).unwrap();
        assert_eq!(back.source, trace.source);
        assert_eq!(back.steps, 3);
    }

    #[test]
    fn result_round_trips_through_json() {
        let result = Result { steps: vec![Step { snapshot: empty_snapshot() }] };
        let json = result.to_json();
        let back: Result = serde_json::from_str(&json).unwrap();
        assert_eq!(back.steps.len(), 1);
    }
}
