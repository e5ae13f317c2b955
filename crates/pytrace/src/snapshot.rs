//! Heap snapshotter.
//!
//! Walks the paused interpreter's frame chain and reachable heap objects,
//! producing a cycle-safe, identity-preserving serialization. Grounded in
//! the teacher's `heap.rs` arena-with-stable-ids model: the slot index a
//! `HeapId` carries *is* the identity this module keys the `heap` map on,
//! playing the role CPython's `id()` plays for the original
//! `core/snapshot.py` this component is ported from.
//!
//! The central trick, carried over unchanged from the original: register an
//! object's entry in the map *before* walking its members, so a cycle's
//! back-edge finds an already-registered key and resolves to a reference
//! instead of recursing forever.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::heap::{Heap, HeapId, HeapObject};
use crate::lang::interp::{Frame, Interpreter, TraceEventKind};
use crate::lang::value::Value;

/// Magnitude at or above which a scalar is stringified rather than carried
/// as a JSON number, per `spec.md` §3 invariant 4. `2^53`, the largest
/// integer an IEEE-754 double represents exactly.
const WIDEN_THRESHOLD: f64 = 9_007_199_254_740_992.0;

/// A Value in the wire/snapshot representation: an inline scalar or a
/// single-element heap reference.
///
/// `serde(untagged)` picks the first variant that matches the JSON shape on
/// the way in, and emits whichever variant is held on the way out — a
/// bare number, a bare string, or a one-element array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapValue {
    Num(f64),
    Text(String),
    Ref([String; 1]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub key: SnapValue,
    pub value: SnapValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeapObjectRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub language_type: String,
    pub user_defined: bool,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: SnapValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub line: u32,
    pub name: String,
    pub variables: Vec<Variable>,
}

/// The four pause kinds a snapshot can be taken at, mirroring
/// `TraceEventKind` without carrying its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Call,
    Line,
    Exception,
    Return,
}

impl From<&TraceEventKind> for SnapshotKind {
    fn from(event: &TraceEventKind) -> Self {
        match event {
            TraceEventKind::Call => SnapshotKind::Call,
            TraceEventKind::Line => SnapshotKind::Line,
            TraceEventKind::Exception(_) => SnapshotKind::Exception,
            TraceEventKind::Return(_) => SnapshotKind::Return,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(rename = "type")]
    pub kind: SnapshotKind,
    pub stack: Vec<FrameRecord>,
    pub heap: IndexMap<String, HeapObjectRecord>,
}

/// Captures a snapshot of `interp`'s visible state at a pause of kind `kind`.
///
/// Frames are emitted outermost-first, matching `Interpreter::frames`'
/// module-frame-at-index-0 layout.
#[must_use]
pub fn capture(interp: &Interpreter, kind: SnapshotKind) -> Snapshot {
    let mut heap_records = IndexMap::new();
    let stack = interp.frames.iter().map(|frame| frame_record(&interp.heap, &mut heap_records, frame)).collect();
    Snapshot { kind, stack, heap: heap_records }
}

fn frame_record(heap: &Heap, registry: &mut IndexMap<String, HeapObjectRecord>, frame: &Frame) -> FrameRecord {
    let variables = frame
        .locals
        .iter()
        .filter(|(name, _)| !name.starts_with('_'))
        .map(|(name, value)| Variable { name: name.clone(), value: snap_value(heap, registry, value) })
        .collect();
    FrameRecord { line: frame.line, name: frame.name.clone(), variables }
}

/// Exposed beyond this module so `engine.rs` can convert an `EVAL` result
/// into the same scalar/reference shape a snapshot's members use, without
/// necessarily building a full snapshot around it.
pub(crate) fn snap_value(heap: &Heap, registry: &mut IndexMap<String, HeapObjectRecord>, value: &Value) -> SnapValue {
    match value {
        Value::None => SnapValue::Text("None".to_owned()),
        Value::Bool(b) => SnapValue::Text(if *b { "True" } else { "False" }.to_owned()),
        Value::Int(n) => {
            if (*n as f64).abs() >= WIDEN_THRESHOLD {
                SnapValue::Text(n.to_string())
            } else {
                SnapValue::Num(*n as f64)
            }
        }
        Value::Float(f) => {
            if f.abs() >= WIDEN_THRESHOLD {
                SnapValue::Text(format!("{f}"))
            } else {
                SnapValue::Num(*f)
            }
        }
        Value::Str(s) => SnapValue::Text(s.to_string()),
        Value::Class(_) | Value::Function(_) | Value::NativeFunction(_) | Value::Module(_) => SnapValue::Text(value.to_string()),
        Value::Heap(id) => {
            register(heap, registry, *id);
            SnapValue::Ref([id.0.to_string()])
        }
    }
}

fn register(heap: &Heap, registry: &mut IndexMap<String, HeapObjectRecord>, id: HeapId) {
    let key = id.0.to_string();
    if registry.contains_key(&key) {
        return;
    }
    let Some(object) = heap.get(id) else { return };
    registry.insert(
        key.clone(),
        HeapObjectRecord {
            kind: object.kind().as_str().to_owned(),
            language_type: object.language_type().to_owned(),
            user_defined: matches!(object, HeapObject::Instance { .. }),
            members: Vec::new(),
        },
    );
    let members = build_members(heap, registry, object);
    registry.get_mut(&key).expect("just inserted").members = members;
}

fn build_members(heap: &Heap, registry: &mut IndexMap<String, HeapObjectRecord>, object: &HeapObject) -> Vec<Member> {
    match object {
        HeapObject::Tuple(items) | HeapObject::List(items) | HeapObject::Set(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| Member { key: SnapValue::Num(i as f64), value: snap_value(heap, registry, v) })
            .collect(),
        HeapObject::Dict(pairs) => {
            pairs.iter().map(|(k, v)| Member { key: snap_value(heap, registry, k), value: snap_value(heap, registry, v) }).collect()
        }
        HeapObject::Instance { attrs, .. } => attrs
            .iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .map(|(name, v)| Member { key: SnapValue::Text(name.clone()), value: snap_value(heap, registry, v) })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapObject;
    use indexmap::IndexMap as Map;

    use crate::lang::interp::Frame;

    fn frame(locals: &[(&str, Value)]) -> Frame {
        let mut map = IndexMap::new();
        for (k, v) in locals {
            map.insert((*k).to_owned(), v.clone());
        }
        Frame { name: "<module>".to_owned(), line: 3, locals: map, globals_declared: Default::default() }
    }

    #[test]
    fn small_int_stays_numeric_large_int_is_stringified() {
        let heap = Heap::new();
        let mut registry = IndexMap::new();
        assert_eq!(snap_value(&heap, &mut registry, &Value::Int(42)), SnapValue::Num(42.0));
        let huge = Value::Int(i64::MAX);
        match snap_value(&heap, &mut registry, &huge) {
            SnapValue::Text(s) => assert_eq!(s, i64::MAX.to_string()),
            other => panic!("expected stringified large int, got {other:?}"),
        }
    }

    #[test]
    fn self_referential_list_registers_once_and_points_back_to_itself() {
        let mut heap = Heap::new();
        let id = heap.allocate(HeapObject::List(Vec::new()));
        if let Some(HeapObject::List(items)) = heap.get_mut(id) {
            items.push(Value::Heap(id));
        }
        let mut registry = IndexMap::new();
        register(&heap, &mut registry, id);
        assert_eq!(registry.len(), 1);
        let record = &registry[&id.0.to_string()];
        assert_eq!(record.kind, "alist");
        assert_eq!(record.members.len(), 1);
        assert_eq!(record.members[0].value, SnapValue::Ref([id.0.to_string()]));
    }

    #[test]
    fn underscore_prefixed_locals_are_excluded() {
        let heap = Heap::new();
        let mut registry = Map::new();
        let f = frame(&[("_hidden", Value::Int(1)), ("visible", Value::Int(2))]);
        let record = frame_record(&heap, &mut registry, &f);
        assert_eq!(record.variables.len(), 1);
        assert_eq!(record.variables[0].name, "visible");
        assert_eq!(record.line, 3);
    }

    #[test]
    fn snapshot_kind_serializes_lowercase() {
        let json = serde_json::to_string(&SnapshotKind::Exception).unwrap();
        assert_eq!(json, "\"exception\"");
    }
}
