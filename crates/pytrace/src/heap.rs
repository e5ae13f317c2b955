//! Heap arena for composite runtime objects.
//!
//! Grounded in the teacher's `heap.rs`: objects live in a slot arena and are
//! addressed by a stable per-run id, never by value equality. Here the slot
//! index plays the role of the teacher's `HeapId` / CPython's `id()` — it is
//! exactly the "string form of the host's identity hash" `spec.md` §3 asks
//! the snapshot to key on.

use std::fmt;

use indexmap::IndexMap;

use crate::lang::value::{ClassDef, Value};
use std::rc::Rc;

/// A stable identity for a heap-allocated object, valid for the run's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapId(pub usize);

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The taxonomy `spec.md` §3 closes `Heap Object.type` over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Tuple,
    Alist,
    Set,
    Map,
    Other,
}

impl ObjectKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Tuple => "tuple",
            ObjectKind::Alist => "alist",
            ObjectKind::Set => "set",
            ObjectKind::Map => "map",
            ObjectKind::Other => "other",
        }
    }
}

/// An object living on the heap.
///
/// A simple association-list `Dict`/`Set` (rather than a hash table) is used
/// deliberately: `Value` holds `f64`s, which are not `Eq`/`Hash`, and this is
/// a pedagogical interpreter with no performance goal in `spec.md` — linear
/// membership over small containers is the honest, simple choice here.
#[derive(Debug, Clone, PartialEq)]
pub enum HeapObject {
    Tuple(Vec<Value>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Dict(Vec<(Value, Value)>),
    Instance { class: Rc<ClassDef>, attrs: IndexMap<String, Value> },
}

impl HeapObject {
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            HeapObject::Tuple(_) => ObjectKind::Tuple,
            HeapObject::List(_) => ObjectKind::Alist,
            HeapObject::Set(_) => ObjectKind::Set,
            HeapObject::Dict(_) => ObjectKind::Map,
            HeapObject::Instance { .. } => ObjectKind::Other,
        }
    }

    #[must_use]
    pub fn language_type(&self) -> &str {
        match self {
            HeapObject::Tuple(_) => "tuple",
            HeapObject::List(_) => "list",
            HeapObject::Set(_) => "set",
            HeapObject::Dict(_) => "dict",
            HeapObject::Instance { class, .. } => &class.name,
        }
    }
}

/// Slot-arena heap with free-slot reuse.
///
/// New allocations reuse a freed slot's index when one is available so that
/// ids stay dense, the same property the teacher's `Heap` maintains.
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Option<HeapObject>>,
    free: Vec<usize>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, object: HeapObject) -> HeapId {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(object);
            HeapId(idx)
        } else {
            self.slots.push(Some(object));
            HeapId(self.slots.len() - 1)
        }
    }

    #[must_use]
    pub fn get(&self, id: HeapId) -> Option<&HeapObject> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: HeapId) -> Option<&mut HeapObject> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn free(&mut self, id: HeapId) {
        if self.slots.get(id.0).is_some() {
            self.slots[id.0] = None;
            self.free.push(id.0);
        }
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
