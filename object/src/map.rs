use indexmap::IndexMap;

use crate::Value;

/// Slot key: an id from the key space of the constants table.
pub type SlotKey = u32;

/// An immutable, insertion-ordered association of slot names to values.
///
/// Maps serve both as user objects and as the prototypes that hold the
/// methods of every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Map {
    slots: IndexMap<SlotKey, Value>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slots(slots: impl IntoIterator<Item = (SlotKey, Value)>) -> Self {
        Self {
            slots: slots.into_iter().collect(),
        }
    }

    #[inline]
    pub fn get(&self, key: SlotKey) -> Option<Value> {
        self.slots.get(&key).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> impl Iterator<Item = (SlotKey, Value)> + '_ {
        self.slots.iter().map(|(k, v)| (*k, *v))
    }

    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.slots.values().copied()
    }

    /// A copy with `key` bound to `value`.
    pub fn with(&self, key: SlotKey, value: Value) -> Map {
        let mut slots = self.slots.clone();
        slots.insert(key, value);
        Map { slots }
    }

    /// In-place definition; only the heap calls this, behind its barrier.
    pub(crate) fn define(&mut self, key: SlotKey, value: Value) {
        self.slots.insert(key, value);
    }

    pub fn transient(&self) -> MapTransient {
        MapTransient {
            slots: self.slots.clone(),
        }
    }
}

/// Mutable builder for [`Map`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapTransient {
    slots: IndexMap<SlotKey, Value>,
}

impl MapTransient {
    #[inline]
    pub fn get(&self, key: SlotKey) -> Option<Value> {
        self.slots.get(&key).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.slots.values().copied()
    }

    pub(crate) fn put(&mut self, key: SlotKey, value: Value) {
        self.slots.insert(key, value);
    }

    pub fn persist(&self) -> Map {
        Map {
            slots: self.slots.clone(),
        }
    }
}
