use std::collections::HashMap;

use object::{Heap, Number, NumberError, SlotKey, Str, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LiteralKind {
    Number,
    String,
}

#[derive(Debug)]
struct Entry {
    value: Value,
    text: String,
    /// Slot key of a string literal.
    key: Option<SlotKey>,
}

/// Interned literals shared by every compiled method, and the slot keys
/// maps are indexed by.
///
/// Constant indices are stable for the lifetime of the VM and are used
/// directly as bytecode operands; every constant is a permanent heap
/// object. Slot keys live in their own index space and are plain text:
/// keys computed at run time never allocate on the heap and never use up
/// constant indices.
#[derive(Debug, Default)]
pub struct ConstantsTable {
    entries: Vec<Entry>,
    index: HashMap<(LiteralKind, String), u32>,
    keys: Vec<String>,
    key_index: HashMap<String, SlotKey>,
}

impl ConstantsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a numeric literal by its source text.
    pub fn number(&mut self, heap: &mut Heap, text: &str) -> Result<u32, NumberError> {
        if let Some(idx) = self.index.get(&(LiteralKind::Number, text.to_string())) {
            return Ok(*idx);
        }
        let number = Number::parse(text)?;
        let value = Value::Number(heap.allocate_permanent(number));
        Ok(self.insert(LiteralKind::Number, text, value, None))
    }

    /// Intern a string literal (also used for selectors and global names).
    pub fn string(&mut self, heap: &mut Heap, text: &str) -> u32 {
        if let Some(idx) = self.find_string(text) {
            return idx;
        }
        let key = self.intern_key(text);
        let value = Value::String(heap.allocate_permanent(Str::new(text)));
        self.insert(LiteralKind::String, text, value, Some(key))
    }

    /// The index of an already interned string.
    pub fn find_string(&self, text: &str) -> Option<u32> {
        self.index
            .get(&(LiteralKind::String, text.to_string()))
            .copied()
    }

    fn insert(
        &mut self,
        kind: LiteralKind,
        text: &str,
        value: Value,
        key: Option<SlotKey>,
    ) -> u32 {
        let idx = self.entries.len() as u32;
        self.entries.push(Entry {
            value,
            text: text.to_string(),
            key,
        });
        self.index.insert((kind, text.to_string()), idx);
        idx
    }

    /// The slot key for `text`, registered on first use.
    pub fn intern_key(&mut self, text: &str) -> SlotKey {
        if let Some(key) = self.find_key(text) {
            return key;
        }
        let key = self.keys.len() as SlotKey;
        self.keys.push(text.to_string());
        self.key_index.insert(text.to_string(), key);
        key
    }

    /// The slot key for `text` if any map could hold it.
    pub fn find_key(&self, text: &str) -> Option<SlotKey> {
        self.key_index.get(text).copied()
    }

    /// The slot key named by a string constant.
    #[inline]
    pub fn slot_key(&self, idx: u32) -> Option<SlotKey> {
        self.entries.get(idx as usize)?.key
    }

    #[inline]
    pub fn key_text(&self, key: SlotKey) -> Option<&str> {
        self.keys.get(key as usize).map(String::as_str)
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn get(&self, idx: u32) -> Option<Value> {
        self.entries.get(idx as usize).map(|e| e.value)
    }

    /// Source text of an entry: the selector or name for strings.
    #[inline]
    pub fn text(&self, idx: u32) -> Option<&str> {
        self.entries.get(idx as usize).map(|e| e.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object::{HeapSettings, ObjectKind};

    fn heap() -> Heap {
        Heap::new(HeapSettings {
            initial_capacity: 16,
            ..Default::default()
        })
    }

    #[test]
    fn literals_are_deduplicated_per_kind() {
        let mut heap = heap();
        let mut table = ConstantsTable::new();
        let a = table.string(&mut heap, "x");
        let b = table.string(&mut heap, "x");
        let n = table.number(&mut heap, "3").unwrap();
        let s = table.string(&mut heap, "3");
        assert_eq!(a, b);
        assert_ne!(n, s);
        assert_eq!(table.len(), 3);
        assert_eq!(table.text(a), Some("x"));
    }

    #[test]
    fn constants_are_permanent() {
        let mut heap = heap();
        let mut table = ConstantsTable::new();
        let idx = table.number(&mut heap, "42").unwrap();
        let value = table.get(idx).unwrap();
        assert!(heap.bits(value).permanent);
        assert_eq!(heap.display(value), "42");
    }

    #[test]
    fn string_literals_carry_slot_keys() {
        let mut heap = heap();
        let mut table = ConstantsTable::new();
        let early = table.intern_key("size");
        let idx = table.string(&mut heap, "size");
        assert_eq!(table.slot_key(idx), Some(early));
        assert_eq!(table.key_text(early), Some("size"));

        let n = table.number(&mut heap, "1").unwrap();
        assert_eq!(table.slot_key(n), None);
    }

    #[test]
    fn keys_take_no_constants_or_heap_slots() {
        let mut heap = heap();
        let mut table = ConstantsTable::new();
        let live = heap.live(ObjectKind::String);
        let a = table.intern_key("a");
        assert_eq!(table.intern_key("a"), a);
        assert_ne!(table.intern_key("b"), a);
        assert!(table.is_empty());
        assert_eq!(table.key_count(), 2);
        assert_eq!(heap.live(ObjectKind::String), live);
        assert_eq!(table.find_string("a"), None);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let mut heap = heap();
        let mut table = ConstantsTable::new();
        assert!(table.number(&mut heap, "4x").is_err());
        assert!(table.is_empty());
    }
}
