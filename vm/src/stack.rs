use object::Value;

/// The operand stack shared by every activation.
///
/// Slot 0 holds a sentinel that is never popped; frames are windows into
/// the slots above it.
#[derive(Debug)]
pub struct Stack {
    slots: Vec<Value>,
}

impl Stack {
    pub fn new(sentinel: Value) -> Self {
        let mut slots = Vec::with_capacity(1024);
        slots.push(sentinel);
        Self { slots }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether only the sentinel is left.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.len() <= 1
    }

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.slots.push(value);
    }

    /// Pop the top value; the sentinel is never handed out.
    #[inline]
    pub fn pop(&mut self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        self.slots.pop()
    }

    #[inline]
    pub fn top(&self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        self.slots.last().copied()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.slots.get(index).copied()
    }

    /// Overwrite an existing slot. Answers `false` when out of range.
    #[inline]
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Shrink to `len` slots, keeping the sentinel.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.slots.truncate(len.max(1));
    }

    /// Grow or shrink to exactly `len` slots, filling new ones with `fill`.
    pub fn resize(&mut self, len: usize, fill: Value) {
        self.slots.resize(len.max(1), fill);
    }

    #[inline]
    pub fn as_slice(&self) -> &[Value] {
        &self.slots
    }

    /// The `count` topmost values, bottom first.
    pub fn window(&self, count: usize) -> Option<&[Value]> {
        let start = self.slots.len().checked_sub(count)?;
        if start == 0 {
            return None;
        }
        Some(&self.slots[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object::Handle;

    fn v(i: u32) -> Value {
        Value::Map(Handle::from_index(i))
    }

    #[test]
    fn sentinel_guards_underflow() {
        let mut stack = Stack::new(v(0));
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.top(), None);
        stack.truncate(0);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn window_excludes_the_sentinel() {
        let mut stack = Stack::new(v(0));
        stack.push(v(1));
        stack.push(v(2));
        assert_eq!(stack.window(2), Some(&[v(1), v(2)][..]));
        assert_eq!(stack.window(3), None);
    }

    #[test]
    fn resize_fills_fresh_slots() {
        let mut stack = Stack::new(v(0));
        stack.push(v(1));
        stack.resize(4, v(9));
        assert_eq!(stack.as_slice(), &[v(0), v(1), v(9), v(9)]);
        assert!(stack.set(3, v(3)));
        assert!(!stack.set(4, v(4)));
        assert_eq!(stack.pop(), Some(v(3)));
    }
}
