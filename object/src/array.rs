use crate::Value;

/// An immutable element sequence. Every update answers a new array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Array {
    elements: Vec<Value>,
}

impl Array {
    pub fn new(elements: Vec<Value>) -> Self {
        Self { elements }
    }

    #[inline]
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// 1-based element access.
    pub fn at(&self, index: i64) -> Option<Value> {
        let offset = usize::try_from(index.checked_sub(1)?).ok()?;
        self.elements.get(offset).copied()
    }

    pub fn pushed(&self, value: Value) -> Array {
        let mut elements = Vec::with_capacity(self.elements.len() + 1);
        elements.extend_from_slice(&self.elements);
        elements.push(value);
        Array { elements }
    }

    /// The first `count` elements; clamped to the length.
    pub fn take(&self, count: usize) -> Array {
        let end = count.min(self.elements.len());
        Array::new(self.elements[..end].to_vec())
    }

    /// All but the first `count` elements; clamped to the length.
    pub fn drop(&self, count: usize) -> Array {
        let start = count.min(self.elements.len());
        Array::new(self.elements[start..].to_vec())
    }

    pub fn transient(&self) -> ArrayTransient {
        ArrayTransient {
            elements: self.elements.clone(),
        }
    }
}

/// Mutable builder for [`Array`]. Writes go through
/// [`Heap::array_transient_push`](crate::Heap::array_transient_push) so the
/// collector sees values stored into a tenured builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayTransient {
    elements: Vec<Value>,
}

impl ArrayTransient {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub(crate) fn push(&mut self, value: Value) {
        self.elements.push(value);
    }

    pub fn persist(&self) -> Array {
        Array::new(self.elements.clone())
    }
}
