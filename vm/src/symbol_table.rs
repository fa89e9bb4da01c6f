/// Name → slot bindings for one compiling scope.
///
/// Slots are handed out in declaration order and never reused, even after
/// [`leave_block`](SymbolTable::leave_block) hides the names of an inlined
/// branch.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    names: Vec<(String, u16)>,
    next: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot bound to `name`, allocating the next one for a new name.
    /// Answers `None` once the slot space is exhausted.
    pub fn get_or_create(&mut self, name: &str) -> Option<u16> {
        if let Some(slot) = self.find(name) {
            return Some(slot);
        }
        let slot = u16::try_from(self.next).ok().filter(|s| *s < u16::MAX)?;
        self.names.push((name.to_string(), slot));
        self.next += 1;
        Some(slot)
    }

    /// The innermost visible binding of `name`.
    pub fn find(&self, name: &str) -> Option<u16> {
        self.names
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| *slot)
    }

    /// Slots allocated so far.
    pub fn size(&self) -> usize {
        self.next
    }

    pub fn reset(&mut self) {
        self.names.clear();
        self.next = 0;
    }

    /// Open a nested visibility region; pass the result to `leave_block`.
    pub fn enter_block(&self) -> usize {
        self.names.len()
    }

    /// Hide every name declared since `mark`. Their slots stay allocated.
    pub fn leave_block(&mut self, mark: usize) {
        self.names.truncate(mark);
    }
}
