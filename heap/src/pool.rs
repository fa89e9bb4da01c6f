use crate::Handle;

/// Collector bits carried by every occupied pool slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcBits {
    /// Reached in the current cycle.
    pub marked: bool,
    /// Survived at least one cycle; excluded from the eden sweep.
    pub tenured: bool,
    /// Never swept, never traversed by marking.
    pub permanent: bool,
}

#[derive(Debug)]
struct Slot<T> {
    bits: GcBits,
    /// Bumped on every release; handles from earlier generations are dead.
    generation: u32,
    value: Option<T>,
}

impl<T> Slot<T> {
    const fn vacant() -> Self {
        Self {
            bits: GcBits {
                marked: false,
                tenured: false,
                permanent: false,
            },
            generation: 0,
            value: None,
        }
    }
}

/// Fixed-capacity free-list of `T` slots.
///
/// Capacity only changes through [`grow`](Pool::grow), which doubles it.
#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Pool<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
        };
        pool.extend_to(capacity);
        pool
    }

    fn extend_to(&mut self, capacity: usize) {
        let start = self.slots.len();
        self.slots.resize_with(capacity, Slot::vacant);
        // the free list is a stack: push high indices first so low ones are handed out first
        let mut fresh: Vec<u32> = (start..capacity).map(|i| i as u32).collect();
        fresh.reverse();
        fresh.extend(self.free.drain(..));
        self.free = fresh;
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of free slots.
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of occupied slots.
    #[inline]
    pub fn live(&self) -> usize {
        self.capacity() - self.available()
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.free.is_empty()
    }

    /// Take a free slot for `value`. Answers `None` when the pool is
    /// exhausted; the caller decides whether to collect or grow.
    pub fn obtain(&mut self, value: T) -> Option<Handle<T>> {
        let index = self.free.pop()?;
        Some(self.occupy(index, value))
    }

    /// Take a free slot for `value`, doubling the capacity first if none is left.
    pub fn obtain_or_grow(&mut self, value: T) -> Handle<T> {
        let index = loop {
            if let Some(index) = self.free.pop() {
                break index;
            }
            self.grow();
        };
        self.occupy(index, value)
    }

    fn occupy(&mut self, index: u32, value: T) -> Handle<T> {
        let slot = &mut self.slots[index as usize];
        slot.bits = GcBits::default();
        slot.value = Some(value);
        Handle::new(index, slot.generation)
    }

    /// Return a slot to the free list, dropping its value.
    pub fn release(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.live_slot_mut(handle)?;
        let value = slot.value.take()?;
        slot.bits = GcBits::default();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        Some(value)
    }

    /// Double the capacity (at least one slot).
    pub fn grow(&mut self) {
        let target = (self.capacity() * 2).max(1);
        self.extend_to(target);
    }

    #[inline]
    fn live_slot(&self, handle: Handle<T>) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation() && slot.value.is_some())
    }

    #[inline]
    fn live_slot_mut(&mut self, handle: Handle<T>) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation() && slot.value.is_some())
    }

    /// Whether `handle` still names the object it was handed out for.
    #[inline]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.live_slot(handle).is_some()
    }

    #[inline]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.live_slot(handle)?.value.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.live_slot_mut(handle)?.value.as_mut()
    }

    /// Collector bits of an occupied slot; vacant slots answer the defaults.
    #[inline]
    pub fn bits(&self, handle: Handle<T>) -> GcBits {
        self.live_slot(handle).map_or_else(GcBits::default, |slot| slot.bits)
    }

    #[inline]
    pub fn bits_mut(&mut self, handle: Handle<T>) -> Option<&mut GcBits> {
        self.live_slot_mut(handle).map(|slot| &mut slot.bits)
    }
}
