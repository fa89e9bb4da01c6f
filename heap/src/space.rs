use crate::{GcBits, Handle, Pool};

/// Whether a cycle walks the whole graph or only the young part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Minor,
    Full,
}

impl CycleKind {
    #[inline]
    pub fn is_full(self) -> bool {
        matches!(self, CycleKind::Full)
    }
}

/// Outcome of sweeping one space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepCounts {
    pub released: usize,
    pub promoted: usize,
    pub survivors: usize,
}

impl SweepCounts {
    pub fn merge(&mut self, other: SweepCounts) {
        self.released += other.released;
        self.promoted += other.promoted;
        self.survivors += other.survivors;
    }
}

/// Cumulative collector statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    pub cycles: u64,
    pub full_cycles: u64,
    pub released: u64,
    pub promoted: u64,
    pub grown: u64,
}

/// The generational bookkeeping for one object kind.
///
/// New objects are tracked in `eden`. Survivors of an eden sweep are
/// tenured and move to `from`. A full cycle sweeps `from` into `to` and
/// swaps the two, so `to` is empty between cycles. Permanent objects are
/// never tracked by any list.
#[derive(Debug)]
pub struct Space<T> {
    pool: Pool<T>,
    eden: Vec<Handle<T>>,
    from: Vec<Handle<T>>,
    to: Vec<Handle<T>>,
    cycles: u64,
}

impl<T> Space<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: Pool::with_capacity(capacity),
            eden: Vec::new(),
            from: Vec::new(),
            to: Vec::new(),
            cycles: 0,
        }
    }

    #[inline]
    pub fn pool(&self) -> &Pool<T> {
        &self.pool
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.pool.is_exhausted()
    }

    pub fn eden_len(&self) -> usize {
        self.eden.len()
    }

    pub fn tenured_len(&self) -> usize {
        self.from.len() + self.to.len()
    }

    /// Cycles triggered by this kind so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Count a cycle triggered by this kind and decide its kind.
    pub fn next_cycle(&mut self, full_interval: u32) -> CycleKind {
        self.cycles += 1;
        if self.cycles % u64::from(full_interval.max(1)) == 0 {
            CycleKind::Full
        } else {
            CycleKind::Minor
        }
    }

    /// Place `value` in a free slot and track it in eden. Grows the pool
    /// if no slot is free; callers collect before calling this.
    pub fn allocate(&mut self, value: T) -> Handle<T> {
        let handle = self.pool.obtain_or_grow(value);
        self.eden.push(handle);
        handle
    }

    /// Place `value` in a free slot that is never swept.
    pub fn allocate_permanent(&mut self, value: T) -> Handle<T> {
        let handle = self.pool.obtain_or_grow(value);
        if let Some(bits) = self.pool.bits_mut(handle) {
            bits.permanent = true;
        }
        handle
    }

    #[inline]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.pool.get(handle)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.pool.get_mut(handle)
    }

    #[inline]
    pub fn bits(&self, handle: Handle<T>) -> GcBits {
        self.pool.bits(handle)
    }

    #[inline]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.pool.contains(handle)
    }

    /// Set the mark bit. Answers `true` only when the object was newly
    /// marked and its children still have to be visited.
    ///
    /// Permanent objects are never marked. A minor cycle leaves tenured
    /// objects alone.
    pub fn try_mark(&mut self, handle: Handle<T>, cycle: CycleKind) -> bool {
        let Some(bits) = self.pool.bits_mut(handle) else {
            return false;
        };
        if bits.permanent || bits.marked || (!cycle.is_full() && bits.tenured) {
            return false;
        }
        bits.marked = true;
        true
    }

    /// Set the tenured bit ahead of the next sweep. Answers `true` when the
    /// bit changed.
    pub fn try_tenure(&mut self, handle: Handle<T>) -> bool {
        let Some(bits) = self.pool.bits_mut(handle) else {
            return false;
        };
        if bits.permanent || bits.tenured {
            return false;
        }
        bits.tenured = true;
        true
    }

    /// Flag an object as permanent. Answers `true` when the bit changed.
    /// The object drops out of the tracking lists at the next sweep.
    pub fn try_make_permanent(&mut self, handle: Handle<T>) -> bool {
        let Some(bits) = self.pool.bits_mut(handle) else {
            return false;
        };
        if bits.permanent {
            return false;
        }
        bits.permanent = true;
        bits.marked = false;
        true
    }

    /// Full-cycle sweep of the tenured space: unmarked objects go back to
    /// the pool, marked ones are unmarked and move to the other space.
    pub fn sweep_tenured(&mut self) -> SweepCounts {
        let mut counts = SweepCounts::default();
        let from = std::mem::take(&mut self.from);
        for handle in from {
            let bits = self.pool.bits(handle);
            if bits.permanent {
                continue;
            }
            if bits.marked {
                if let Some(bits) = self.pool.bits_mut(handle) {
                    bits.marked = false;
                }
                self.to.push(handle);
                counts.survivors += 1;
            } else {
                self.pool.release(handle);
                counts.released += 1;
            }
        }
        std::mem::swap(&mut self.from, &mut self.to);
        counts
    }

    /// Eden sweep: unmarked young objects go back to the pool, everything
    /// else is unmarked, tenured, and promoted. Eden is empty afterwards.
    pub fn sweep_eden(&mut self) -> SweepCounts {
        let mut counts = SweepCounts::default();
        let eden = std::mem::take(&mut self.eden);
        for handle in eden {
            let bits = self.pool.bits(handle);
            if bits.permanent {
                continue;
            }
            if !bits.marked && !bits.tenured {
                self.pool.release(handle);
                counts.released += 1;
            } else {
                if let Some(bits) = self.pool.bits_mut(handle) {
                    bits.marked = false;
                    bits.tenured = true;
                }
                self.from.push(handle);
                counts.promoted += 1;
            }
        }
        counts
    }

    /// Whether the pool should double after a sweep: fewer free slots than
    /// `threshold` of the capacity.
    pub fn needs_growth(&self, threshold: f64) -> bool {
        (self.pool.available() as f64) < self.pool.capacity() as f64 * threshold
    }

    pub fn grow(&mut self) {
        self.pool.grow();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space_with(values: &[i32]) -> (Space<i32>, Vec<Handle<i32>>) {
        let mut space = Space::new(8);
        let handles = values.iter().map(|v| space.allocate(*v)).collect();
        (space, handles)
    }

    #[test]
    fn every_nth_cycle_is_full() {
        let mut space: Space<i32> = Space::new(1);
        let kinds: Vec<CycleKind> = (0..6).map(|_| space.next_cycle(3)).collect();
        assert_eq!(
            kinds,
            vec![
                CycleKind::Minor,
                CycleKind::Minor,
                CycleKind::Full,
                CycleKind::Minor,
                CycleKind::Minor,
                CycleKind::Full,
            ]
        );
    }

    #[test]
    fn eden_sweep_releases_unmarked_and_promotes_marked() {
        let (mut space, h) = space_with(&[1, 2, 3]);
        assert!(space.try_mark(h[0], CycleKind::Minor));
        assert!(!space.try_mark(h[0], CycleKind::Minor));

        let counts = space.sweep_eden();
        assert_eq!(counts.released, 2);
        assert_eq!(counts.promoted, 1);
        assert!(space.contains(h[0]));
        assert!(!space.contains(h[1]));
        assert!(!space.contains(h[2]));

        let bits = space.bits(h[0]);
        assert!(bits.tenured);
        assert!(!bits.marked);
        assert_eq!(space.eden_len(), 0);
        assert_eq!(space.tenured_len(), 1);
    }

    #[test]
    fn minor_marking_skips_tenured() {
        let (mut space, h) = space_with(&[1]);
        space.try_mark(h[0], CycleKind::Minor);
        space.sweep_eden();

        assert!(!space.try_mark(h[0], CycleKind::Minor));
        assert!(space.try_mark(h[0], CycleKind::Full));
    }

    #[test]
    fn full_sweep_collects_dead_tenured() {
        let (mut space, h) = space_with(&[1, 2]);
        space.try_mark(h[0], CycleKind::Full);
        space.try_mark(h[1], CycleKind::Full);
        space.sweep_eden();
        assert_eq!(space.tenured_len(), 2);

        space.try_mark(h[1], CycleKind::Full);
        let counts = space.sweep_tenured();
        assert_eq!(counts.released, 1);
        assert_eq!(counts.survivors, 1);
        assert!(!space.contains(h[0]));
        assert!(space.contains(h[1]));
        assert!(!space.bits(h[1]).marked);
        assert_eq!(space.tenured_len(), 1);
    }

    #[test]
    fn barrier_tenured_eden_object_is_promoted_unmarked() {
        let (mut space, h) = space_with(&[1]);
        assert!(space.try_tenure(h[0]));
        let counts = space.sweep_eden();
        assert_eq!(counts.promoted, 1);
        assert!(space.contains(h[0]));
    }

    #[test]
    fn permanent_objects_are_never_swept() {
        let mut space: Space<i32> = Space::new(4);
        let fixed = space.allocate_permanent(9);
        let young = space.allocate(1);
        assert!(!space.try_mark(fixed, CycleKind::Full));

        space.try_make_permanent(young);
        space.sweep_eden();
        space.sweep_tenured();
        assert!(space.contains(fixed));
        assert!(space.contains(young));
        assert_eq!(space.tenured_len(), 0);
    }

    #[test]
    fn growth_threshold_uses_free_slots() {
        let mut space: Space<i32> = Space::new(10);
        for i in 0..9 {
            space.allocate(i);
        }
        assert!(!space.needs_growth(0.1));
        space.allocate(9);
        assert!(space.needs_growth(0.1));
        space.grow();
        assert_eq!(space.pool().capacity(), 20);
    }

    #[test]
    fn exhausted_space_grows_on_allocation() {
        let mut space: Space<i32> = Space::new(1);
        let first = space.allocate(1);
        assert!(space.is_exhausted());
        let second = space.allocate_permanent(2);
        let third = space.allocate(3);
        assert_eq!(space.pool().capacity(), 4);
        assert_eq!(space.get(first), Some(&1));
        assert_eq!(space.get(second), Some(&2));
        assert_eq!(space.get(third), Some(&3));
        assert!(space.bits(second).permanent);
        assert_eq!(space.eden_len(), 2);
    }

    #[test]
    fn swept_handle_stays_dead_after_reuse() {
        let (mut space, h) = space_with(&[1]);
        space.sweep_eden();
        let reused = space.allocate(2);
        assert_eq!(reused.index(), h[0].index());
        assert!(!space.contains(h[0]));
        assert!(!space.try_mark(h[0], CycleKind::Full));
        assert_eq!(space.get(reused), Some(&2));
    }
}
