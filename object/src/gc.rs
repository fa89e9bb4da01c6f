//! The object heap: one generational [`Space`] per object kind.
//!
//! Allocation that finds its kind's pool empty runs a collection cycle
//! first. Marking is global (a value graph can span every kind) and every
//! kind is swept afterwards, so no mark bit outlives a cycle.

use core::fmt;
use std::cmp::Ordering;

use heap::{CycleKind, GcBits, GcStats, Handle, HeapSettings, Space, SweepCounts};

use crate::{
    Array, ArrayTransient, Map, MapTransient, Method, NativeMethod, Number, ObjectKind, SlotKey,
    Str, Value,
};

/// Supplies the live roots at collection time.
pub trait RootProvider {
    fn visit_roots(&self, visitor: &mut dyn FnMut(Value));
}

/// No roots at all; everything young is garbage.
pub struct NoRoots;

impl RootProvider for NoRoots {
    fn visit_roots(&self, _visitor: &mut dyn FnMut(Value)) {}
}

impl RootProvider for Vec<Value> {
    fn visit_roots(&self, visitor: &mut dyn FnMut(Value)) {
        self.iter().copied().for_each(visitor);
    }
}

/// A type that lives in one of the heap's spaces.
pub trait HeapObject: Sized {
    const KIND: ObjectKind;

    fn space(heap: &Heap) -> &Space<Self>;
    fn space_mut(heap: &mut Heap) -> &mut Space<Self>;
    fn into_value(handle: Handle<Self>) -> Value;

    /// Report every value this object references.
    fn trace(&self, visitor: &mut dyn FnMut(Value));
}

macro_rules! heap_object {
    ($ty:ty, $variant:ident, $field:ident, |$this:ident, $visitor:ident| $trace:block) => {
        impl HeapObject for $ty {
            const KIND: ObjectKind = ObjectKind::$variant;

            #[inline]
            fn space(heap: &Heap) -> &Space<Self> {
                &heap.$field
            }

            #[inline]
            fn space_mut(heap: &mut Heap) -> &mut Space<Self> {
                &mut heap.$field
            }

            #[inline]
            fn into_value(handle: Handle<Self>) -> Value {
                Value::$variant(handle)
            }

            #[allow(unused_variables)]
            fn trace(&self, $visitor: &mut dyn FnMut(Value)) {
                let $this = self;
                $trace
            }
        }
    };
}

heap_object!(Map, Map, maps, |this, visitor| {
    this.values().for_each(visitor)
});
heap_object!(MapTransient, MapTransient, map_transients, |this, visitor| {
    this.values().for_each(visitor)
});
heap_object!(Array, Array, arrays, |this, visitor| {
    this.elements().iter().copied().for_each(visitor)
});
heap_object!(ArrayTransient, ArrayTransient, array_transients, |this, visitor| {
    this.elements().iter().copied().for_each(visitor)
});
heap_object!(Number, Number, numbers, |this, visitor| {});
heap_object!(Str, String, strings, |this, visitor| {});
heap_object!(Method, Method, methods, |this, visitor| {
    this.references().for_each(visitor)
});
heap_object!(NativeMethod, NativeMethod, natives, |this, visitor| {});

/// Run `$body` with `$space` bound to the space holding `$value` and `$h`
/// to its typed handle.
macro_rules! with_space {
    ($heap:expr, $value:expr, |$space:ident, $h:ident| $body:expr) => {
        match $value {
            Value::Map($h) => { let $space = &$heap.maps; $body }
            Value::MapTransient($h) => { let $space = &$heap.map_transients; $body }
            Value::Array($h) => { let $space = &$heap.arrays; $body }
            Value::ArrayTransient($h) => { let $space = &$heap.array_transients; $body }
            Value::Number($h) => { let $space = &$heap.numbers; $body }
            Value::String($h) => { let $space = &$heap.strings; $body }
            Value::Method($h) => { let $space = &$heap.methods; $body }
            Value::NativeMethod($h) => { let $space = &$heap.natives; $body }
        }
    };
}

macro_rules! with_space_mut {
    ($heap:expr, $value:expr, |$space:ident, $h:ident| $body:expr) => {
        match $value {
            Value::Map($h) => { let $space = &mut $heap.maps; $body }
            Value::MapTransient($h) => { let $space = &mut $heap.map_transients; $body }
            Value::Array($h) => { let $space = &mut $heap.arrays; $body }
            Value::ArrayTransient($h) => { let $space = &mut $heap.array_transients; $body }
            Value::Number($h) => { let $space = &mut $heap.numbers; $body }
            Value::String($h) => { let $space = &mut $heap.strings; $body }
            Value::Method($h) => { let $space = &mut $heap.methods; $body }
            Value::NativeMethod($h) => { let $space = &mut $heap.natives; $body }
        }
    };
}

macro_rules! with_kind_space {
    ($heap:expr, $kind:expr, |$space:ident| $body:expr) => {
        match $kind {
            ObjectKind::Map => { let $space = &$heap.maps; $body }
            ObjectKind::MapTransient => { let $space = &$heap.map_transients; $body }
            ObjectKind::Array => { let $space = &$heap.arrays; $body }
            ObjectKind::ArrayTransient => { let $space = &$heap.array_transients; $body }
            ObjectKind::Number => { let $space = &$heap.numbers; $body }
            ObjectKind::String => { let $space = &$heap.strings; $body }
            ObjectKind::Method => { let $space = &$heap.methods; $body }
            ObjectKind::NativeMethod => { let $space = &$heap.natives; $body }
        }
    };
}

macro_rules! with_kind_space_mut {
    ($heap:expr, $kind:expr, |$space:ident| $body:expr) => {
        match $kind {
            ObjectKind::Map => { let $space = &mut $heap.maps; $body }
            ObjectKind::MapTransient => { let $space = &mut $heap.map_transients; $body }
            ObjectKind::Array => { let $space = &mut $heap.arrays; $body }
            ObjectKind::ArrayTransient => { let $space = &mut $heap.array_transients; $body }
            ObjectKind::Number => { let $space = &mut $heap.numbers; $body }
            ObjectKind::String => { let $space = &mut $heap.strings; $body }
            ObjectKind::Method => { let $space = &mut $heap.methods; $body }
            ObjectKind::NativeMethod => { let $space = &mut $heap.natives; $body }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareError {
    NotComparable { left: ObjectKind, right: ObjectKind },
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotComparable { left, right } => {
                write!(f, "cannot compare {left} with {right}")
            }
        }
    }
}

impl std::error::Error for CompareError {}

#[derive(Debug)]
pub struct Heap {
    settings: HeapSettings,
    maps: Space<Map>,
    map_transients: Space<MapTransient>,
    arrays: Space<Array>,
    array_transients: Space<ArrayTransient>,
    numbers: Space<Number>,
    strings: Space<Str>,
    methods: Space<Method>,
    natives: Space<NativeMethod>,
    stats: GcStats,
}

impl Heap {
    pub fn new(settings: HeapSettings) -> Self {
        let capacity = settings.initial_capacity;
        Self {
            settings,
            maps: Space::new(capacity),
            map_transients: Space::new(capacity),
            arrays: Space::new(capacity),
            array_transients: Space::new(capacity),
            numbers: Space::new(capacity),
            strings: Space::new(capacity),
            methods: Space::new(capacity),
            natives: Space::new(capacity),
            stats: GcStats::default(),
        }
    }

    #[inline]
    pub fn settings(&self) -> &HeapSettings {
        &self.settings
    }

    #[inline]
    pub fn stats(&self) -> GcStats {
        self.stats
    }

    // ── allocation ─────────────────────────────────────────────────

    /// Allocate a collectible object. An empty pool triggers a cycle over
    /// `roots`; the pool doubles afterwards if too few slots came free.
    pub fn allocate<T: HeapObject>(&mut self, value: T, roots: &dyn RootProvider) -> Handle<T> {
        if T::space(self).is_exhausted() {
            let interval = self.settings.full_cycle_interval;
            let cycle = T::space_mut(self).next_cycle(interval);
            self.run_cycle(T::KIND, cycle, roots);

            if T::space(self).needs_growth(self.settings.growth_threshold) {
                let before = T::space(self).pool().capacity();
                T::space_mut(self).grow();
                self.stats.grown += 1;
                log::info!(
                    "{} pool grew from {before} to {} slots",
                    T::KIND,
                    T::space(self).pool().capacity()
                );
            }
        }
        T::space_mut(self).allocate(value)
    }

    /// Allocate an object that is never collected.
    pub fn allocate_permanent<T: HeapObject>(&mut self, value: T) -> Handle<T> {
        T::space_mut(self).allocate_permanent(value)
    }

    #[inline]
    pub fn get<T: HeapObject>(&self, handle: Handle<T>) -> Option<&T> {
        T::space(self).get(handle)
    }

    /// Whether `value` still refers to a live slot.
    pub fn contains(&self, value: Value) -> bool {
        with_space!(self, value, |space, h| space.contains(h))
    }

    pub fn bits(&self, value: Value) -> GcBits {
        with_space!(self, value, |space, h| space.bits(h))
    }

    pub fn capacity(&self, kind: ObjectKind) -> usize {
        with_kind_space!(self, kind, |space| space.pool().capacity())
    }

    pub fn live(&self, kind: ObjectKind) -> usize {
        with_kind_space!(self, kind, |space| space.pool().live())
    }

    pub fn eden_len(&self, kind: ObjectKind) -> usize {
        with_kind_space!(self, kind, |space| space.eden_len())
    }

    pub fn tenured_len(&self, kind: ObjectKind) -> usize {
        with_kind_space!(self, kind, |space| space.tenured_len())
    }

    // ── collection ─────────────────────────────────────────────────

    /// Run an explicit cycle. Never grows a pool.
    pub fn collect(&mut self, full: bool, roots: &dyn RootProvider) -> SweepCounts {
        let cycle = if full { CycleKind::Full } else { CycleKind::Minor };
        self.run_cycle(ObjectKind::Map, cycle, roots)
    }

    fn run_cycle(
        &mut self,
        trigger: ObjectKind,
        cycle: CycleKind,
        roots: &dyn RootProvider,
    ) -> SweepCounts {
        self.mark(cycle, roots);

        let mut counts = SweepCounts::default();
        for kind in ObjectKind::ALL {
            counts.merge(with_kind_space_mut!(self, kind, |space| {
                sweep_space(space, cycle)
            }));
        }

        self.stats.cycles += 1;
        if cycle.is_full() {
            self.stats.full_cycles += 1;
        }
        self.stats.released += counts.released as u64;
        self.stats.promoted += counts.promoted as u64;

        log::debug!(
            "{cycle:?} cycle triggered by {trigger}: released {}, promoted {}, tenured survivors {}",
            counts.released,
            counts.promoted,
            counts.survivors
        );
        counts
    }

    fn mark(&mut self, cycle: CycleKind, roots: &dyn RootProvider) {
        let mut worklist = Vec::new();
        roots.visit_roots(&mut |value| worklist.push(value));

        while let Some(value) = worklist.pop() {
            let newly = with_space_mut!(self, value, |space, h| space.try_mark(h, cycle));
            if newly {
                self.trace(value, &mut |child| worklist.push(child));
            }
        }
    }

    fn trace(&self, value: Value, visitor: &mut dyn FnMut(Value)) {
        with_space!(self, value, |space, h| {
            if let Some(object) = space.get(h) {
                object.trace(visitor);
            }
        })
    }

    // ── barriers ───────────────────────────────────────────────────

    /// Tenure `value` and its untenured subgraph so minor cycles, which
    /// skip tenured objects, cannot strand any part of it.
    pub fn tenure(&mut self, value: Value) {
        let mut worklist = vec![value];
        while let Some(value) = worklist.pop() {
            let changed = with_space_mut!(self, value, |space, h| space.try_tenure(h));
            if changed {
                self.trace(value, &mut |child| worklist.push(child));
            }
        }
    }

    /// Make `value` and everything it references permanent.
    pub fn make_permanent(&mut self, value: Value) {
        let mut worklist = vec![value];
        while let Some(value) = worklist.pop() {
            let changed = with_space_mut!(self, value, |space, h| space.try_make_permanent(h));
            if changed {
                self.trace(value, &mut |child| worklist.push(child));
            }
        }
    }

    fn write_barrier(&mut self, container: Value, stored: Value) {
        let bits = self.bits(container);
        if bits.permanent {
            self.make_permanent(stored);
        } else if bits.tenured {
            self.tenure(stored);
        }
    }

    /// Append to a transient array in place. Answers `false` for a dead
    /// handle.
    pub fn array_transient_push(&mut self, handle: Handle<ArrayTransient>, value: Value) -> bool {
        if !self.array_transients.contains(handle) {
            return false;
        }
        self.write_barrier(Value::ArrayTransient(handle), value);
        match self.array_transients.get_mut(handle) {
            Some(transient) => {
                transient.push(value);
                true
            }
            None => false,
        }
    }

    /// Store into a transient map in place.
    pub fn map_transient_put(
        &mut self,
        handle: Handle<MapTransient>,
        key: SlotKey,
        value: Value,
    ) -> bool {
        if !self.map_transients.contains(handle) {
            return false;
        }
        self.write_barrier(Value::MapTransient(handle), value);
        match self.map_transients.get_mut(handle) {
            Some(transient) => {
                transient.put(key, value);
                true
            }
            None => false,
        }
    }

    /// Define a slot of a namespace map in place (globals, prototypes).
    pub fn map_define(&mut self, handle: Handle<Map>, key: SlotKey, value: Value) -> bool {
        if !self.maps.contains(handle) {
            return false;
        }
        self.write_barrier(Value::Map(handle), value);
        match self.maps.get_mut(handle) {
            Some(map) => {
                map.define(key, value);
                true
            }
            None => false,
        }
    }

    // ── equality, ordering, printing ───────────────────────────────

    /// Structural equality for values; identity for methods and
    /// transients.
    pub fn equals(&self, a: Value, b: Value) -> bool {
        if a == b {
            return true;
        }
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                matches!((self.get(x), self.get(y)), (Some(x), Some(y)) if x == y)
            }
            (Value::String(x), Value::String(y)) => {
                matches!((self.get(x), self.get(y)), (Some(x), Some(y)) if x == y)
            }
            (Value::Array(x), Value::Array(y)) => match (self.get(x), self.get(y)) {
                (Some(x), Some(y)) => {
                    x.len() == y.len()
                        && x.elements()
                            .iter()
                            .zip(y.elements())
                            .all(|(l, r)| self.equals(*l, *r))
                }
                _ => false,
            },
            (Value::Map(x), Value::Map(y)) => match (self.get(x), self.get(y)) {
                (Some(x), Some(y)) => {
                    x.len() == y.len()
                        && x.slots().all(|(key, l)| {
                            y.get(key).is_some_and(|r| self.equals(l, r))
                        })
                }
                _ => false,
            },
            _ => false,
        }
    }

    pub fn compare(&self, a: Value, b: Value) -> Result<Ordering, CompareError> {
        let not_comparable = CompareError::NotComparable {
            left: a.kind(),
            right: b.kind(),
        };
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => match (self.get(x), self.get(y)) {
                (Some(x), Some(y)) => Ok(x.cmp(y)),
                _ => Err(not_comparable),
            },
            (Value::String(x), Value::String(y)) => match (self.get(x), self.get(y)) {
                (Some(x), Some(y)) => Ok(x.cmp(y)),
                _ => Err(not_comparable),
            },
            (Value::Array(x), Value::Array(y)) => match (self.get(x), self.get(y)) {
                (Some(x), Some(y)) => {
                    for (l, r) in x.elements().iter().zip(y.elements()) {
                        match self.compare(*l, *r)? {
                            Ordering::Equal => continue,
                            other => return Ok(other),
                        }
                    }
                    Ok(x.len().cmp(&y.len()))
                }
                _ => Err(not_comparable),
            },
            _ => Err(not_comparable),
        }
    }

    /// Textual form used by `print:` and string formatting.
    pub fn display(&self, value: Value) -> String {
        let mut out = String::new();
        self.write_value(value, false, &mut out);
        out
    }

    fn write_value(&self, value: Value, nested: bool, out: &mut String) {
        use fmt::Write;

        let _ = match value {
            Value::Number(h) => match self.get(h) {
                Some(n) => write!(out, "{n}"),
                None => out.write_str("<dead>"),
            },
            Value::String(h) => match self.get(h) {
                Some(s) if nested => write!(out, "'{s}'"),
                Some(s) => out.write_str(s.as_str()),
                None => out.write_str("<dead>"),
            },
            Value::Array(h) => match self.get(h) {
                Some(array) => {
                    self.write_elements("#(", array.elements(), out);
                    Ok(())
                }
                None => out.write_str("<dead>"),
            },
            Value::ArrayTransient(h) => match self.get(h) {
                Some(array) => {
                    self.write_elements("ArrayTransient #(", array.elements(), out);
                    Ok(())
                }
                None => out.write_str("<dead>"),
            },
            _ if !self.contains(value) => out.write_str("<dead>"),
            Value::Map(h) => write!(out, "Object #{}", h.index()),
            Value::MapTransient(h) => write!(out, "MapTransient #{}", h.index()),
            Value::Method(h) => write!(out, "Method #{}", h.index()),
            Value::NativeMethod(h) => match self.get(h) {
                Some(native) => write!(out, "NativeMethod {}", native.name),
                None => out.write_str("<dead>"),
            },
        };
    }

    fn write_elements(&self, open: &str, elements: &[Value], out: &mut String) {
        out.push_str(open);
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.write_value(*element, true, out);
        }
        out.push(')');
    }
}

fn sweep_space<T>(space: &mut Space<T>, cycle: CycleKind) -> SweepCounts {
    let mut counts = SweepCounts::default();
    if cycle.is_full() {
        counts.merge(space.sweep_tenured());
    }
    counts.merge(space.sweep_eden());
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_heap(capacity: usize) -> Heap {
        Heap::new(HeapSettings {
            initial_capacity: capacity,
            ..Default::default()
        })
    }

    fn number(heap: &mut Heap, n: i64) -> Value {
        Value::Number(heap.allocate(Number::from_i64(n), &NoRoots))
    }

    #[test]
    fn unreachable_young_objects_are_recycled() {
        let mut heap = small_heap(8);
        let kept = number(&mut heap, 1);
        let dropped = number(&mut heap, 2);

        let counts = heap.collect(false, &vec![kept]);
        assert_eq!(counts.released, 1);
        assert!(heap.contains(kept));
        assert!(!heap.contains(dropped));
        assert!(heap.bits(kept).tenured);
    }

    #[test]
    fn marking_follows_references_across_kinds() {
        let mut heap = small_heap(8);
        let element = number(&mut heap, 7);
        let array = Value::Array(heap.allocate(Array::new(vec![element]), &NoRoots));
        let method = {
            let compiled = std::rc::Rc::new(crate::MethodBuilder::new().finish());
            Method::closure(compiled, array, &[])
        };
        let method = Value::Method(heap.allocate(method, &NoRoots));

        heap.collect(true, &vec![method]);
        assert!(heap.contains(method));
        assert!(heap.contains(array));
        assert!(heap.contains(element));
    }

    #[test]
    fn tenured_garbage_survives_minor_but_not_full_cycles() {
        let mut heap = small_heap(8);
        let value = number(&mut heap, 1);
        heap.collect(false, &vec![value]);

        heap.collect(false, &NoRoots);
        assert!(heap.contains(value));
        heap.collect(true, &NoRoots);
        assert!(!heap.contains(value));
    }

    #[test]
    fn exhausted_pool_collects_before_growing() {
        let mut heap = small_heap(4);
        for n in 0..4 {
            number(&mut heap, n);
        }
        // nothing is rooted, so the cycle frees all four slots
        number(&mut heap, 4);
        assert_eq!(heap.capacity(ObjectKind::Number), 4);
        assert_eq!(heap.stats().cycles, 1);
        assert_eq!(heap.stats().grown, 0);
    }

    #[test]
    fn pool_doubles_when_survivors_fill_it() {
        let mut heap = small_heap(4);
        let roots: Vec<Value> = (0..4).map(|n| number(&mut heap, n)).collect();
        let h = heap.allocate(Number::from_i64(4), &roots);
        assert_eq!(heap.capacity(ObjectKind::Number), 8);
        assert_eq!(heap.stats().grown, 1);
        assert!(roots.iter().all(|v| heap.contains(*v)));
        assert!(heap.contains(Value::Number(h)));
    }

    #[test]
    fn write_barrier_tenures_values_stored_in_tenured_transients() {
        let mut heap = small_heap(8);
        let transient = heap.allocate(ArrayTransient::new(), &NoRoots);
        let root = Value::ArrayTransient(transient);
        heap.collect(false, &vec![root]);
        assert!(heap.bits(root).tenured);

        let young = number(&mut heap, 3);
        assert!(heap.array_transient_push(transient, young));
        assert!(heap.bits(young).tenured);

        heap.collect(false, &vec![root]);
        assert!(heap.contains(young));
    }

    #[test]
    fn permanent_containers_make_stored_values_permanent() {
        let mut heap = small_heap(8);
        let globals = heap.allocate_permanent(Map::new());
        let item = number(&mut heap, 5);
        let array = Value::Array(heap.allocate(Array::new(vec![item]), &NoRoots));
        assert!(heap.map_define(globals, 0, array));

        heap.collect(true, &NoRoots);
        assert!(heap.bits(array).permanent);
        assert!(heap.bits(item).permanent);
        assert!(heap.contains(item));
    }

    #[test]
    fn equality_is_structural_and_ordering_is_typed() {
        let mut heap = small_heap(8);
        let a = number(&mut heap, 2);
        let b = number(&mut heap, 2);
        let c = number(&mut heap, 3);
        assert!(heap.equals(a, b));
        assert_eq!(heap.compare(a, c), Ok(Ordering::Less));

        let text = Value::String(heap.allocate(Str::new("2"), &NoRoots));
        assert!(!heap.equals(a, text));
        assert_eq!(
            heap.compare(a, text),
            Err(CompareError::NotComparable {
                left: ObjectKind::Number,
                right: ObjectKind::String,
            })
        );
    }

    #[test]
    fn arrays_print_nested_strings_quoted() {
        let mut heap = small_heap(8);
        let one = number(&mut heap, 1);
        let text = Value::String(heap.allocate(Str::new("two"), &NoRoots));
        let array = Value::Array(heap.allocate(Array::new(vec![one, text]), &NoRoots));
        assert_eq!(heap.display(array), "#(1 'two')");
        assert_eq!(heap.display(text), "two");
    }
}
