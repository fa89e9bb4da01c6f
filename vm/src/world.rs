use object::{Handle, Heap, Map, ObjectKind, SlotKey, Value};

use crate::constants::ConstantsTable;

/// The global namespace and the well-known objects the VM needs directly.
///
/// Everything here is permanent.
#[derive(Debug)]
pub struct World {
    pub globals: Handle<Map>,
    pub nil: Value,
    pub true_value: Value,
    pub false_value: Value,
    pub transcript: Value,
    prototypes: [Handle<Map>; ObjectKind::COUNT],
}

impl World {
    /// Allocate the namespace, the singletons, and one empty prototype per
    /// kind, and bind them all as globals.
    pub fn new(heap: &mut Heap, constants: &mut ConstantsTable) -> Self {
        let globals = heap.allocate_permanent(Map::new());
        let mut object = || Value::Map(heap.allocate_permanent(Map::new()));
        let nil = object();
        let true_value = object();
        let false_value = object();
        let transcript = object();

        let method_prototype = heap.allocate_permanent(Map::new());
        let prototypes = ObjectKind::ALL.map(|kind| match kind {
            ObjectKind::Method | ObjectKind::NativeMethod => method_prototype,
            _ => heap.allocate_permanent(Map::new()),
        });

        let world = Self {
            globals,
            nil,
            true_value,
            false_value,
            transcript,
            prototypes,
        };

        world.define(heap, constants, "nil", nil);
        world.define(heap, constants, "true", true_value);
        world.define(heap, constants, "false", false_value);
        world.define(heap, constants, "Transcript", transcript);
        for kind in ObjectKind::ALL {
            let prototype = Value::Map(world.prototype(kind));
            world.define(heap, constants, kind.prototype_name(), prototype);
        }
        world
    }

    #[inline]
    pub fn prototype(&self, kind: ObjectKind) -> Handle<Map> {
        self.prototypes[kind as usize]
    }

    pub fn global(&self, heap: &Heap, key: SlotKey) -> Option<Value> {
        heap.get(self.globals)?.get(key)
    }

    pub fn lookup(&self, heap: &Heap, constants: &ConstantsTable, name: &str) -> Option<Value> {
        self.global(heap, constants.find_key(name)?)
    }

    /// Bind a global. The value becomes permanent with everything it
    /// references.
    pub fn define(
        &self,
        heap: &mut Heap,
        constants: &mut ConstantsTable,
        name: &str,
        value: Value,
    ) {
        let key = constants.intern_key(name);
        heap.map_define(self.globals, key, value);
    }

    #[inline]
    pub fn boolean(&self, value: bool) -> Value {
        if value { self.true_value } else { self.false_value }
    }

    pub fn prototype_count(&self) -> usize {
        let mut seen: Vec<Handle<Map>> = self.prototypes.to_vec();
        seen.sort_by_key(|h| h.index());
        seen.dedup();
        seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object::HeapSettings;

    #[test]
    fn prototypes_are_bound_by_name() {
        let mut heap = Heap::new(HeapSettings {
            initial_capacity: 32,
            ..Default::default()
        });
        let mut constants = ConstantsTable::new();
        let world = World::new(&mut heap, &mut constants);

        let number = world.lookup(&heap, &constants, "Number");
        assert_eq!(number, Some(Value::Map(world.prototype(ObjectKind::Number))));
        assert_eq!(
            world.prototype(ObjectKind::Method),
            world.prototype(ObjectKind::NativeMethod)
        );
        assert_eq!(world.prototype_count(), 7);
        assert_eq!(world.lookup(&heap, &constants, "true"), Some(world.true_value));
        assert!(heap.bits(world.nil).permanent);
    }
}
