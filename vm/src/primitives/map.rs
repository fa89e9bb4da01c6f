use object::{ObjectKind, SlotKey, Value};

use crate::interpreter::{InterpreterState, RuntimeError};
use crate::primitives::{
    arg, deref, expect_map, expect_map_transient, expect_string,
};
use crate::VM;

fn key_text(vm: &VM, key: Value) -> Result<String, RuntimeError> {
    Ok(expect_string(vm, key)?.as_str().to_string())
}

/// The slot key for a String, registered on first use.
fn intern_key(vm: &mut VM, key: Value) -> Result<SlotKey, RuntimeError> {
    let text = key_text(vm, key)?;
    Ok(vm.constants.intern_key(&text))
}

pub fn map_at(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let key = arg(args, 0)?;
    let found = match vm.constants.find_key(&key_text(vm, key)?) {
        Some(slot) => expect_map(vm, receiver)?.get(slot),
        None => None,
    };
    found.ok_or_else(|| RuntimeError::KeyNotFound {
        key: vm.display(key),
    })
}

/// Answers a new Map; the receiver is unchanged.
pub fn map_at_put(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let value = arg(args, 1)?;
    let slot = intern_key(vm, arg(args, 0)?)?;
    let updated = expect_map(vm, receiver)?.with(slot, value);
    Ok(Value::Map(vm.allocate(state, updated)))
}

pub fn map_transient(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    let transient = expect_map(vm, receiver)?.transient();
    Ok(Value::MapTransient(vm.allocate(state, transient)))
}

pub fn map_transient_persist(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    let handle = expect_map_transient(vm, receiver)?;
    let map = deref(vm, handle)?.persist();
    Ok(Value::Map(vm.allocate(state, map)))
}

/// Store in place; answers the transient.
pub fn map_transient_at_put(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let value = arg(args, 1)?;
    let handle = expect_map_transient(vm, receiver)?;
    let slot = intern_key(vm, arg(args, 0)?)?;
    if !vm.heap.map_transient_put(handle, slot, value) {
        return Err(RuntimeError::DeadObject {
            kind: ObjectKind::MapTransient,
        });
    }
    Ok(receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::special::bootstrap;
    use crate::VmSettings;
    use object::{Map, MapTransient, NoRoots, Number, Str};

    fn string(vm: &mut VM, text: &str) -> Value {
        Value::String(vm.heap.allocate(Str::new(text), &NoRoots))
    }

    #[test]
    fn runtime_keys_stay_out_of_the_constants() {
        let mut vm = bootstrap(VmSettings::default()).unwrap();
        let mut state = InterpreterState::new();
        let one = Value::Number(vm.heap.allocate_permanent(Number::from_i64(1)));
        let mut map = Value::Map(vm.heap.allocate_permanent(Map::new()));
        let constants = vm.constants.len();
        let keys = vm.constants.key_count();

        for text in ["colour", "colour", "shade", "colour"] {
            let key = string(&mut vm, text);
            map = map_at_put(&mut vm, &mut state, map, &[key, one]).unwrap();
        }
        assert_eq!(vm.constants.len(), constants);
        assert_eq!(vm.constants.key_count(), keys + 2);
        assert_eq!(vm.constants.find_string("colour"), None);

        let key = string(&mut vm, "colour");
        assert_eq!(map_at(&mut vm, &mut state, map, &[key]), Ok(one));
    }

    #[test]
    fn unknown_keys_are_not_registered_by_lookups() {
        let mut vm = bootstrap(VmSettings::default()).unwrap();
        let mut state = InterpreterState::new();
        let map = Value::Map(vm.heap.allocate_permanent(Map::new()));
        let keys = vm.constants.key_count();

        let key = string(&mut vm, "missing");
        assert!(matches!(
            map_at(&mut vm, &mut state, map, &[key]),
            Err(RuntimeError::KeyNotFound { .. })
        ));
        assert_eq!(vm.constants.key_count(), keys);
    }

    #[test]
    fn storing_into_a_collected_transient_is_an_error() {
        let mut vm = bootstrap(VmSettings::default()).unwrap();
        let mut state = InterpreterState::new();
        let stale = vm.heap.allocate(MapTransient::default(), &NoRoots);
        vm.collect_garbage(true);

        let key = Value::String(vm.heap.allocate_permanent(Str::new("k")));
        let nil = vm.world.nil;
        let result = map_transient_at_put(
            &mut vm,
            &mut state,
            Value::MapTransient(stale),
            &[key, nil],
        );
        assert_eq!(
            result,
            Err(RuntimeError::DeadObject {
                kind: ObjectKind::MapTransient
            })
        );
    }
}
