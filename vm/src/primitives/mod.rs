use object::{
    Array, ArrayTransient, Handle, HeapObject, Map, MapTransient, Method,
    Number, ObjectKind, Str, Value,
};

use crate::interpreter::{InterpreterState, RuntimeError};
use crate::VM;

pub mod array;
pub mod compare;
pub mod map;
pub mod method;
pub mod number;
pub mod string;
pub mod transcript;

pub type PrimitiveFn = fn(
    &mut VM,
    &mut InterpreterState,
    Value,
    &[Value],
) -> Result<Value, RuntimeError>;

/// A host function: a name to resolve it by, the number of arguments it
/// takes besides the receiver, and the function itself.
#[derive(Clone, Copy)]
pub struct PrimitiveDesc {
    pub name: &'static str,
    pub arity: u8,
    pub func: PrimitiveFn,
}

impl PrimitiveDesc {
    pub const fn new(name: &'static str, arity: u8, func: PrimitiveFn) -> Self {
        Self { name, arity, func }
    }
}

pub fn default_primitives() -> Vec<PrimitiveDesc> {
    vec![
        PrimitiveDesc::new("print", 1, transcript::print),
        PrimitiveDesc::new("endl", 0, transcript::endl),
        PrimitiveDesc::new("isIdenticalTo", 1, compare::is_identical_to),
        PrimitiveDesc::new("equals", 1, compare::equals),
        PrimitiveDesc::new("greater", 1, compare::greater),
        PrimitiveDesc::new("greaterOrEqual", 1, compare::greater_or_equal),
        PrimitiveDesc::new("less", 1, compare::less),
        PrimitiveDesc::new("lessOrEqual", 1, compare::less_or_equal),
        PrimitiveDesc::new("plus", 1, number::plus),
        PrimitiveDesc::new("minus", 1, number::minus),
        PrimitiveDesc::new("multiply", 1, number::multiply),
        PrimitiveDesc::new("divide", 1, number::divide),
        PrimitiveDesc::new("sqrt", 0, number::sqrt),
        PrimitiveDesc::new("random", 0, number::random),
        PrimitiveDesc::new("stringConcat", 1, string::string_concat),
        PrimitiveDesc::new("arrayAt", 1, array::array_at),
        PrimitiveDesc::new("arrayPush", 1, array::array_push),
        PrimitiveDesc::new("arrayTake", 1, array::array_take),
        PrimitiveDesc::new("arrayDrop", 1, array::array_drop),
        PrimitiveDesc::new("arraySize", 0, array::array_size),
        PrimitiveDesc::new(
            "arrayFormatString",
            1,
            array::array_format_string,
        ),
        PrimitiveDesc::new("arrayTransient", 0, array::array_transient),
        PrimitiveDesc::new(
            "arrayTransientPersist",
            0,
            array::array_transient_persist,
        ),
        PrimitiveDesc::new(
            "arrayTransientPush",
            1,
            array::array_transient_push,
        ),
        PrimitiveDesc::new("mapAt", 1, map::map_at),
        PrimitiveDesc::new("mapAtPut", 2, map::map_at_put),
        PrimitiveDesc::new("mapTransient", 0, map::map_transient),
        PrimitiveDesc::new(
            "mapTransientPersist",
            0,
            map::map_transient_persist,
        ),
        PrimitiveDesc::new(
            "mapTransientAtPut",
            2,
            map::map_transient_at_put,
        ),
        PrimitiveDesc::new("eval0", 0, method::eval0),
        PrimitiveDesc::new("eval1", 1, method::eval1),
        PrimitiveDesc::new("eval2", 2, method::eval2),
        PrimitiveDesc::new("eval3", 3, method::eval3),
        PrimitiveDesc::new("printBytecode", 0, method::print_bytecode),
    ]
}

pub(crate) fn arg(args: &[Value], index: usize) -> Result<Value, RuntimeError> {
    args.get(index).copied().ok_or(RuntimeError::ArityMismatch {
        expected: index as u8 + 1,
        got: args.len() as u8,
    })
}

fn type_mismatch(expected: ObjectKind, value: Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected,
        got: value.kind(),
    }
}

pub(crate) fn deref<T: HeapObject>(
    vm: &VM,
    handle: Handle<T>,
) -> Result<&T, RuntimeError> {
    vm.heap
        .get(handle)
        .ok_or(RuntimeError::DeadObject { kind: T::KIND })
}

pub(crate) fn expect_number(
    vm: &VM,
    value: Value,
) -> Result<&Number, RuntimeError> {
    match value {
        Value::Number(h) => deref(vm, h),
        other => Err(type_mismatch(ObjectKind::Number, other)),
    }
}

pub(crate) fn expect_string(vm: &VM, value: Value) -> Result<&Str, RuntimeError> {
    match value {
        Value::String(h) => deref(vm, h),
        other => Err(type_mismatch(ObjectKind::String, other)),
    }
}

pub(crate) fn expect_array(
    vm: &VM,
    value: Value,
) -> Result<&Array, RuntimeError> {
    match value {
        Value::Array(h) => deref(vm, h),
        other => Err(type_mismatch(ObjectKind::Array, other)),
    }
}

pub(crate) fn expect_array_transient(
    vm: &VM,
    value: Value,
) -> Result<Handle<ArrayTransient>, RuntimeError> {
    match value {
        Value::ArrayTransient(h) if vm.heap.contains(value) => Ok(h),
        Value::ArrayTransient(_) => Err(RuntimeError::DeadObject {
            kind: ObjectKind::ArrayTransient,
        }),
        other => Err(type_mismatch(ObjectKind::ArrayTransient, other)),
    }
}

pub(crate) fn expect_map(vm: &VM, value: Value) -> Result<&Map, RuntimeError> {
    match value {
        Value::Map(h) => deref(vm, h),
        other => Err(type_mismatch(ObjectKind::Map, other)),
    }
}

pub(crate) fn expect_map_transient(
    vm: &VM,
    value: Value,
) -> Result<Handle<MapTransient>, RuntimeError> {
    match value {
        Value::MapTransient(h) if vm.heap.contains(value) => Ok(h),
        Value::MapTransient(_) => Err(RuntimeError::DeadObject {
            kind: ObjectKind::MapTransient,
        }),
        other => Err(type_mismatch(ObjectKind::MapTransient, other)),
    }
}

pub(crate) fn expect_method(
    vm: &VM,
    value: Value,
) -> Result<&Method, RuntimeError> {
    match value {
        Value::Method(h) => deref(vm, h),
        other => Err(type_mismatch(ObjectKind::Method, other)),
    }
}

/// A Number argument truncated to an integer.
pub(crate) fn expect_integer(vm: &VM, value: Value) -> Result<i64, RuntimeError> {
    Ok(expect_number(vm, value)?.truncate()?)
}

pub(crate) fn bool_value(vm: &VM, value: bool) -> Value {
    vm.world.boolean(value)
}

pub(crate) fn number_value(
    vm: &mut VM,
    state: &InterpreterState,
    number: Number,
) -> Value {
    Value::Number(vm.allocate(state, number))
}

pub(crate) fn string_value(
    vm: &mut VM,
    state: &InterpreterState,
    text: String,
) -> Value {
    Value::String(vm.allocate(state, Str::new(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn primitive_names_are_unique() {
        let primitives = default_primitives();
        let names: HashSet<_> = primitives.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), primitives.len());
    }

    #[test]
    fn eval_family_arity_matches_its_name() {
        for (i, name) in ["eval0", "eval1", "eval2", "eval3"].iter().enumerate() {
            let desc = default_primitives()
                .into_iter()
                .find(|p| p.name == *name)
                .unwrap();
            assert_eq!(desc.arity as usize, i);
        }
    }
}
