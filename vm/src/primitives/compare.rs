use std::cmp::Ordering;

use object::Value;

use crate::interpreter::{InterpreterState, RuntimeError};
use crate::primitives::{arg, bool_value};
use crate::VM;

pub fn is_identical_to(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let other = arg(args, 0)?;
    Ok(bool_value(vm, receiver == other))
}

pub fn equals(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let other = arg(args, 0)?;
    let equal = vm.heap.equals(receiver, other);
    Ok(bool_value(vm, equal))
}

fn compare_with(
    vm: &VM,
    receiver: Value,
    args: &[Value],
    accept: fn(Ordering) -> bool,
) -> Result<Value, RuntimeError> {
    let other = arg(args, 0)?;
    let ordering = vm.heap.compare(receiver, other)?;
    Ok(bool_value(vm, accept(ordering)))
}

pub fn greater(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    compare_with(vm, receiver, args, Ordering::is_gt)
}

pub fn greater_or_equal(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    compare_with(vm, receiver, args, Ordering::is_ge)
}

pub fn less(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    compare_with(vm, receiver, args, Ordering::is_lt)
}

pub fn less_or_equal(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    compare_with(vm, receiver, args, Ordering::is_le)
}
