use object::{Number, NumberError, Value};

use crate::interpreter::{InterpreterState, RuntimeError};
use crate::primitives::{arg, expect_number, number_value};
use crate::VM;

/// Digits of the fraction answered by `random`.
const RANDOM_SCALE: i64 = 10_000_000_000_000_000;

fn binary_op(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
    op: fn(&Number, &Number) -> Result<Number, NumberError>,
) -> Result<Value, RuntimeError> {
    let rhs = arg(args, 0)?;
    let result = op(expect_number(vm, receiver)?, expect_number(vm, rhs)?)?;
    Ok(number_value(vm, state, result))
}

pub fn plus(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    binary_op(vm, state, receiver, args, |a, b| Ok(a.add(b)))
}

pub fn minus(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    binary_op(vm, state, receiver, args, |a, b| Ok(a.sub(b)))
}

pub fn multiply(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    binary_op(vm, state, receiver, args, |a, b| Ok(a.mul(b)))
}

pub fn divide(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    binary_op(vm, state, receiver, args, Number::div)
}

pub fn sqrt(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    let root = expect_number(vm, receiver)?.sqrt()?;
    Ok(number_value(vm, state, root))
}

/// A Number in `[0, 1)`.
pub fn random(
    vm: &mut VM,
    state: &mut InterpreterState,
    _receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    let bits = (vm.next_random() >> 11) as i64 % RANDOM_SCALE;
    let fraction =
        Number::from_i64(bits).div(&Number::from_i64(RANDOM_SCALE))?;
    Ok(number_value(vm, state, fraction))
}
