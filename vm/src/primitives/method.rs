use object::Value;

use crate::disassemble::disassemble;
use crate::interpreter::{call_block, InterpreterState, RuntimeError};
use crate::primitives::expect_method;
use crate::VM;

pub fn eval0(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    call_block(vm, state, receiver, 0)
}

pub fn eval1(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    call_block(vm, state, receiver, 1)
}

pub fn eval2(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    call_block(vm, state, receiver, 2)
}

pub fn eval3(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    call_block(vm, state, receiver, 3)
}

pub fn print_bytecode(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    let listing = {
        let method = expect_method(vm, receiver)?;
        disassemble(method.compiled(), &vm.constants)
    };
    vm.write_output(&listing)?;
    Ok(receiver)
}
