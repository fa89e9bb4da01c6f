use object::Value;

use crate::interpreter::{InterpreterState, RuntimeError};
use crate::primitives::{arg, expect_string, string_value};
use crate::VM;

pub fn string_concat(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let other = arg(args, 0)?;
    let joined = expect_string(vm, receiver)?.concat(expect_string(vm, other)?);
    Ok(string_value(vm, state, joined.as_str().to_string()))
}
