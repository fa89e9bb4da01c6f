use object::Value;

use crate::interpreter::{InterpreterState, RuntimeError};
use crate::primitives::arg;
use crate::VM;

/// Write the textual form of the argument; answers the receiver so
/// cascades can continue.
pub fn print(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let text = vm.display(arg(args, 0)?);
    vm.write_output(&text)?;
    Ok(receiver)
}

pub fn endl(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    vm.write_output("\n")?;
    Ok(receiver)
}
