use object::{Array, Number, ObjectKind, Value};

use crate::interpreter::{InterpreterState, RuntimeError};
use crate::primitives::{
    arg, deref, expect_array, expect_array_transient, expect_integer,
    expect_string, number_value, string_value,
};
use crate::VM;

fn new_array(vm: &mut VM, state: &InterpreterState, array: Array) -> Value {
    Value::Array(vm.allocate(state, array))
}

/// Element counts below zero mean zero.
fn expect_count(vm: &VM, value: Value) -> Result<usize, RuntimeError> {
    Ok(usize::try_from(expect_integer(vm, value)?).unwrap_or(0))
}

/// `at:` with a 1-based index.
pub fn array_at(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let index = expect_integer(vm, arg(args, 0)?)?;
    let array = expect_array(vm, receiver)?;
    array.at(index).ok_or(RuntimeError::IndexOutOfBounds {
        index,
        len: array.len(),
    })
}

pub fn array_push(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let value = arg(args, 0)?;
    let pushed = expect_array(vm, receiver)?.pushed(value);
    Ok(new_array(vm, state, pushed))
}

pub fn array_take(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let count = expect_count(vm, arg(args, 0)?)?;
    let taken = expect_array(vm, receiver)?.take(count);
    Ok(new_array(vm, state, taken))
}

pub fn array_drop(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let count = expect_count(vm, arg(args, 0)?)?;
    let rest = expect_array(vm, receiver)?.drop(count);
    Ok(new_array(vm, state, rest))
}

pub fn array_size(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    let len = expect_array(vm, receiver)?.len();
    Ok(number_value(vm, state, Number::from_i64(len as i64)))
}

/// `#(a b) formatString: '{1} and {0}'`: placeholders are 0-based element
/// indices.
pub fn array_format_string(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let template = expect_string(vm, arg(args, 0)?)?.as_str().to_string();
    let elements = expect_array(vm, receiver)?.elements().to_vec();
    let text = format_elements(vm, &template, &elements)?;
    Ok(string_value(vm, state, text))
}

fn format_elements(
    vm: &VM,
    template: &str,
    elements: &[Value],
) -> Result<String, RuntimeError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| RuntimeError::Format {
            reason: "unterminated placeholder".to_string(),
        })?;
        let placeholder = &after[..close];
        let index: usize =
            placeholder.trim().parse().map_err(|_| RuntimeError::Format {
                reason: format!("'{placeholder}' is not an index"),
            })?;
        let element =
            elements.get(index).ok_or_else(|| RuntimeError::Format {
                reason: format!(
                    "index {index} out of range for {} elements",
                    elements.len()
                ),
            })?;
        out.push_str(&vm.display(*element));
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

pub fn array_transient(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    let transient = expect_array(vm, receiver)?.transient();
    Ok(Value::ArrayTransient(vm.allocate(state, transient)))
}

pub fn array_transient_persist(
    vm: &mut VM,
    state: &mut InterpreterState,
    receiver: Value,
    _args: &[Value],
) -> Result<Value, RuntimeError> {
    let handle = expect_array_transient(vm, receiver)?;
    let array = deref(vm, handle)?.persist();
    Ok(new_array(vm, state, array))
}

/// Append in place; answers the transient.
pub fn array_transient_push(
    vm: &mut VM,
    _state: &mut InterpreterState,
    receiver: Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let value = arg(args, 0)?;
    let handle = expect_array_transient(vm, receiver)?;
    if !vm.heap.array_transient_push(handle, value) {
        return Err(RuntimeError::DeadObject {
            kind: ObjectKind::ArrayTransient,
        });
    }
    Ok(receiver)
}
