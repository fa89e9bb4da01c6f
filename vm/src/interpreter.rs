use std::fmt;
use std::rc::Rc;

use bytecode::{BytecodeDecoder, DecodeError, Instruction};
use object::{
    Array, CompareError, CompiledMethod, Handle, Map, Method, NativeMethod,
    NumberError, ObjectKind, RootProvider, SlotKey, Value,
};

use crate::stack::Stack;
use crate::VM;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    SelectorNotFound { selector: String },
    TypeMismatch { expected: ObjectKind, got: ObjectKind },
    NotComparable { left: ObjectKind, right: ObjectKind },
    Arithmetic(NumberError),
    GlobalNotFound { name: String },
    CannotReceive { kind: ObjectKind },
    NotCallable { selector: String, argc: u8 },
    ArityMismatch { expected: u8, got: u8 },
    IndexOutOfBounds { index: i64, len: usize },
    KeyNotFound { key: String },
    Format { reason: String },
    StackUnderflow,
    StackOverflow { depth: usize },
    InvalidUpvalue { index: u16 },
    InvalidConstant { index: u32 },
    InvalidClosure { index: u16 },
    InvalidJump { offset: i16 },
    InvalidBytecode(DecodeError),
    /// A handle whose slot was already recycled.
    DeadObject { kind: ObjectKind },
    Output(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelectorNotFound { selector } => {
                write!(f, "Selector '{selector}' not found")
            }
            Self::TypeMismatch { expected, got } => {
                write!(f, "expected {expected}, got {got}")
            }
            Self::NotComparable { left, right } => {
                write!(f, "cannot compare {left} with {right}")
            }
            Self::Arithmetic(err) => write!(f, "arithmetic error: {err}"),
            Self::GlobalNotFound { name } => {
                write!(f, "global '{name}' not found")
            }
            Self::CannotReceive { kind } => {
                write!(f, "{kind} cannot receive messages")
            }
            Self::NotCallable { selector, argc } => write!(
                f,
                "slot '{selector}' is not a method and cannot take {} arguments",
                argc.saturating_sub(1)
            ),
            Self::ArityMismatch { expected, got } => {
                write!(f, "expected {expected} arguments, got {got}")
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for size {len}")
            }
            Self::KeyNotFound { key } => write!(f, "key '{key}' not found"),
            Self::Format { reason } => write!(f, "format error: {reason}"),
            Self::StackUnderflow => write!(f, "stack underflow"),
            Self::StackOverflow { depth } => {
                write!(f, "stack overflow at depth {depth}")
            }
            Self::InvalidUpvalue { index } => {
                write!(f, "upvalue {index} was never captured")
            }
            Self::InvalidConstant { index } => {
                write!(f, "constant {index} does not exist")
            }
            Self::InvalidClosure { index } => {
                write!(f, "closure template {index} does not exist")
            }
            Self::InvalidJump { offset } => {
                write!(f, "jump {offset:+} leaves the method")
            }
            Self::InvalidBytecode(err) => write!(f, "invalid bytecode: {err}"),
            Self::DeadObject { kind } => {
                write!(f, "reference to a collected {kind}")
            }
            Self::Output(reason) => write!(f, "output failed: {reason}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<NumberError> for RuntimeError {
    fn from(err: NumberError) -> Self {
        Self::Arithmetic(err)
    }
}

impl From<CompareError> for RuntimeError {
    fn from(err: CompareError) -> Self {
        match err {
            CompareError::NotComparable { left, right } => {
                Self::NotComparable { left, right }
            }
        }
    }
}

/// One method activation: a window into the shared stack.
#[derive(Debug, Clone)]
pub struct Frame {
    pub(crate) method: Handle<Method>,
    pub(crate) compiled: Rc<CompiledMethod>,
    pub(crate) self_value: Value,
    /// First argument slot; locals follow the arguments.
    pub(crate) locals_base: usize,
    /// The receiver slot, overwritten by the result on return.
    pub(crate) return_index: usize,
    pub(crate) pc: usize,
}

#[derive(Debug, Default)]
pub struct InterpreterState {
    pub(crate) frames: Vec<Frame>,
}

impl InterpreterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Everything a collection must keep alive while bytecode runs: every
/// stack slot and every activation's method and self.
pub(crate) struct InterpreterRoots<'a> {
    pub(crate) stack: &'a Stack,
    pub(crate) frames: &'a [Frame],
}

impl RootProvider for InterpreterRoots<'_> {
    fn visit_roots(&self, visitor: &mut dyn FnMut(Value)) {
        for value in self.stack.as_slice() {
            visitor(*value);
        }
        for frame in self.frames {
            visitor(Value::Method(frame.method));
            visitor(frame.self_value);
        }
    }
}

pub fn interpret(
    vm: &mut VM,
    method: Handle<Method>,
) -> Result<Value, RuntimeError> {
    let nil = vm.world.nil;
    interpret_with_receiver(vm, method, nil)
}

/// Push `receiver`, activate `method` over it and run to completion. The
/// result is left on the stack in the receiver's slot.
pub fn interpret_with_receiver(
    vm: &mut VM,
    method: Handle<Method>,
    receiver: Value,
) -> Result<Value, RuntimeError> {
    let mut state = InterpreterState::new();
    vm.stack.push(receiver);
    push_frame(vm, &mut state, method)?;
    run(vm, &mut state)
}

fn run(
    vm: &mut VM,
    state: &mut InterpreterState,
) -> Result<Value, RuntimeError> {
    loop {
        let step = {
            let frame = current(state)?;
            let mut decoder =
                BytecodeDecoder::at(frame.compiled.bytecode(), frame.pc);
            decoder
                .decode_next()
                .map_err(RuntimeError::InvalidBytecode)?
                .map(|instruction| {
                    (instruction, decoder.offset(), decoder.is_at_end())
                })
        };

        let Some((instruction, next_pc, is_last)) = step else {
            if let Some(result) = return_from_frame(vm, state)? {
                return Ok(result);
            }
            continue;
        };

        current_mut(state)?.pc = next_pc;
        execute(vm, state, instruction, is_last)?;
    }
}

fn execute(
    vm: &mut VM,
    state: &mut InterpreterState,
    instruction: Instruction,
    is_last: bool,
) -> Result<(), RuntimeError> {
    let (locals_base, self_value, method) = {
        let frame = current(state)?;
        (frame.locals_base, frame.self_value, frame.method)
    };

    match instruction {
        Instruction::PushConstant { idx } => {
            let value = vm
                .constants
                .get(u32::from(idx))
                .ok_or(RuntimeError::InvalidConstant { index: idx.into() })?;
            vm.stack.push(value);
        }
        Instruction::PushLocal { reg } => {
            let value = vm
                .stack
                .get(locals_base + reg as usize)
                .ok_or(RuntimeError::StackUnderflow)?;
            vm.stack.push(value);
        }
        Instruction::PushGlobal { name_idx } => {
            let idx = u32::from(name_idx);
            let key = vm
                .constants
                .slot_key(idx)
                .ok_or(RuntimeError::InvalidConstant { index: idx })?;
            let value =
                vm.world.global(&vm.heap, key).ok_or_else(|| {
                    RuntimeError::GlobalNotFound {
                        name: vm.constant_text(idx),
                    }
                })?;
            vm.stack.push(value);
        }
        Instruction::PushSelf => vm.stack.push(self_value),
        Instruction::PushUpvalue { idx } => {
            let value = method_ref(vm, method)?
                .upvalue(idx)
                .ok_or(RuntimeError::InvalidUpvalue { index: idx })?;
            vm.stack.push(value);
        }
        Instruction::PopInto { reg } => {
            let value = pop(vm)?;
            if !vm.stack.set(locals_base + reg as usize, value) {
                return Err(RuntimeError::StackUnderflow);
            }
        }
        Instruction::Pop => {
            pop(vm)?;
        }
        Instruction::Dup => {
            let value = vm.stack.top().ok_or(RuntimeError::StackUnderflow)?;
            vm.stack.push(value);
        }
        Instruction::PopIntoArray { count } => {
            create_array(vm, state, count as usize)?;
        }
        Instruction::PopIntoObject { count } => {
            create_object(vm, state, count as usize)?;
        }
        Instruction::PushClosure { closure_idx } => {
            create_closure(vm, state, closure_idx)?;
        }
        Instruction::Send { selector_idx, argc } => {
            send(vm, state, selector_idx, argc, is_last)?;
        }
        Instruction::JumpIfFalse { offset } => {
            if pop(vm)? == vm.world.false_value {
                jump(state, offset)?;
            }
        }
        Instruction::JumpIfTrue { offset } => {
            if pop(vm)? == vm.world.true_value {
                jump(state, offset)?;
            }
        }
        Instruction::Jump { offset } => jump(state, offset)?,
    }
    Ok(())
}

/// Activate `method` over the receiver and arguments already on the stack.
pub(crate) fn push_frame(
    vm: &mut VM,
    state: &mut InterpreterState,
    method: Handle<Method>,
) -> Result<(), RuntimeError> {
    let depth = state.frames.len();
    if depth >= vm.settings.max_depth {
        return Err(RuntimeError::StackOverflow { depth });
    }

    let (compiled, captured_self) = {
        let m = method_ref(vm, method)?;
        (Rc::clone(m.compiled()), m.self_value())
    };
    let arity = compiled.arity() as usize;
    let locals_base = vm
        .stack
        .len()
        .checked_sub(arity)
        .filter(|base| *base > 1)
        .ok_or(RuntimeError::StackUnderflow)?;
    let return_index = locals_base - 1;
    let self_value = match captured_self {
        Some(value) => value,
        None => vm
            .stack
            .get(return_index)
            .ok_or(RuntimeError::StackUnderflow)?,
    };

    let nil = vm.world.nil;
    vm.stack.resize(locals_base + compiled.locals() as usize, nil);
    log::trace!("activate {method:?} at depth {}", depth + 1);

    state.frames.push(Frame {
        method,
        compiled,
        self_value,
        locals_base,
        return_index,
        pc: 0,
    });
    Ok(())
}

/// Tear down the current frame. Answers the result once the outermost
/// frame has returned.
fn return_from_frame(
    vm: &mut VM,
    state: &mut InterpreterState,
) -> Result<Option<Value>, RuntimeError> {
    let frame = state.frames.pop().ok_or(RuntimeError::StackUnderflow)?;
    let result = vm.stack.top().ok_or(RuntimeError::StackUnderflow)?;
    vm.stack.set(frame.return_index, result);
    vm.stack.truncate(frame.locals_base);
    log::trace!("return from depth {}", state.frames.len() + 1);

    if state.frames.is_empty() {
        Ok(Some(result))
    } else {
        Ok(None)
    }
}

fn send(
    vm: &mut VM,
    state: &mut InterpreterState,
    selector: u16,
    argc: u8,
    is_tail: bool,
) -> Result<(), RuntimeError> {
    let receiver_index = vm
        .stack
        .len()
        .checked_sub(argc as usize)
        .filter(|index| *index > 0)
        .ok_or(RuntimeError::StackUnderflow)?;
    let receiver = vm
        .stack
        .get(receiver_index)
        .ok_or(RuntimeError::StackUnderflow)?;
    let idx = u32::from(selector);
    log::trace!(
        "send #{} argc {argc}",
        vm.constants.text(idx).unwrap_or("?")
    );

    let key = vm
        .constants
        .slot_key(idx)
        .ok_or(RuntimeError::InvalidConstant { index: idx })?;
    let target = lookup(vm, receiver, key)?.ok_or_else(|| {
        RuntimeError::SelectorNotFound {
            selector: vm.constant_text(idx),
        }
    })?;

    match target {
        Value::Method(method) => call_method(
            vm,
            state,
            method,
            receiver,
            receiver_index,
            argc,
            is_tail,
        ),
        Value::NativeMethod(native) => {
            call_native(vm, state, native, receiver, receiver_index, argc)
        }
        value if argc == 1 => {
            vm.stack.set(receiver_index, value);
            vm.stack.truncate(receiver_index + 1);
            Ok(())
        }
        _ => Err(RuntimeError::NotCallable {
            selector: vm.constant_text(idx),
            argc,
        }),
    }
}

/// Resolve `key` on `receiver`: a Map's own slots first, then the
/// prototype of the receiver's kind.
pub(crate) fn lookup(
    vm: &VM,
    receiver: Value,
    key: SlotKey,
) -> Result<Option<Value>, RuntimeError> {
    if let Value::NativeMethod(_) = receiver {
        return Err(RuntimeError::CannotReceive {
            kind: receiver.kind(),
        });
    }
    if let Value::Map(map) = receiver {
        if let Some(value) = vm.heap.get(map).and_then(|m| m.get(key)) {
            return Ok(Some(value));
        }
    }
    let prototype = vm.world.prototype(receiver.kind());
    Ok(vm.heap.get(prototype).and_then(|p| p.get(key)))
}

fn call_method(
    vm: &mut VM,
    state: &mut InterpreterState,
    method: Handle<Method>,
    receiver: Value,
    receiver_index: usize,
    argc: u8,
    is_tail: bool,
) -> Result<(), RuntimeError> {
    let compiled = Rc::clone(method_ref(vm, method)?.compiled());
    check_arity(compiled.arity(), argc)?;

    let same_method = Rc::ptr_eq(&current(state)?.compiled, &compiled);
    if is_tail && same_method {
        return reuse_frame(vm, state, method, receiver, receiver_index);
    }
    push_frame(vm, state, method)
}

/// Self-recursive tail call: move the arguments into the current frame's
/// locals and restart it.
fn reuse_frame(
    vm: &mut VM,
    state: &mut InterpreterState,
    method: Handle<Method>,
    receiver: Value,
    receiver_index: usize,
) -> Result<(), RuntimeError> {
    let nil = vm.world.nil;
    let captured_self = method_ref(vm, method)?.self_value();
    let frame = current_mut(state)?;
    let base = frame.locals_base;
    let arity = frame.compiled.arity() as usize;
    let locals = frame.compiled.locals() as usize;

    for i in 0..arity {
        let arg = vm
            .stack
            .get(receiver_index + 1 + i)
            .ok_or(RuntimeError::StackUnderflow)?;
        vm.stack.set(base + i, arg);
    }
    vm.stack.set(frame.return_index, receiver);
    vm.stack.truncate(base + arity);
    vm.stack.resize(base + locals, nil);

    frame.method = method;
    frame.self_value = captured_self.unwrap_or(receiver);
    frame.pc = 0;
    Ok(())
}

fn call_native(
    vm: &mut VM,
    state: &mut InterpreterState,
    native: Handle<NativeMethod>,
    receiver: Value,
    receiver_index: usize,
    argc: u8,
) -> Result<(), RuntimeError> {
    let id = vm
        .heap
        .get(native)
        .map(|n| n.id)
        .ok_or(RuntimeError::DeadObject {
            kind: ObjectKind::NativeMethod,
        })?;
    let desc = vm.native(id).ok_or(RuntimeError::DeadObject {
        kind: ObjectKind::NativeMethod,
    })?;
    check_arity(desc.arity, argc)?;

    let args = vm
        .stack
        .as_slice()
        .get(receiver_index + 1..)
        .ok_or(RuntimeError::StackUnderflow)?
        .to_vec();
    let depth = state.frames.len();
    let result = (desc.func)(vm, state, receiver, &args)?;

    // A primitive that activated a method leaves its window in place; the
    // new frame writes the result when it returns.
    if state.frames.len() == depth {
        vm.stack.set(receiver_index, result);
        vm.stack.truncate(receiver_index + 1);
    }
    Ok(())
}

/// Activate a Method over the argument window above it (the `value`
/// family).
pub(crate) fn call_block(
    vm: &mut VM,
    state: &mut InterpreterState,
    block: Value,
    argc: usize,
) -> Result<Value, RuntimeError> {
    let method = block.as_method().ok_or(RuntimeError::TypeMismatch {
        expected: ObjectKind::Method,
        got: block.kind(),
    })?;
    let arity = method_ref(vm, method)?.compiled().arity();
    if arity as usize != argc {
        return Err(RuntimeError::ArityMismatch {
            expected: arity,
            got: argc as u8,
        });
    }
    push_frame(vm, state, method)?;
    Ok(block)
}

fn create_array(
    vm: &mut VM,
    state: &mut InterpreterState,
    count: usize,
) -> Result<(), RuntimeError> {
    let elements = vm
        .stack
        .window(count)
        .ok_or(RuntimeError::StackUnderflow)?
        .to_vec();
    let array = vm.allocate(state, Array::new(elements));
    vm.stack.truncate(vm.stack.len() - count);
    vm.stack.push(Value::Array(array));
    Ok(())
}

/// Pop alternating key/value pairs into a fresh Map. Keys are Strings and
/// are interned as slot keys.
fn create_object(
    vm: &mut VM,
    state: &mut InterpreterState,
    count: usize,
) -> Result<(), RuntimeError> {
    let window = vm
        .stack
        .window(count)
        .ok_or(RuntimeError::StackUnderflow)?
        .to_vec();

    let mut slots = Vec::with_capacity(count / 2);
    for pair in window.chunks_exact(2) {
        let text = match pair[0] {
            Value::String(s) => vm
                .heap
                .get(s)
                .map(|s| s.as_str().to_string())
                .ok_or(RuntimeError::DeadObject {
                    kind: ObjectKind::String,
                })?,
            other => {
                return Err(RuntimeError::TypeMismatch {
                    expected: ObjectKind::String,
                    got: other.kind(),
                });
            }
        };
        let key = vm.constants.intern_key(&text);
        slots.push((key, pair[1]));
    }

    let map = vm.allocate(state, Map::from_slots(slots));
    vm.stack.truncate(vm.stack.len() - count);
    vm.stack.push(Value::Map(map));
    Ok(())
}

/// Instantiate a closure template: captured self, a copy of the enclosing
/// upvalues, then the enclosing locals it names, read now.
fn create_closure(
    vm: &mut VM,
    state: &mut InterpreterState,
    index: u16,
) -> Result<(), RuntimeError> {
    let (template, self_value, locals_base, method) = {
        let frame = current(state)?;
        let template = frame
            .compiled
            .closure(index)
            .cloned()
            .ok_or(RuntimeError::InvalidClosure { index })?;
        (template, frame.self_value, frame.locals_base, frame.method)
    };

    let inherited = method_ref(vm, method)?.upvalues().to_vec();
    let mut closure =
        Method::closure(Rc::clone(&template), self_value, &inherited);
    for &(upvalue, local) in template.upvalues() {
        let value = vm
            .stack
            .get(locals_base + local as usize)
            .ok_or(RuntimeError::StackUnderflow)?;
        closure.set_upvalue(upvalue, value);
    }

    let handle = vm.allocate(state, closure);
    vm.stack.push(Value::Method(handle));
    Ok(())
}

fn jump(state: &mut InterpreterState, offset: i16) -> Result<(), RuntimeError> {
    let frame = current_mut(state)?;
    let target = frame
        .pc
        .checked_add_signed(offset as isize)
        .filter(|target| *target <= frame.compiled.bytecode().len())
        .ok_or(RuntimeError::InvalidJump { offset })?;
    frame.pc = target;
    Ok(())
}

fn check_arity(arity: u8, argc: u8) -> Result<(), RuntimeError> {
    if arity as usize + 1 != argc as usize {
        return Err(RuntimeError::ArityMismatch {
            expected: arity,
            got: argc.saturating_sub(1),
        });
    }
    Ok(())
}

fn pop(vm: &mut VM) -> Result<Value, RuntimeError> {
    vm.stack.pop().ok_or(RuntimeError::StackUnderflow)
}

fn current(state: &InterpreterState) -> Result<&Frame, RuntimeError> {
    state.frames.last().ok_or(RuntimeError::StackUnderflow)
}

fn current_mut(
    state: &mut InterpreterState,
) -> Result<&mut Frame, RuntimeError> {
    state.frames.last_mut().ok_or(RuntimeError::StackUnderflow)
}

pub(crate) fn method_ref(
    vm: &VM,
    method: Handle<Method>,
) -> Result<&Method, RuntimeError> {
    vm.heap.get(method).ok_or(RuntimeError::DeadObject {
        kind: ObjectKind::Method,
    })
}
