use std::fmt;

use crate::op::Op;

/// A forward jump whose offset has not yet been resolved.
///
/// Created by [`BytecodeBuilder::jump`], [`BytecodeBuilder::jump_if_true`],
/// and [`BytecodeBuilder::jump_if_false`]. Resolve it with
/// [`BytecodeBuilder::bind`].
#[derive(Debug)]
#[must_use = "an unbound label leaves a zero jump offset behind"]
pub struct Label {
    /// Position of the i16 offset bytes in the buffer.
    offset_pos: usize,
    /// Position right after the jump instruction (base for relative offset).
    base: usize,
}

/// A forward jump spans more bytes than an `i16` offset can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpOutOfRange {
    pub distance: usize,
}

impl fmt::Display for JumpOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jump distance {} does not fit in 16 bits", self.distance)
    }
}

impl std::error::Error for JumpOutOfRange {}

/// Builds a bytecode byte sequence.
///
/// The builder automatically emits the [`Op::Wide`] prefix when a local or
/// upvalue operand exceeds `u8::MAX`.
#[derive(Debug, Clone, Default)]
pub struct BytecodeBuilder {
    buf: Vec<u8>,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Current byte offset in the bytecode stream.
    pub fn current_offset(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    // ── emit helpers ───────────────────────────────────────────────

    fn emit_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn emit_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn emit_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn emit_op(&mut self, op: Op) {
        self.buf.push(op as u8);
    }

    fn needs_wide(operand: u16) -> bool {
        operand > u8::MAX as u16
    }

    fn emit_scalable(&mut self, op: Op, operand: u16) {
        let wide = Self::needs_wide(operand);
        if wide {
            self.emit_op(Op::Wide);
        }
        self.emit_op(op);
        if wide {
            self.emit_u16(operand);
        } else {
            self.emit_u8(operand as u8);
        }
    }

    /// `PushConstant <idx:u16>`
    pub fn push_constant(&mut self, idx: u16) {
        self.emit_op(Op::PushConstant);
        self.emit_u16(idx);
    }

    /// `PushLocal <reg>`
    pub fn push_local(&mut self, reg: u16) {
        self.emit_scalable(Op::PushLocal, reg);
    }

    /// `PushGlobal <name_idx:u16>`
    pub fn push_global(&mut self, name_idx: u16) {
        self.emit_op(Op::PushGlobal);
        self.emit_u16(name_idx);
    }

    pub fn push_self(&mut self) {
        self.emit_op(Op::PushSelf);
    }

    /// `PushClosure <closure_idx:u16>`
    pub fn push_closure(&mut self, closure_idx: u16) {
        self.emit_op(Op::PushClosure);
        self.emit_u16(closure_idx);
    }

    /// `PushUpvalue <idx>`
    pub fn push_upvalue(&mut self, idx: u16) {
        self.emit_scalable(Op::PushUpvalue, idx);
    }

    /// `PopInto <reg>`
    pub fn pop_into(&mut self, reg: u16) {
        self.emit_scalable(Op::PopInto, reg);
    }

    pub fn pop(&mut self) {
        self.emit_op(Op::Pop);
    }

    /// `PopIntoArray <count:u16>`
    pub fn pop_into_array(&mut self, count: u16) {
        self.emit_op(Op::PopIntoArray);
        self.emit_u16(count);
    }

    /// `PopIntoObject <count:u16>`; `count` counts keys and values.
    pub fn pop_into_object(&mut self, count: u16) {
        self.emit_op(Op::PopIntoObject);
        self.emit_u16(count);
    }

    pub fn dup(&mut self) {
        self.emit_op(Op::Dup);
    }

    /// `Send <selector_idx:u16> <argc:u8>`; `argc` includes the receiver.
    pub fn send(&mut self, selector_idx: u16, argc: u8) {
        self.emit_op(Op::Send);
        self.emit_u16(selector_idx);
        self.emit_u8(argc);
    }

    /// Emit an unconditional forward jump. Returns a [`Label`] that must be
    /// resolved later with [`bind`](Self::bind).
    pub fn jump(&mut self) -> Label {
        self.emit_jump_placeholder(Op::Jump)
    }

    /// Emit a conditional forward jump taken on `true`.
    pub fn jump_if_true(&mut self) -> Label {
        self.emit_jump_placeholder(Op::JumpIfTrue)
    }

    /// Emit a conditional forward jump taken on `false`.
    pub fn jump_if_false(&mut self) -> Label {
        self.emit_jump_placeholder(Op::JumpIfFalse)
    }

    /// Bind a forward jump label to the current position.
    pub fn bind(&mut self, label: Label) -> Result<(), JumpOutOfRange> {
        let distance = self.buf.len() - label.base;
        let offset = i16::try_from(distance).map_err(|_| JumpOutOfRange { distance })?;
        self.buf[label.offset_pos..label.offset_pos + 2]
            .copy_from_slice(&offset.to_le_bytes());
        Ok(())
    }

    fn emit_jump_placeholder(&mut self, op: Op) -> Label {
        self.emit_op(op);
        let offset_pos = self.buf.len();
        self.emit_i16(0); // placeholder
        let base = self.buf.len();
        Label { offset_pos, base }
    }
}
