/// Bytecode opcodes.
///
/// Local and upvalue operands are 8-bit by default. The [`Wide`](Op::Wide)
/// prefix promotes them to 16-bit. Constant, global, closure and count
/// operands are always 16-bit. Jump offsets are signed 16-bit and relative
/// to the end of the jump instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    /// Prefix: the next instruction uses 16-bit local/upvalue operands.
    Wide = 0x00,

    /// Push an entry of the constants table.
    /// Operands: `idx:u16`
    PushConstant,

    /// Push a local slot of the current frame.
    /// Operands: `reg:u8` (wide: `u16`)
    PushLocal,

    /// Push a global looked up by interned name.
    /// Operands: `name_idx:u16`
    PushGlobal,

    /// Push the frame's self.
    PushSelf,

    /// Instantiate a closure template of the current method.
    /// Operands: `closure_idx:u16`
    PushClosure,

    /// Push a captured upvalue of the current method.
    /// Operands: `idx:u8` (wide: `u16`)
    PushUpvalue,

    /// Pop the top of stack into a local slot.
    /// Operands: `reg:u8` (wide: `u16`)
    PopInto,

    /// Discard the top of stack.
    Pop,

    /// Pop `count` values into a new array (first pushed is first element).
    /// Operands: `count:u16`
    PopIntoArray,

    /// Pop `count` values (alternating key, value) into a new map.
    /// Operands: `count:u16`
    PopIntoObject,

    /// Duplicate the top of stack.
    Dup,

    /// Send a message. The receiver sits `argc - 1` slots below the top.
    /// Operands: `selector_idx:u16`, `argc:u8` (receiver included)
    Send,

    /// Pop; jump when the value is the canonical `false`.
    /// Operands: `offset:i16`
    JumpIfFalse,

    /// Pop; jump when the value is the canonical `true`.
    /// Operands: `offset:i16`
    JumpIfTrue,

    /// Unconditional relative jump.
    /// Operands: `offset:i16`
    Jump,
}

impl Op {
    pub const COUNT: usize = Op::Jump as usize + 1;

    /// Whether this opcode has operands affected by the `Wide` prefix.
    pub const fn has_scalable_operands(self) -> bool {
        matches!(self, Op::PushLocal | Op::PushUpvalue | Op::PopInto)
    }
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        if byte < Self::COUNT as u8 {
            // SAFETY: Op is repr(u8) with contiguous variants starting at 0.
            Ok(unsafe { core::mem::transmute::<u8, Op>(byte) })
        } else {
            Err(byte)
        }
    }
}
