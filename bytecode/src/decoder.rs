use std::fmt;

use crate::instruction::Instruction;
use crate::op::Op;

/// Bytecode that does not form a complete instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    UnknownOpcode { offset: usize, byte: u8 },
    Truncated { offset: usize },
    MisplacedWide { offset: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode { offset, byte } => {
                write!(f, "unknown opcode {byte:#04x} at {offset}")
            }
            Self::Truncated { offset } => {
                write!(f, "instruction at {offset} runs past the end")
            }
            Self::MisplacedWide { offset } => {
                write!(f, "wide prefix at {offset} precedes a fixed-width op")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decodes a bytecode byte slice into [`Instruction`]s.
///
/// Every read is bounds-checked; malformed input yields a [`DecodeError`]
/// instead of a panic.
pub struct BytecodeDecoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BytecodeDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Start decoding at byte offset `pos`.
    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    /// Current byte offset in the stream.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Decode the next instruction, or `Ok(None)` at end-of-stream.
    pub fn decode_next(&mut self) -> Result<Option<Instruction>, DecodeError> {
        if self.is_at_end() {
            return Ok(None);
        }
        let start = self.pos;
        let op = self.read_op()?;
        let instruction = if op == Op::Wide {
            let next = self.read_op()?;
            if !next.has_scalable_operands() {
                return Err(DecodeError::MisplacedWide { offset: start });
            }
            self.decode_op(next, true, start)?
        } else {
            self.decode_op(op, false, start)?
        };
        Ok(Some(instruction))
    }

    fn decode_op(
        &mut self,
        op: Op,
        wide: bool,
        start: usize,
    ) -> Result<Instruction, DecodeError> {
        let instruction = match op {
            Op::Wide => return Err(DecodeError::MisplacedWide { offset: start }),
            Op::PushConstant => Instruction::PushConstant {
                idx: self.read_u16()?,
            },
            Op::PushLocal => Instruction::PushLocal {
                reg: self.read_scalable(wide)?,
            },
            Op::PushGlobal => Instruction::PushGlobal {
                name_idx: self.read_u16()?,
            },
            Op::PushSelf => Instruction::PushSelf,
            Op::PushClosure => Instruction::PushClosure {
                closure_idx: self.read_u16()?,
            },
            Op::PushUpvalue => Instruction::PushUpvalue {
                idx: self.read_scalable(wide)?,
            },
            Op::PopInto => Instruction::PopInto {
                reg: self.read_scalable(wide)?,
            },
            Op::Pop => Instruction::Pop,
            Op::PopIntoArray => Instruction::PopIntoArray {
                count: self.read_u16()?,
            },
            Op::PopIntoObject => Instruction::PopIntoObject {
                count: self.read_u16()?,
            },
            Op::Dup => Instruction::Dup,
            Op::Send => {
                let selector_idx = self.read_u16()?;
                let argc = self.read_u8()?;
                Instruction::Send { selector_idx, argc }
            }
            Op::JumpIfFalse => Instruction::JumpIfFalse {
                offset: self.read_i16()?,
            },
            Op::JumpIfTrue => Instruction::JumpIfTrue {
                offset: self.read_i16()?,
            },
            Op::Jump => Instruction::Jump {
                offset: self.read_i16()?,
            },
        };
        Ok(instruction)
    }

    // ── raw reads ──────────────────────────────────────────────────

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated { offset: self.pos })?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }

    fn read_op(&mut self) -> Result<Op, DecodeError> {
        let offset = self.pos;
        let [byte] = self.take::<1>()?;
        Op::try_from(byte).map_err(|byte| DecodeError::UnknownOpcode { offset, byte })
    }

    #[inline(always)]
    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    #[inline(always)]
    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    #[inline(always)]
    fn read_i16(&mut self) -> Result<i16, DecodeError> {
        self.take::<2>().map(i16::from_le_bytes)
    }

    #[inline(always)]
    fn read_scalable(&mut self, wide: bool) -> Result<u16, DecodeError> {
        if wide {
            self.read_u16()
        } else {
            self.read_u8().map(u16::from)
        }
    }
}

impl Iterator for BytecodeDecoder<'_> {
    type Item = Instruction;

    /// Yields instructions until the end of the stream or the first
    /// malformed one.
    fn next(&mut self) -> Option<Instruction> {
        self.decode_next().ok().flatten()
    }
}
