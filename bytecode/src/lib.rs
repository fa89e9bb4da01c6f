mod builder;
mod decoder;
mod instruction;
mod op;

pub use builder::{BytecodeBuilder, JumpOutOfRange, Label};
pub use decoder::{BytecodeDecoder, DecodeError};
pub use instruction::Instruction;
pub use op::Op;

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<Instruction> {
        BytecodeDecoder::new(bytes).collect()
    }

    #[test]
    fn decodes_a_message_send() {
        let mut b = BytecodeBuilder::new();
        b.push_constant(0);
        b.push_constant(1);
        b.send(2, 2);
        b.pop();

        assert_eq!(decode_all(b.as_bytes()), vec![
            Instruction::PushConstant { idx: 0 },
            Instruction::PushConstant { idx: 1 },
            Instruction::Send { selector_idx: 2, argc: 2 },
            Instruction::Pop,
        ]);
    }

    #[test]
    fn wide_prefix_only_when_needed() {
        let mut b = BytecodeBuilder::new();
        b.push_local(255);
        assert_eq!(b.current_offset(), 2);

        b.push_local(256);
        b.pop_into(1000);
        b.push_upvalue(300);
        let bytes = b.into_bytes();
        assert_eq!(bytes[2], Op::Wide as u8);

        assert_eq!(decode_all(&bytes), vec![
            Instruction::PushLocal { reg: 255 },
            Instruction::PushLocal { reg: 256 },
            Instruction::PopInto { reg: 1000 },
            Instruction::PushUpvalue { idx: 300 },
        ]);
    }

    #[test]
    fn forward_jump_is_relative_to_instruction_end() {
        let mut b = BytecodeBuilder::new();
        b.push_global(0);
        let label = b.jump_if_false();
        b.push_constant(1);
        b.push_self();
        b.bind(label).unwrap();
        b.dup();

        assert_eq!(decode_all(b.as_bytes()), vec![
            Instruction::PushGlobal { name_idx: 0 },
            Instruction::JumpIfFalse { offset: 4 },
            Instruction::PushConstant { idx: 1 },
            Instruction::PushSelf,
            Instruction::Dup,
        ]);
    }

    #[test]
    fn bind_rejects_distance_past_i16() {
        let mut b = BytecodeBuilder::new();
        let label = b.jump();
        for _ in 0..(i16::MAX as usize / 3 + 1) {
            b.push_constant(0);
        }
        assert!(b.bind(label).is_err());
    }

    #[test]
    fn decoder_resumes_at_offset() {
        let mut b = BytecodeBuilder::new();
        b.push_self();
        b.push_closure(3);
        b.pop_into_object(4);
        let bytes = b.into_bytes();

        let mut decoder = BytecodeDecoder::at(&bytes, 1);
        assert_eq!(
            decoder.decode_next(),
            Ok(Some(Instruction::PushClosure { closure_idx: 3 }))
        );
        assert_eq!(decoder.offset(), 4);
        assert_eq!(
            decoder.decode_next(),
            Ok(Some(Instruction::PopIntoObject { count: 4 }))
        );
        assert_eq!(decoder.decode_next(), Ok(None));
    }

    #[test]
    fn malformed_bytecode_is_reported() {
        assert_eq!(
            BytecodeDecoder::new(&[0xff]).decode_next(),
            Err(DecodeError::UnknownOpcode { offset: 0, byte: 0xff })
        );
        assert_eq!(
            BytecodeDecoder::new(&[Op::PushConstant as u8, 1]).decode_next(),
            Err(DecodeError::Truncated { offset: 1 })
        );
        assert_eq!(
            BytecodeDecoder::new(&[Op::Wide as u8, Op::Pop as u8]).decode_next(),
            Err(DecodeError::MisplacedWide { offset: 0 })
        );
    }

    #[test]
    fn instructions_display_operands() {
        assert_eq!(
            Instruction::Send { selector_idx: 7, argc: 2 }.to_string(),
            "Send #7 2"
        );
        assert_eq!(Instruction::Jump { offset: 12 }.to_string(), "Jump +12");
        assert_eq!(Instruction::PopInto { reg: 3 }.to_string(), "PopInto r3");
    }
}
