use core::fmt;

/// A decoded instruction with all operands resolved to their widest types.
///
/// Local and upvalue operands are always `u16` regardless of whether the
/// instruction was encoded in narrow or wide form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    PushConstant { idx: u16 },
    PushLocal { reg: u16 },
    PushGlobal { name_idx: u16 },
    PushSelf,
    PushClosure { closure_idx: u16 },
    PushUpvalue { idx: u16 },
    PopInto { reg: u16 },
    Pop,
    PopIntoArray { count: u16 },
    PopIntoObject { count: u16 },
    Dup,
    Send { selector_idx: u16, argc: u8 },
    JumpIfFalse { offset: i16 },
    JumpIfTrue { offset: i16 },
    Jump { offset: i16 },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PushConstant { idx } => write!(f, "PushConstant #{idx}"),
            Self::PushLocal { reg } => write!(f, "PushLocal r{reg}"),
            Self::PushGlobal { name_idx } => write!(f, "PushGlobal #{name_idx}"),
            Self::PushSelf => write!(f, "PushSelf"),
            Self::PushClosure { closure_idx } => {
                write!(f, "PushClosure @{closure_idx}")
            }
            Self::PushUpvalue { idx } => write!(f, "PushUpvalue u{idx}"),
            Self::PopInto { reg } => write!(f, "PopInto r{reg}"),
            Self::Pop => write!(f, "Pop"),
            Self::PopIntoArray { count } => write!(f, "PopIntoArray {count}"),
            Self::PopIntoObject { count } => write!(f, "PopIntoObject {count}"),
            Self::Dup => write!(f, "Dup"),
            Self::Send { selector_idx, argc } => {
                write!(f, "Send #{selector_idx} {argc}")
            }
            Self::JumpIfFalse { offset } => write!(f, "JumpIfFalse {offset:+}"),
            Self::JumpIfTrue { offset } => write!(f, "JumpIfTrue {offset:+}"),
            Self::Jump { offset } => write!(f, "Jump {offset:+}"),
        }
    }
}
