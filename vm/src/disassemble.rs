//! Human-readable listings of compiled methods.

use std::fmt::Write;

use bytecode::{BytecodeDecoder, Instruction};
use object::CompiledMethod;

use crate::constants::ConstantsTable;

/// One instruction per line, prefixed with its byte offset. Constants,
/// globals and selectors are annotated with their text; closure templates
/// are listed after their parent, indented.
pub fn disassemble(compiled: &CompiledMethod, constants: &ConstantsTable) -> String {
    let mut out = String::new();
    write_method(compiled, constants, 0, &mut out);
    out
}

fn write_method(
    compiled: &CompiledMethod,
    constants: &ConstantsTable,
    indent: usize,
    out: &mut String,
) {
    let pad = " ".repeat(indent);
    let _ = writeln!(
        out,
        "{pad}-- arity={} locals={} upvalues={:?} --",
        compiled.arity(),
        compiled.locals(),
        compiled.upvalues()
    );

    let mut decoder = BytecodeDecoder::new(compiled.bytecode());
    loop {
        let offset = decoder.offset();
        match decoder.decode_next() {
            Ok(Some(instruction)) => {
                let _ = write!(out, "{pad}{offset:04} {instruction}");
                if let Some(text) = annotation(&instruction, constants) {
                    let _ = write!(out, "  ; {text}");
                }
                out.push('\n');
            }
            Ok(None) => break,
            Err(err) => {
                let _ = writeln!(out, "{pad}{offset:04} <{err}>");
                break;
            }
        }
    }

    for (idx, closure) in compiled.closures().iter().enumerate() {
        let _ = writeln!(out, "{pad}@{idx}:");
        write_method(closure, constants, indent + 4, out);
    }
}

fn annotation(
    instruction: &Instruction,
    constants: &ConstantsTable,
) -> Option<String> {
    let idx = match *instruction {
        Instruction::PushConstant { idx } => idx,
        Instruction::PushGlobal { name_idx } => name_idx,
        Instruction::Send { selector_idx, .. } => selector_idx,
        _ => return None,
    };
    let text = constants.text(u32::from(idx))?;
    Some(match instruction {
        Instruction::Send { .. } => format!("#{text}"),
        Instruction::PushConstant { .. } => {
            let value = constants.get(u32::from(idx))?;
            match value {
                object::Value::String(_) => format!("'{text}'"),
                _ => text.to_string(),
            }
        }
        _ => text.to_string(),
    })
}
