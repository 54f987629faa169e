use super::opcodes::{Mode, OPCODES};
use crate::disasm::{Eval, Statement};
use crate::text::{x16, x8};

/// Decodes one 6502 instruction.
pub fn list(eval: &mut Eval<'_>) -> Statement {
    let opcode = eval.fetch();
    let Some(op) = OPCODES[usize::from(opcode)] else {
        return eval.finish(format!("?{opcode:02x}"), "");
    };
    let operands = match op.mode {
        Mode::Implied => String::new(),
        Mode::Accumulator => "a".to_owned(),
        Mode::Immediate => format!("#{}", x8(eval.fetch())),
        Mode::ZeroPage => x8(eval.fetch()),
        Mode::ZeroPageX => format!("{},x", x8(eval.fetch())),
        Mode::ZeroPageY => format!("{},y", x8(eval.fetch())),
        Mode::Absolute => x16(eval.fetch16()),
        Mode::AbsoluteX => format!("{},x", x16(eval.fetch16())),
        Mode::AbsoluteY => format!("{},y", x16(eval.fetch16())),
        Mode::Indirect => format!("({})", x16(eval.fetch16())),
        Mode::IndirectX => format!("({},x)", x8(eval.fetch())),
        Mode::IndirectY => format!("({}),y", x8(eval.fetch())),
        Mode::Relative => {
            let disp = i16::from(i8::from_le_bytes([eval.fetch()]));
            let next = u16::try_from(eval.pc() & 0xffff).unwrap_or(0);
            x16(next.wrapping_add_signed(disp))
        }
    };
    eval.finish(op.mnemonic.as_str(), operands)
}
