//! Static opcode table for the documented 6502 instruction set.

use std::fmt;

/// Instruction mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
}

impl Mnemonic {
    /// Lower-case assembler spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Adc => "adc", Self::And => "and", Self::Asl => "asl",
            Self::Bcc => "bcc", Self::Bcs => "bcs", Self::Beq => "beq",
            Self::Bit => "bit", Self::Bmi => "bmi", Self::Bne => "bne",
            Self::Bpl => "bpl", Self::Brk => "brk", Self::Bvc => "bvc",
            Self::Bvs => "bvs", Self::Clc => "clc", Self::Cld => "cld",
            Self::Cli => "cli", Self::Clv => "clv", Self::Cmp => "cmp",
            Self::Cpx => "cpx", Self::Cpy => "cpy", Self::Dec => "dec",
            Self::Dex => "dex", Self::Dey => "dey", Self::Eor => "eor",
            Self::Inc => "inc", Self::Inx => "inx", Self::Iny => "iny",
            Self::Jmp => "jmp", Self::Jsr => "jsr", Self::Lda => "lda",
            Self::Ldx => "ldx", Self::Ldy => "ldy", Self::Lsr => "lsr",
            Self::Nop => "nop", Self::Ora => "ora", Self::Pha => "pha",
            Self::Php => "php", Self::Pla => "pla", Self::Plp => "plp",
            Self::Rol => "rol", Self::Ror => "ror", Self::Rti => "rti",
            Self::Rts => "rts", Self::Sbc => "sbc", Self::Sec => "sec",
            Self::Sed => "sed", Self::Sei => "sei", Self::Sta => "sta",
            Self::Stx => "stx", Self::Sty => "sty", Self::Tax => "tax",
            Self::Tay => "tay", Self::Tsx => "tsx", Self::Txa => "txa",
            Self::Txs => "txs", Self::Tya => "tya",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operand addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// No operand.
    Implied,
    /// Operates on the accumulator.
    Accumulator,
    /// `#$nn`
    Immediate,
    /// `$nn`
    ZeroPage,
    /// `$nn,x`
    ZeroPageX,
    /// `$nn,y`
    ZeroPageY,
    /// `$nnnn`
    Absolute,
    /// `$nnnn,x`
    AbsoluteX,
    /// `$nnnn,y`
    AbsoluteY,
    /// `($nnnn)`
    Indirect,
    /// `($nn,x)`
    IndirectX,
    /// `($nn),y`
    IndirectY,
    /// Signed branch displacement.
    Relative,
}

impl Mode {
    /// Number of operand bytes following the opcode.
    #[must_use]
    pub const fn operand_len(self) -> usize {
        match self {
            Self::Implied | Self::Accumulator => 0,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 2,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::IndirectX
            | Self::IndirectY
            | Self::Relative => 1,
        }
    }
}

/// Decoded table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode {
    /// Operation.
    pub mnemonic: Mnemonic,
    /// Operand addressing.
    pub mode: Mode,
}

const fn op(mnemonic: Mnemonic, mode: Mode) -> Option<Opcode> {
    Some(Opcode { mnemonic, mode })
}

/// Decodes a documented opcode byte.
#[must_use]
#[allow(clippy::too_many_lines, clippy::enum_glob_use)]
pub const fn decode(opcode: u8) -> Option<Opcode> {
    use Mnemonic::*;
    use Mode::*;
    match opcode {
        0x00 => op(Brk, Implied),
        0x01 => op(Ora, IndirectX),
        0x05 => op(Ora, ZeroPage),
        0x06 => op(Asl, ZeroPage),
        0x08 => op(Php, Implied),
        0x09 => op(Ora, Immediate),
        0x0a => op(Asl, Accumulator),
        0x0d => op(Ora, Absolute),
        0x0e => op(Asl, Absolute),
        0x10 => op(Bpl, Relative),
        0x11 => op(Ora, IndirectY),
        0x15 => op(Ora, ZeroPageX),
        0x16 => op(Asl, ZeroPageX),
        0x18 => op(Clc, Implied),
        0x19 => op(Ora, AbsoluteY),
        0x1d => op(Ora, AbsoluteX),
        0x1e => op(Asl, AbsoluteX),
        0x20 => op(Jsr, Absolute),
        0x21 => op(And, IndirectX),
        0x24 => op(Bit, ZeroPage),
        0x25 => op(And, ZeroPage),
        0x26 => op(Rol, ZeroPage),
        0x28 => op(Plp, Implied),
        0x29 => op(And, Immediate),
        0x2a => op(Rol, Accumulator),
        0x2c => op(Bit, Absolute),
        0x2d => op(And, Absolute),
        0x2e => op(Rol, Absolute),
        0x30 => op(Bmi, Relative),
        0x31 => op(And, IndirectY),
        0x35 => op(And, ZeroPageX),
        0x36 => op(Rol, ZeroPageX),
        0x38 => op(Sec, Implied),
        0x39 => op(And, AbsoluteY),
        0x3d => op(And, AbsoluteX),
        0x3e => op(Rol, AbsoluteX),
        0x40 => op(Rti, Implied),
        0x41 => op(Eor, IndirectX),
        0x45 => op(Eor, ZeroPage),
        0x46 => op(Lsr, ZeroPage),
        0x48 => op(Pha, Implied),
        0x49 => op(Eor, Immediate),
        0x4a => op(Lsr, Accumulator),
        0x4c => op(Jmp, Absolute),
        0x4d => op(Eor, Absolute),
        0x4e => op(Lsr, Absolute),
        0x50 => op(Bvc, Relative),
        0x51 => op(Eor, IndirectY),
        0x55 => op(Eor, ZeroPageX),
        0x56 => op(Lsr, ZeroPageX),
        0x58 => op(Cli, Implied),
        0x59 => op(Eor, AbsoluteY),
        0x5d => op(Eor, AbsoluteX),
        0x5e => op(Lsr, AbsoluteX),
        0x60 => op(Rts, Implied),
        0x61 => op(Adc, IndirectX),
        0x65 => op(Adc, ZeroPage),
        0x66 => op(Ror, ZeroPage),
        0x68 => op(Pla, Implied),
        0x69 => op(Adc, Immediate),
        0x6a => op(Ror, Accumulator),
        0x6c => op(Jmp, Indirect),
        0x6d => op(Adc, Absolute),
        0x6e => op(Ror, Absolute),
        0x70 => op(Bvs, Relative),
        0x71 => op(Adc, IndirectY),
        0x75 => op(Adc, ZeroPageX),
        0x76 => op(Ror, ZeroPageX),
        0x78 => op(Sei, Implied),
        0x79 => op(Adc, AbsoluteY),
        0x7d => op(Adc, AbsoluteX),
        0x7e => op(Ror, AbsoluteX),
        0x81 => op(Sta, IndirectX),
        0x84 => op(Sty, ZeroPage),
        0x85 => op(Sta, ZeroPage),
        0x86 => op(Stx, ZeroPage),
        0x88 => op(Dey, Implied),
        0x8a => op(Txa, Implied),
        0x8c => op(Sty, Absolute),
        0x8d => op(Sta, Absolute),
        0x8e => op(Stx, Absolute),
        0x90 => op(Bcc, Relative),
        0x91 => op(Sta, IndirectY),
        0x94 => op(Sty, ZeroPageX),
        0x95 => op(Sta, ZeroPageX),
        0x96 => op(Stx, ZeroPageY),
        0x98 => op(Tya, Implied),
        0x99 => op(Sta, AbsoluteY),
        0x9a => op(Txs, Implied),
        0x9d => op(Sta, AbsoluteX),
        0xa0 => op(Ldy, Immediate),
        0xa1 => op(Lda, IndirectX),
        0xa2 => op(Ldx, Immediate),
        0xa4 => op(Ldy, ZeroPage),
        0xa5 => op(Lda, ZeroPage),
        0xa6 => op(Ldx, ZeroPage),
        0xa8 => op(Tay, Implied),
        0xa9 => op(Lda, Immediate),
        0xaa => op(Tax, Implied),
        0xac => op(Ldy, Absolute),
        0xad => op(Lda, Absolute),
        0xae => op(Ldx, Absolute),
        0xb0 => op(Bcs, Relative),
        0xb1 => op(Lda, IndirectY),
        0xb4 => op(Ldy, ZeroPageX),
        0xb5 => op(Lda, ZeroPageX),
        0xb6 => op(Ldx, ZeroPageY),
        0xb8 => op(Clv, Implied),
        0xb9 => op(Lda, AbsoluteY),
        0xba => op(Tsx, Implied),
        0xbc => op(Ldy, AbsoluteX),
        0xbd => op(Lda, AbsoluteX),
        0xbe => op(Ldx, AbsoluteY),
        0xc0 => op(Cpy, Immediate),
        0xc1 => op(Cmp, IndirectX),
        0xc4 => op(Cpy, ZeroPage),
        0xc5 => op(Cmp, ZeroPage),
        0xc6 => op(Dec, ZeroPage),
        0xc8 => op(Iny, Implied),
        0xc9 => op(Cmp, Immediate),
        0xca => op(Dex, Implied),
        0xcc => op(Cpy, Absolute),
        0xcd => op(Cmp, Absolute),
        0xce => op(Dec, Absolute),
        0xd0 => op(Bne, Relative),
        0xd1 => op(Cmp, IndirectY),
        0xd5 => op(Cmp, ZeroPageX),
        0xd6 => op(Dec, ZeroPageX),
        0xd8 => op(Cld, Implied),
        0xd9 => op(Cmp, AbsoluteY),
        0xdd => op(Cmp, AbsoluteX),
        0xde => op(Dec, AbsoluteX),
        0xe0 => op(Cpx, Immediate),
        0xe1 => op(Sbc, IndirectX),
        0xe4 => op(Cpx, ZeroPage),
        0xe5 => op(Sbc, ZeroPage),
        0xe6 => op(Inc, ZeroPage),
        0xe8 => op(Inx, Implied),
        0xe9 => op(Sbc, Immediate),
        0xea => op(Nop, Implied),
        0xec => op(Cpx, Absolute),
        0xed => op(Sbc, Absolute),
        0xee => op(Inc, Absolute),
        0xf0 => op(Beq, Relative),
        0xf1 => op(Sbc, IndirectY),
        0xf5 => op(Sbc, ZeroPageX),
        0xf6 => op(Inc, ZeroPageX),
        0xf8 => op(Sed, Implied),
        0xf9 => op(Sbc, AbsoluteY),
        0xfd => op(Sbc, AbsoluteX),
        0xfe => op(Inc, AbsoluteX),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn build() -> [Option<Opcode>; 256] {
    let mut table = [None; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = decode(i as u8);
        i += 1;
    }
    table
}

/// Opcode byte to instruction, `None` for undefined opcodes.
pub static OPCODES: [Option<Opcode>; 256] = build();
