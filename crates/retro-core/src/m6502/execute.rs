use super::opcodes::{Mnemonic, Mode, Opcode, OPCODES};
use super::{Mos6502, FLAG_B, FLAG_C, FLAG_D, FLAG_I, FLAG_N, FLAG_V, FLAG_Z, FLAG_5, IRQ_VECTOR, STACK_PAGE};
use crate::alu::MOS6502 as ALU;

#[derive(Debug, Clone, Copy)]
enum Operand {
    Implied,
    Accumulator,
    Immediate(u8),
    Address(u16),
}

impl Mos6502 {
    fn read(&self, addr: u16) -> u8 {
        self.mem.read(usize::from(addr))
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.mem.write(usize::from(addr), value);
    }

    fn fetch(&mut self) -> u8 {
        self.pc = self.pc.wrapping_add(1);
        self.read(self.pc)
    }

    fn fetch16(&mut self) -> u16 {
        let lo = self.fetch();
        let hi = self.fetch();
        u16::from_le_bytes([lo, hi])
    }

    fn read_zp16(&self, zp: u8) -> u16 {
        let lo = self.read(u16::from(zp));
        let hi = self.read(u16::from(zp.wrapping_add(1)));
        u16::from_le_bytes([lo, hi])
    }

    pub(super) fn push(&mut self, value: u8) {
        self.write(STACK_PAGE | u16::from(self.sp), value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pull(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read(STACK_PAGE | u16::from(self.sp))
    }

    pub(super) fn push16(&mut self, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.push(hi);
        self.push(lo);
    }

    fn pull16(&mut self) -> u16 {
        let lo = self.pull();
        let hi = self.pull();
        u16::from_le_bytes([lo, hi])
    }

    fn operand(&mut self, mode: Mode) -> Operand {
        match mode {
            Mode::Implied => Operand::Implied,
            Mode::Accumulator => Operand::Accumulator,
            Mode::Immediate | Mode::Relative => Operand::Immediate(self.fetch()),
            Mode::ZeroPage => Operand::Address(u16::from(self.fetch())),
            Mode::ZeroPageX => Operand::Address(u16::from(self.fetch().wrapping_add(self.x))),
            Mode::ZeroPageY => Operand::Address(u16::from(self.fetch().wrapping_add(self.y))),
            Mode::Absolute => Operand::Address(self.fetch16()),
            Mode::AbsoluteX => Operand::Address(self.fetch16().wrapping_add(u16::from(self.x))),
            Mode::AbsoluteY => Operand::Address(self.fetch16().wrapping_add(u16::from(self.y))),
            Mode::Indirect => {
                let ptr = self.fetch16();
                // The high byte is fetched without carrying into the page.
                let hi_addr = (ptr & 0xff00) | (ptr.wrapping_add(1) & 0x00ff);
                let target = u16::from_le_bytes([self.read(ptr), self.read(hi_addr)]);
                Operand::Address(target)
            }
            Mode::IndirectX => {
                let zp = self.fetch().wrapping_add(self.x);
                Operand::Address(self.read_zp16(zp))
            }
            Mode::IndirectY => {
                let zp = self.fetch();
                Operand::Address(self.read_zp16(zp).wrapping_add(u16::from(self.y)))
            }
        }
    }

    fn load(&self, operand: Operand) -> u8 {
        match operand {
            Operand::Implied => 0,
            Operand::Accumulator => self.a,
            Operand::Immediate(value) => value,
            Operand::Address(addr) => self.read(addr),
        }
    }

    fn store(&mut self, operand: Operand, value: u8) {
        match operand {
            Operand::Implied | Operand::Immediate(_) => {}
            Operand::Accumulator => self.a = value,
            Operand::Address(addr) => self.write(addr, value),
        }
    }

    fn branch(&mut self, operand: Operand, taken: bool) {
        if let (true, Operand::Immediate(disp)) = (taken, operand) {
            let disp = i16::from(i8::from_le_bytes([disp]));
            self.pc = self.pc.wrapping_add_signed(disp);
        }
    }

    fn modify(&mut self, operand: Operand, f: impl FnOnce(&mut u8, u8) -> u8) {
        let value = self.load(operand);
        let result = f(&mut self.sr, value);
        self.store(operand, result);
    }

    fn carry(&self) -> bool {
        self.flag(FLAG_C)
    }

    #[allow(clippy::too_many_lines)]
    pub(super) fn execute(&mut self) {
        let opcode = self.fetch();
        let Some(Opcode { mnemonic, mode }) = OPCODES[usize::from(opcode)] else {
            return;
        };
        let operand = self.operand(mode);
        match mnemonic {
            Mnemonic::Adc => {
                let value = self.load(operand);
                let carry = self.carry();
                self.a = if self.flag(FLAG_D) {
                    ALU.add_bcd(&mut self.sr, self.a, value, carry)
                } else {
                    ALU.add(&mut self.sr, self.a, value, carry)
                };
            }
            Mnemonic::Sbc => {
                let value = self.load(operand);
                let borrow = !self.carry();
                self.a = if self.flag(FLAG_D) {
                    ALU.subtract_bcd(&mut self.sr, self.a, value, borrow)
                } else {
                    ALU.subtract(&mut self.sr, self.a, value, borrow)
                };
            }
            Mnemonic::And => {
                let value = self.load(operand);
                self.a = ALU.and(&mut self.sr, self.a, value);
            }
            Mnemonic::Ora => {
                let value = self.load(operand);
                self.a = ALU.or(&mut self.sr, self.a, value);
            }
            Mnemonic::Eor => {
                let value = self.load(operand);
                self.a = ALU.xor(&mut self.sr, self.a, value);
            }
            Mnemonic::Asl => self.modify(operand, |sr, v| ALU.shift_left(sr, v, false)),
            Mnemonic::Lsr => self.modify(operand, |sr, v| ALU.shift_right(sr, v, false)),
            Mnemonic::Rol => {
                let carry = self.carry();
                self.modify(operand, |sr, v| ALU.shift_left(sr, v, carry));
            }
            Mnemonic::Ror => {
                let carry = self.carry();
                self.modify(operand, |sr, v| ALU.shift_right(sr, v, carry));
            }
            Mnemonic::Inc => self.modify(operand, |sr, v| ALU.increment(sr, v)),
            Mnemonic::Dec => self.modify(operand, |sr, v| ALU.decrement(sr, v)),
            Mnemonic::Inx => self.x = ALU.increment(&mut self.sr, self.x),
            Mnemonic::Iny => self.y = ALU.increment(&mut self.sr, self.y),
            Mnemonic::Dex => self.x = ALU.decrement(&mut self.sr, self.x),
            Mnemonic::Dey => self.y = ALU.decrement(&mut self.sr, self.y),
            Mnemonic::Bit => {
                let value = self.load(operand);
                self.set_flag(FLAG_Z, self.a & value == 0);
                self.set_flag(FLAG_N, value & FLAG_N != 0);
                self.set_flag(FLAG_V, value & FLAG_V != 0);
            }
            Mnemonic::Cmp => {
                let value = self.load(operand);
                ALU.compare(&mut self.sr, self.a, value);
            }
            Mnemonic::Cpx => {
                let value = self.load(operand);
                ALU.compare(&mut self.sr, self.x, value);
            }
            Mnemonic::Cpy => {
                let value = self.load(operand);
                ALU.compare(&mut self.sr, self.y, value);
            }
            Mnemonic::Bcc => self.branch(operand, !self.flag(FLAG_C)),
            Mnemonic::Bcs => self.branch(operand, self.flag(FLAG_C)),
            Mnemonic::Bne => self.branch(operand, !self.flag(FLAG_Z)),
            Mnemonic::Beq => self.branch(operand, self.flag(FLAG_Z)),
            Mnemonic::Bpl => self.branch(operand, !self.flag(FLAG_N)),
            Mnemonic::Bmi => self.branch(operand, self.flag(FLAG_N)),
            Mnemonic::Bvc => self.branch(operand, !self.flag(FLAG_V)),
            Mnemonic::Bvs => self.branch(operand, self.flag(FLAG_V)),
            Mnemonic::Brk => {
                self.fetch();
                self.push16(self.pc.wrapping_add(1));
                self.push(self.sr | FLAG_B | FLAG_5);
                self.sr |= FLAG_I;
                self.pc = self.mem.read_le16(IRQ_VECTOR).wrapping_sub(1);
            }
            Mnemonic::Rti => {
                self.sr = (self.pull() & !FLAG_B) | FLAG_5;
                self.pc = self.pull16().wrapping_sub(1);
            }
            Mnemonic::Jmp => {
                if let Operand::Address(target) = operand {
                    self.pc = target.wrapping_sub(1);
                }
            }
            Mnemonic::Jsr => {
                if let Operand::Address(target) = operand {
                    self.push16(self.pc);
                    self.pc = target.wrapping_sub(1);
                }
            }
            Mnemonic::Rts => self.pc = self.pull16(),
            Mnemonic::Clc => self.set_flag(FLAG_C, false),
            Mnemonic::Cld => self.set_flag(FLAG_D, false),
            Mnemonic::Cli => self.set_flag(FLAG_I, false),
            Mnemonic::Clv => self.set_flag(FLAG_V, false),
            Mnemonic::Sec => self.set_flag(FLAG_C, true),
            Mnemonic::Sed => self.set_flag(FLAG_D, true),
            Mnemonic::Sei => self.set_flag(FLAG_I, true),
            Mnemonic::Lda => {
                let value = self.load(operand);
                self.a = ALU.pass(&mut self.sr, value);
            }
            Mnemonic::Ldx => {
                let value = self.load(operand);
                self.x = ALU.pass(&mut self.sr, value);
            }
            Mnemonic::Ldy => {
                let value = self.load(operand);
                self.y = ALU.pass(&mut self.sr, value);
            }
            Mnemonic::Sta => self.store(operand, self.a),
            Mnemonic::Stx => self.store(operand, self.x),
            Mnemonic::Sty => self.store(operand, self.y),
            Mnemonic::Tax => self.x = ALU.pass(&mut self.sr, self.a),
            Mnemonic::Tay => self.y = ALU.pass(&mut self.sr, self.a),
            Mnemonic::Txa => self.a = ALU.pass(&mut self.sr, self.x),
            Mnemonic::Tya => self.a = ALU.pass(&mut self.sr, self.y),
            Mnemonic::Tsx => self.x = ALU.pass(&mut self.sr, self.sp),
            Mnemonic::Txs => self.sp = self.x,
            Mnemonic::Pha => self.push(self.a),
            Mnemonic::Php => self.push(self.sr | FLAG_B | FLAG_5),
            Mnemonic::Pla => {
                let value = self.pull();
                self.a = ALU.pass(&mut self.sr, value);
            }
            Mnemonic::Plp => self.sr = (self.pull() & !FLAG_B) | FLAG_5,
            Mnemonic::Nop => {}
        }
    }
}
