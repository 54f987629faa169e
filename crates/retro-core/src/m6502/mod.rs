//! MOS 6502 interpreter.
//!
//! The program counter is held as the address of the last byte fetched, so
//! every fetch pre-increments it. This matches the hardware's own convention
//! for return addresses: `jsr` pushes the address of its final operand byte
//! and `rts` resumes one past the pulled value.

mod dasm;
mod execute;
/// Static opcode table.
pub mod opcodes;

pub use dasm::list;

use std::fmt;

use crate::codec::{Decoder, Encoder, Snapshot};
use crate::cpu::{Accessor, Cpu, CpuEditor, Editable, Entry};
use crate::disasm::Lister;
use crate::memory::Memory;

/// Carry.
pub const FLAG_C: u8 = 0x01;
/// Zero.
pub const FLAG_Z: u8 = 0x02;
/// Interrupt disable.
pub const FLAG_I: u8 = 0x04;
/// Decimal mode.
pub const FLAG_D: u8 = 0x08;
/// Break, only meaningful in the copy pushed to the stack.
pub const FLAG_B: u8 = 0x10;
/// Unused bit, always read as one.
pub const FLAG_5: u8 = 0x20;
/// Overflow.
pub const FLAG_V: u8 = 0x40;
/// Negative.
pub const FLAG_N: u8 = 0x80;

/// Non-maskable interrupt vector.
pub const NMI_VECTOR: usize = 0xfffa;
/// Reset vector.
pub const RESET_VECTOR: usize = 0xfffc;
/// IRQ and BRK vector.
pub const IRQ_VECTOR: usize = 0xfffe;

/// Base address of the hardware stack.
pub const STACK_PAGE: u16 = 0x0100;

/// MOS 6502 processor state bound to its memory.
#[derive(Debug)]
pub struct Mos6502 {
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Stack pointer, offset into page one.
    pub sp: u8,
    /// Status register.
    pub sr: u8,
    pc: u16,
    mem: Memory,
}

impl Mos6502 {
    /// Creates a processor at power-on state with `pc` at zero.
    #[must_use]
    pub fn new(mem: Memory) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xfd,
            sr: FLAG_I | FLAG_5,
            pc: 0xffff,
            mem,
        }
    }

    /// Reloads the stack pointer and status and jumps through the reset
    /// vector.
    pub fn reset(&mut self) {
        self.sp = 0xfd;
        self.sr = FLAG_I | FLAG_5;
        let target = self.mem.read_le16(RESET_VECTOR);
        self.pc = target.wrapping_sub(1);
    }

    /// Services a maskable interrupt unless interrupts are disabled.
    pub fn irq(&mut self) {
        if !self.flag(FLAG_I) {
            self.interrupt(IRQ_VECTOR);
        }
    }

    /// Services a non-maskable interrupt.
    pub fn nmi(&mut self) {
        self.interrupt(NMI_VECTOR);
    }

    fn interrupt(&mut self, vector: usize) {
        self.push16(self.pc.wrapping_add(1));
        self.push((self.sr & !FLAG_B) | FLAG_5);
        self.sr |= FLAG_I;
        self.pc = self.mem.read_le16(vector).wrapping_sub(1);
    }

    /// Returns `true` when every bit of `mask` is set in the status register.
    #[must_use]
    pub const fn flag(&self, mask: u8) -> bool {
        self.sr & mask == mask
    }

    fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.sr |= mask;
        } else {
            self.sr &= !mask;
        }
    }

    fn pc16(&self) -> u16 {
        self.pc.wrapping_add(1)
    }

    fn put_pc16(&mut self, addr: u16) {
        self.pc = addr.wrapping_sub(1);
    }
}

impl Cpu for Mos6502 {
    fn pc(&self) -> usize {
        usize::from(self.pc16())
    }

    fn set_pc(&mut self, addr: usize) {
        self.put_pc16(u16::try_from(addr & 0xffff).unwrap_or(0));
    }

    fn offset(&self) -> usize {
        self.mem.offset()
    }

    fn step(&mut self) {
        self.execute();
    }

    fn memory(&self) -> &Memory {
        &self.mem
    }

    fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    fn editor(&self) -> Option<&dyn CpuEditor> {
        Some(self)
    }

    fn editor_mut(&mut self) -> Option<&mut dyn CpuEditor> {
        Some(self)
    }

    fn lister(&self) -> Option<Lister> {
        Some(list)
    }
}

static REGISTERS: [Entry<Mos6502>; 6] = [
    (
        "pc",
        Accessor::U16 {
            get: Mos6502::pc16,
            put: Some(Mos6502::put_pc16),
        },
    ),
    (
        "a",
        Accessor::U8 {
            get: |c| c.a,
            put: Some(|c, v| c.a = v),
        },
    ),
    (
        "x",
        Accessor::U8 {
            get: |c| c.x,
            put: Some(|c, v| c.x = v),
        },
    ),
    (
        "y",
        Accessor::U8 {
            get: |c| c.y,
            put: Some(|c, v| c.y = v),
        },
    ),
    (
        "sp",
        Accessor::U8 {
            get: |c| c.sp,
            put: Some(|c, v| c.sp = v),
        },
    ),
    (
        "sr",
        Accessor::U8 {
            get: |c| c.sr,
            put: Some(|c, v| c.sr = v | FLAG_5),
        },
    ),
];

static FLAGS: [Entry<Mos6502>; 7] = [
    (
        "n",
        Accessor::Bool {
            get: |c| c.flag(FLAG_N),
            put: Some(|c, v| c.set_flag(FLAG_N, v)),
        },
    ),
    (
        "v",
        Accessor::Bool {
            get: |c| c.flag(FLAG_V),
            put: Some(|c, v| c.set_flag(FLAG_V, v)),
        },
    ),
    (
        "b",
        Accessor::Bool {
            get: |c| c.flag(FLAG_B),
            put: Some(|c, v| c.set_flag(FLAG_B, v)),
        },
    ),
    (
        "d",
        Accessor::Bool {
            get: |c| c.flag(FLAG_D),
            put: Some(|c, v| c.set_flag(FLAG_D, v)),
        },
    ),
    (
        "i",
        Accessor::Bool {
            get: |c| c.flag(FLAG_I),
            put: Some(|c, v| c.set_flag(FLAG_I, v)),
        },
    ),
    (
        "z",
        Accessor::Bool {
            get: |c| c.flag(FLAG_Z),
            put: Some(|c, v| c.set_flag(FLAG_Z, v)),
        },
    ),
    (
        "c",
        Accessor::Bool {
            get: |c| c.flag(FLAG_C),
            put: Some(|c, v| c.set_flag(FLAG_C, v)),
        },
    ),
];

impl Editable for Mos6502 {
    fn register_table() -> &'static [Entry<Self>] {
        &REGISTERS
    }

    fn flag_table() -> &'static [Entry<Self>] {
        &FLAGS
    }
}

impl Snapshot for Mos6502 {
    fn save(&self, enc: &mut Encoder<'_>) {
        enc.write_u16(self.pc);
        enc.write_u8(self.a);
        enc.write_u8(self.x);
        enc.write_u8(self.y);
        enc.write_u8(self.sp);
        enc.write_u8(self.sr);
        self.mem.save(enc);
    }

    fn load(&mut self, dec: &mut Decoder<'_>) {
        self.pc = dec.read_u16();
        self.a = dec.read_u8();
        self.x = dec.read_u8();
        self.y = dec.read_u8();
        self.sp = dec.read_u8();
        self.sr = dec.read_u8();
        self.mem.load(dec);
    }
}

impl fmt::Display for Mos6502 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |mask| if self.flag(mask) { '*' } else { '.' };
        writeln!(f, " pc  sr ac xr yr sp  n v - b d i z c")?;
        write!(
            f,
            "{:04x} {:02x} {:02x} {:02x} {:02x} {:02x}  {} {} {} {} {} {} {} {}",
            self.pc16(),
            self.sr,
            self.a,
            self.x,
            self.y,
            self.sp,
            bit(FLAG_N),
            bit(FLAG_V),
            bit(FLAG_5),
            bit(FLAG_B),
            bit(FLAG_D),
            bit(FLAG_I),
            bit(FLAG_Z),
            bit(FLAG_C),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Mos6502, FLAG_C, FLAG_I, RESET_VECTOR};
    use crate::codec::{Decoder, Encoder, Snapshot};
    use crate::cpu::{Cpu, Value};
    use crate::memory::Memory;

    fn cpu() -> Mos6502 {
        Mos6502::new(Memory::with_ram(0x10000))
    }

    #[test]
    fn pc_round_trips_through_internal_convention() {
        let mut cpu = cpu();
        cpu.set_pc(0x0400);
        assert_eq!(cpu.pc(), 0x0400);
        cpu.set_pc(0x0000);
        assert_eq!(cpu.pc(), 0x0000);
    }

    #[test]
    fn reset_jumps_through_vector() {
        let mut cpu = cpu();
        cpu.memory_mut().write_le16(RESET_VECTOR, 0xc000);
        cpu.reset();
        assert_eq!(cpu.pc(), 0xc000);
        assert!(cpu.flag(FLAG_I));
    }

    #[test]
    fn editor_exposes_registers_and_flags() {
        let mut cpu = cpu();
        let editor = cpu.editor_mut().unwrap();
        editor.put_register("pc", Value::U16(0x1234)).unwrap();
        editor.put_flag("c", Value::Bool(true)).unwrap();
        editor.put_register("a", Value::U8(0x42)).unwrap();
        assert_eq!(cpu.pc(), 0x1234);
        assert_eq!(cpu.sr & FLAG_C, FLAG_C);
        assert_eq!(cpu.a, 0x42);
        let names: Vec<&str> = cpu.editor().unwrap().flags().iter().map(|f| f.0).collect();
        assert_eq!(names, vec!["n", "v", "b", "d", "i", "z", "c"]);
    }

    #[test]
    fn display_lists_registers_and_flags() {
        let mut cpu = cpu();
        cpu.set_pc(0x0400);
        let text = cpu.to_string();
        assert!(text.ends_with("0400 24 00 00 00 fd  . . * . . * . ."), "{text}");
    }

    #[test]
    fn snapshot_round_trips_registers_and_memory() {
        let mut cpu = cpu();
        cpu.set_pc(0x0812);
        cpu.a = 1;
        cpu.x = 2;
        cpu.y = 3;
        cpu.sp = 0x80;
        cpu.sr = 0xe5;
        cpu.memory_mut().write(0x2000, 0x99);

        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        cpu.save(&mut enc);
        enc.finish().unwrap();

        let mut other = super::Mos6502::new(Memory::with_ram(0x10000));
        let mut input = buf.as_slice();
        let mut dec = Decoder::new(&mut input);
        other.load(&mut dec);
        dec.finish().unwrap();

        assert_eq!(other.to_string(), cpu.to_string());
        assert_eq!(other.memory().read(0x2000), 0x99);
    }
}
