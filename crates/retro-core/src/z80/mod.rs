//! Zilog Z80 interpreter.
//!
//! Instructions are decoded structurally from the `x/y/z/p/q` fields of the
//! opcode byte rather than through one table per prefix. Index prefixes
//! (`dd`, `fd`) select which register stands in for `hl` and are otherwise
//! transparent.

mod dasm;
mod execute;

pub use dasm::list;

use std::fmt;

use crate::codec::{Decoder, Encoder, Snapshot};
use crate::cpu::{Accessor, Cpu, CpuEditor, Editable, Entry};
use crate::disasm::Lister;
use crate::memory::Memory;

/// Carry.
pub const FLAG_C: u8 = 0x01;
/// Subtract.
pub const FLAG_N: u8 = 0x02;
/// Parity or overflow.
pub const FLAG_V: u8 = 0x04;
/// Undocumented copy of result bit 3.
pub const FLAG_3: u8 = 0x08;
/// Half carry.
pub const FLAG_H: u8 = 0x10;
/// Undocumented copy of result bit 5.
pub const FLAG_5: u8 = 0x20;
/// Zero.
pub const FLAG_Z: u8 = 0x40;
/// Sign.
pub const FLAG_S: u8 = 0x80;

/// Restart address for non-maskable interrupts.
pub const NMI_ADDR: u16 = 0x0066;
/// Restart address for interrupt mode 1.
pub const IM1_ADDR: u16 = 0x0038;

/// Size of the I/O port space.
pub const PORT_SPACE: usize = 0x100;

/// Register that stands in for `hl` under an index prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Index {
    Hl,
    Ix,
    Iy,
}

/// Z80 processor state bound to its memory and I/O space.
#[derive(Debug)]
pub struct Z80 {
    /// Accumulator.
    pub a: u8,
    /// Flags.
    pub f: u8,
    /// B register.
    pub b: u8,
    /// C register.
    pub c: u8,
    /// D register.
    pub d: u8,
    /// E register.
    pub e: u8,
    /// H register.
    pub h: u8,
    /// L register.
    pub l: u8,
    /// Alternate `af`.
    pub af1: u16,
    /// Alternate `bc`.
    pub bc1: u16,
    /// Alternate `de`.
    pub de1: u16,
    /// Alternate `hl`.
    pub hl1: u16,
    /// Index register X.
    pub ix: u16,
    /// Index register Y.
    pub iy: u16,
    /// Stack pointer.
    pub sp: u16,
    /// Interrupt vector base.
    pub i: u8,
    /// Memory refresh counter.
    pub r: u8,
    /// Interrupt enable flip-flop.
    pub iff1: bool,
    /// Copy of `iff1` saved during a non-maskable interrupt.
    pub iff2: bool,
    /// Interrupt mode, 0 to 2.
    pub im: u8,
    /// Set while a `halt` waits for an interrupt.
    pub halted: bool,
    pc: u16,
    mem: Memory,
    ports: Memory,
}

impl Z80 {
    /// Creates a processor at power-on state with an empty port space.
    #[must_use]
    pub fn new(mem: Memory) -> Self {
        Self::with_ports(mem, Memory::new(PORT_SPACE, 1))
    }

    /// Creates a processor with an explicit I/O port space.
    #[must_use]
    pub const fn with_ports(mem: Memory, ports: Memory) -> Self {
        Self {
            a: 0xff,
            f: 0xff,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            af1: 0,
            bc1: 0,
            de1: 0,
            hl1: 0,
            ix: 0,
            iy: 0,
            sp: 0xffff,
            i: 0,
            r: 0,
            iff1: false,
            iff2: false,
            im: 0,
            halted: false,
            pc: 0,
            mem,
            ports,
        }
    }

    /// Returns to power-on register state and jumps to zero.
    pub fn reset(&mut self) {
        self.pc = 0;
        self.i = 0;
        self.r = 0;
        self.iff1 = false;
        self.iff2 = false;
        self.im = 0;
        self.halted = false;
        self.sp = 0xffff;
        self.set_af(0xffff);
    }

    /// I/O port space.
    #[must_use]
    pub const fn ports(&self) -> &Memory {
        &self.ports
    }

    /// Mutable I/O port space.
    pub fn ports_mut(&mut self) -> &mut Memory {
        &mut self.ports
    }

    /// Accepts a maskable interrupt when enabled.
    ///
    /// `data` is the byte placed on the bus by the interrupting device: the
    /// restart opcode in mode 0 and the low byte of the table entry in mode 2.
    pub fn irq(&mut self, data: u8) {
        if !self.iff1 {
            return;
        }
        self.wake();
        self.iff1 = false;
        self.iff2 = false;
        self.push(self.pc);
        self.pc = match self.im {
            2 => {
                let entry = u16::from_le_bytes([data & 0xfe, self.i]);
                self.mem.read_le16(usize::from(entry))
            }
            1 => IM1_ADDR,
            _ => u16::from(data & 0x38),
        };
    }

    /// Accepts a non-maskable interrupt.
    pub fn nmi(&mut self) {
        self.wake();
        self.iff2 = self.iff1;
        self.iff1 = false;
        self.push(self.pc);
        self.pc = NMI_ADDR;
    }

    fn wake(&mut self) {
        if self.halted {
            self.halted = false;
            self.pc = self.pc.wrapping_add(1);
        }
    }

    /// Returns `true` when every bit of `mask` is set in the flags.
    #[must_use]
    pub const fn flag(&self, mask: u8) -> bool {
        self.f & mask == mask
    }

    fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.f |= mask;
        } else {
            self.f &= !mask;
        }
    }

    /// `af` register pair.
    #[must_use]
    pub const fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f])
    }

    /// `bc` register pair.
    #[must_use]
    pub const fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    /// `de` register pair.
    #[must_use]
    pub const fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    /// `hl` register pair.
    #[must_use]
    pub const fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    /// Sets the `af` register pair.
    pub fn set_af(&mut self, value: u16) {
        [self.a, self.f] = value.to_be_bytes();
    }

    /// Sets the `bc` register pair.
    pub fn set_bc(&mut self, value: u16) {
        [self.b, self.c] = value.to_be_bytes();
    }

    /// Sets the `de` register pair.
    pub fn set_de(&mut self, value: u16) {
        [self.d, self.e] = value.to_be_bytes();
    }

    /// Sets the `hl` register pair.
    pub fn set_hl(&mut self, value: u16) {
        [self.h, self.l] = value.to_be_bytes();
    }
}

impl Cpu for Z80 {
    fn pc(&self) -> usize {
        usize::from(self.pc)
    }

    fn set_pc(&mut self, addr: usize) {
        self.pc = u16::try_from(addr & 0xffff).unwrap_or(0);
        self.halted = false;
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

macro_rules! reg8 {
    ($name:literal, $field:ident) => {
        (
            $name,
            Accessor::U8 {
                get: |c| c.$field,
                put: Some(|c, v| c.$field = v),
            },
        )
    };
}

macro_rules! reg16 {
    ($name:literal, $field:ident) => {
        (
            $name,
            Accessor::U16 {
                get: |c| c.$field,
                put: Some(|c, v| c.$field = v),
            },
        )
    };
    ($name:literal, $get:ident, $put:ident) => {
        (
            $name,
            Accessor::U16 {
                get: Z80::$get,
                put: Some(Z80::$put),
            },
        )
    };
}

macro_rules! flag {
    ($name:literal, $mask:expr) => {
        (
            $name,
            Accessor::Bool {
                get: |c| c.flag($mask),
                put: Some(|c, v| c.set_flag($mask, v)),
            },
        )
    };
}

static REGISTERS: [Entry<Z80>; 23] = [
    (
        "pc",
        Accessor::U16 {
            get: |c| c.pc,
            put: Some(|c, v| {
                c.pc = v;
                c.halted = false;
            }),
        },
    ),
    reg8!("a", a),
    reg8!("f", f),
    reg8!("b", b),
    reg8!("c", c),
    reg8!("d", d),
    reg8!("e", e),
    reg8!("h", h),
    reg8!("l", l),
    reg16!("af", af, set_af),
    reg16!("bc", bc, set_bc),
    reg16!("de", de, set_de),
    reg16!("hl", hl, set_hl),
    reg16!("ix", ix),
    reg16!("iy", iy),
    reg16!("sp", sp),
    reg8!("i", i),
    reg8!("r", r),
    reg16!("af'", af1),
    reg16!("bc'", bc1),
    reg16!("de'", de1),
    reg16!("hl'", hl1),
    (
        "im",
        Accessor::U8 {
            get: |c| c.im,
            put: Some(|c, v| c.im = v.min(2)),
        },
    ),
];

static FLAGS: [Entry<Z80>; 10] = [
    flag!("s", FLAG_S),
    flag!("z", FLAG_Z),
    flag!("5", FLAG_5),
    flag!("h", FLAG_H),
    flag!("3", FLAG_3),
    flag!("v", FLAG_V),
    flag!("n", FLAG_N),
    flag!("c", FLAG_C),
    (
        "iff1",
        Accessor::Bool {
            get: |c| c.iff1,
            put: Some(|c, v| c.iff1 = v),
        },
    ),
    (
        "iff2",
        Accessor::Bool {
            get: |c| c.iff2,
            put: Some(|c, v| c.iff2 = v),
        },
    ),
];

impl Editable for Z80 {
    fn register_table() -> &'static [Entry<Self>] {
        &REGISTERS
    }

    fn flag_table() -> &'static [Entry<Self>] {
        &FLAGS
    }
}

impl Snapshot for Z80 {
    fn save(&self, enc: &mut Encoder<'_>) {
        enc.write_u16(self.pc);
        enc.write_u16(self.af());
        enc.write_u16(self.bc());
        enc.write_u16(self.de());
        enc.write_u16(self.hl());
        enc.write_u16(self.af1);
        enc.write_u16(self.bc1);
        enc.write_u16(self.de1);
        enc.write_u16(self.hl1);
        enc.write_u16(self.ix);
        enc.write_u16(self.iy);
        enc.write_u16(self.sp);
        enc.write_u8(self.i);
        enc.write_u8(self.r);
        enc.write_bool(self.iff1);
        enc.write_bool(self.iff2);
        enc.write_u8(self.im);
        enc.write_bool(self.halted);
        self.mem.save(enc);
        self.ports.save(enc);
    }

    fn load(&mut self, dec: &mut Decoder<'_>) {
        self.pc = dec.read_u16();
        let af = dec.read_u16();
        self.set_af(af);
        let bc = dec.read_u16();
        self.set_bc(bc);
        let de = dec.read_u16();
        self.set_de(de);
        let hl = dec.read_u16();
        self.set_hl(hl);
        self.af1 = dec.read_u16();
        self.bc1 = dec.read_u16();
        self.de1 = dec.read_u16();
        self.hl1 = dec.read_u16();
        self.ix = dec.read_u16();
        self.iy = dec.read_u16();
        self.sp = dec.read_u16();
        self.i = dec.read_u8();
        self.r = dec.read_u8();
        self.iff1 = dec.read_bool();
        self.iff2 = dec.read_bool();
        self.im = dec.read_u8();
        self.halted = dec.read_bool();
        self.mem.load(dec);
        self.ports.load(dec);
    }
}

impl fmt::Display for Z80 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |mask| if self.flag(mask) { '*' } else { '.' };
        let on = |v: bool| if v { '*' } else { '.' };
        writeln!(f, " pc   af   bc   de   hl   ix   iy   sp   i  r  im")?;
        writeln!(
            f,
            "{:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x}  {:02x} {:02x} {}",
            self.pc,
            self.af(),
            self.bc(),
            self.de(),
            self.hl(),
            self.ix,
            self.iy,
            self.sp,
            self.i,
            self.r,
            self.im,
        )?;
        writeln!(f, "      af'  bc'  de'  hl'   s z 5 h 3 v n c  iff1 iff2")?;
        write!(
            f,
            "     {:04x} {:04x} {:04x} {:04x}   {} {} {} {} {} {} {} {}   {}    {}",
            self.af1,
            self.bc1,
            self.de1,
            self.hl1,
            bit(FLAG_S),
            bit(FLAG_Z),
            bit(FLAG_5),
            bit(FLAG_H),
            bit(FLAG_3),
            bit(FLAG_V),
            bit(FLAG_N),
            bit(FLAG_C),
            on(self.iff1),
            on(self.iff2),
        )
    }
}
