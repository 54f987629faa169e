use super::{Index, Z80, FLAG_3, FLAG_5, FLAG_C, FLAG_H, FLAG_N, FLAG_S, FLAG_V, FLAG_Z};
use crate::alu::{parity, Z80 as ALU};

/// Resolved 8-bit operand.
#[derive(Debug, Clone, Copy)]
enum Loc {
    /// `b`, `c`, `d`, `e` or `a` by register number.
    Reg(u8),
    High(Index),
    Low(Index),
    Mem(u16),
}

const IM_MODES: [u8; 8] = [0, 0, 1, 2, 0, 0, 1, 2];

const fn flag_if(on: bool, mask: u8) -> u8 {
    if on {
        mask
    } else {
        0
    }
}

impl Z80 {
    fn read(&self, addr: u16) -> u8 {
        self.mem.read(usize::from(addr))
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.mem.write(usize::from(addr), value);
    }

    fn read16(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    fn write16(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    fn fetch(&mut self) -> u8 {
        let value = self.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    fn fetch16(&mut self) -> u16 {
        let lo = self.fetch();
        let hi = self.fetch();
        u16::from_le_bytes([lo, hi])
    }

    /// Opcode fetch cycle, which also advances the refresh counter.
    fn fetch_opcode(&mut self) -> u8 {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(1) & 0x7f);
        self.fetch()
    }

    fn displacement(&mut self) -> i16 {
        i16::from(i8::from_le_bytes([self.fetch()]))
    }

    pub(super) fn push(&mut self, value: u16) {
        self.sp = self.sp.wrapping_sub(2);
        self.write16(self.sp, value);
    }

    fn pop(&mut self) -> u16 {
        let value = self.read16(self.sp);
        self.sp = self.sp.wrapping_add(2);
        value
    }

    fn input(&self, port: u8) -> u8 {
        self.ports.read(usize::from(port))
    }

    fn output(&mut self, port: u8, value: u8) {
        self.ports.write(usize::from(port), value);
    }

    fn index(&self, idx: Index) -> u16 {
        match idx {
            Index::Hl => self.hl(),
            Index::Ix => self.ix,
            Index::Iy => self.iy,
        }
    }

    fn set_index(&mut self, idx: Index, value: u16) {
        match idx {
            Index::Hl => self.set_hl(value),
            Index::Ix => self.ix = value,
            Index::Iy => self.iy = value,
        }
    }

    /// Address of the `(hl)` operand, fetching the displacement under an
    /// index prefix.
    fn indirect(&mut self, idx: Index) -> u16 {
        match idx {
            Index::Hl => self.hl(),
            _ => {
                let base = self.index(idx);
                base.wrapping_add_signed(self.displacement())
            }
        }
    }

    fn plain(&self, n: u8) -> Loc {
        match n {
            4 => Loc::High(Index::Hl),
            5 => Loc::Low(Index::Hl),
            6 => Loc::Mem(self.hl()),
            _ => Loc::Reg(n),
        }
    }

    /// Resolves register field `n`. With `halves` set, `h` and `l` follow
    /// the index prefix.
    fn loc(&mut self, n: u8, idx: Index, halves: bool) -> Loc {
        let half = if halves { idx } else { Index::Hl };
        match n {
            4 => Loc::High(half),
            5 => Loc::Low(half),
            6 => Loc::Mem(self.indirect(idx)),
            _ => Loc::Reg(n),
        }
    }

    fn get(&self, loc: Loc) -> u8 {
        match loc {
            Loc::Reg(0) => self.b,
            Loc::Reg(1) => self.c,
            Loc::Reg(2) => self.d,
            Loc::Reg(3) => self.e,
            Loc::Reg(_) => self.a,
            Loc::High(idx) => self.index(idx).to_be_bytes()[0],
            Loc::Low(idx) => self.index(idx).to_be_bytes()[1],
            Loc::Mem(addr) => self.read(addr),
        }
    }

    fn put(&mut self, loc: Loc, value: u8) {
        match loc {
            Loc::Reg(0) => self.b = value,
            Loc::Reg(1) => self.c = value,
            Loc::Reg(2) => self.d = value,
            Loc::Reg(3) => self.e = value,
            Loc::Reg(_) => self.a = value,
            Loc::High(idx) => {
                let [_, lo] = self.index(idx).to_be_bytes();
                self.set_index(idx, u16::from_be_bytes([value, lo]));
            }
            Loc::Low(idx) => {
                let [hi, _] = self.index(idx).to_be_bytes();
                self.set_index(idx, u16::from_be_bytes([hi, value]));
            }
            Loc::Mem(addr) => self.write(addr, value),
        }
    }

    fn pair(&self, p: u8, idx: Index) -> u16 {
        match p {
            0 => self.bc(),
            1 => self.de(),
            2 => self.index(idx),
            _ => self.sp,
        }
    }

    fn set_pair(&mut self, p: u8, idx: Index, value: u16) {
        match p {
            0 => self.set_bc(value),
            1 => self.set_de(value),
            2 => self.set_index(idx, value),
            _ => self.sp = value,
        }
    }

    fn pair_af(&self, p: u8, idx: Index) -> u16 {
        if p == 3 {
            self.af()
        } else {
            self.pair(p, idx)
        }
    }

    fn set_pair_af(&mut self, p: u8, idx: Index, value: u16) {
        if p == 3 {
            self.set_af(value);
        } else {
            self.set_pair(p, idx, value);
        }
    }

    const fn condition(&self, y: u8) -> bool {
        let f = self.f;
        match y {
            0 => f & FLAG_Z == 0,
            1 => f & FLAG_Z != 0,
            2 => f & FLAG_C == 0,
            3 => f & FLAG_C != 0,
            4 => f & FLAG_V == 0,
            5 => f & FLAG_V != 0,
            6 => f & FLAG_S == 0,
            _ => f & FLAG_S != 0,
        }
    }

    fn jump_relative(&mut self, disp: i16) {
        self.pc = self.pc.wrapping_add_signed(disp);
    }

    pub(super) fn execute(&mut self) {
        let op = self.fetch_opcode();
        match op {
            0xcb => self.prefix_cb(Index::Hl),
            0xed => self.prefix_ed(),
            0xdd | 0xfd => {
                let idx = if op == 0xdd { Index::Ix } else { Index::Iy };
                // A prefix followed by another prefix has no effect.
                if matches!(self.read(self.pc), 0xdd | 0xed | 0xfd) {
                    return;
                }
                let op = self.fetch_opcode();
                if op == 0xcb {
                    self.prefix_cb(idx);
                } else {
                    self.unprefixed(op, idx);
                }
            }
            _ => self.unprefixed(op, Index::Hl),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn unprefixed(&mut self, op: u8, idx: Index) {
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = y >> 1;
        let q = y & 1;
        match (x, z) {
            (0, 0) => match y {
                0 => {}
                1 => {
                    let af = self.af();
                    self.set_af(self.af1);
                    self.af1 = af;
                }
                2 => {
                    let disp = self.displacement();
                    self.b = self.b.wrapping_sub(1);
                    if self.b != 0 {
                        self.jump_relative(disp);
                    }
                }
                3 => {
                    let disp = self.displacement();
                    self.jump_relative(disp);
                }
                _ => {
                    let disp = self.displacement();
                    if self.condition(y - 4) {
                        self.jump_relative(disp);
                    }
                }
            },
            (0, 1) => {
                if q == 0 {
                    let nn = self.fetch16();
                    self.set_pair(p, idx, nn);
                } else {
                    let sum = self.add16(self.index(idx), self.pair(p, idx));
                    self.set_index(idx, sum);
                }
            }
            (0, 2) => match (q, p) {
                (0, 0) => self.write(self.bc(), self.a),
                (0, 1) => self.write(self.de(), self.a),
                (0, 2) => {
                    let nn = self.fetch16();
                    self.write16(nn, self.index(idx));
                }
                (0, _) => {
                    let nn = self.fetch16();
                    self.write(nn, self.a);
                }
                (_, 0) => self.a = self.read(self.bc()),
                (_, 1) => self.a = self.read(self.de()),
                (_, 2) => {
                    let nn = self.fetch16();
                    let value = self.read16(nn);
                    self.set_index(idx, value);
                }
                _ => {
                    let nn = self.fetch16();
                    self.a = self.read(nn);
                }
            },
            (0, 3) => {
                let value = self.pair(p, idx);
                let value = if q == 0 {
                    value.wrapping_add(1)
                } else {
                    value.wrapping_sub(1)
                };
                self.set_pair(p, idx, value);
            }
            (0, 4) => {
                let loc = self.loc(y, idx, true);
                let value = self.get(loc);
                let result = ALU.increment(&mut self.f, value);
                self.put(loc, result);
            }
            (0, 5) => {
                let loc = self.loc(y, idx, true);
                let value = self.get(loc);
                let result = ALU.decrement(&mut self.f, value);
                self.put(loc, result);
            }
            (0, 6) => {
                let loc = self.loc(y, idx, true);
                let n = self.fetch();
                self.put(loc, n);
            }
            (0, _) => self.accumulator_op(y),
            (1, 6) if y == 6 => {
                self.halted = true;
                self.pc = self.pc.wrapping_sub(1);
            }
            (1, _) => {
                let halves = y != 6 && z != 6;
                let src = self.loc(z, idx, halves);
                let dst = self.loc(y, idx, halves);
                let value = self.get(src);
                self.put(dst, value);
            }
            (2, _) => {
                let loc = self.loc(z, idx, true);
                let value = self.get(loc);
                self.alu(y, value);
            }
            (_, 0) => {
                if self.condition(y) {
                    self.pc = self.pop();
                }
            }
            (_, 1) => {
                if q == 0 {
                    let value = self.pop();
                    self.set_pair_af(p, idx, value);
                } else {
                    match p {
                        0 => self.pc = self.pop(),
                        1 => self.exx(),
                        2 => self.pc = self.index(idx),
                        _ => self.sp = self.index(idx),
                    }
                }
            }
            (_, 2) => {
                let nn = self.fetch16();
                if self.condition(y) {
                    self.pc = nn;
                }
            }
            (_, 3) => match y {
                0 => self.pc = self.fetch16(),
                2 => {
                    let n = self.fetch();
                    self.output(n, self.a);
                }
                3 => {
                    let n = self.fetch();
                    self.a = self.input(n);
                }
                4 => {
                    let value = self.read16(self.sp);
                    self.write16(self.sp, self.index(idx));
                    self.set_index(idx, value);
                }
                5 => {
                    let de = self.de();
                    self.set_de(self.hl());
                    self.set_hl(de);
                }
                6 => {
                    self.iff1 = false;
                    self.iff2 = false;
                }
                7 => {
                    self.iff1 = true;
                    self.iff2 = true;
                }
                _ => {}
            },
            (_, 4) => {
                let nn = self.fetch16();
                if self.condition(y) {
                    self.push(self.pc);
                    self.pc = nn;
                }
            }
            (_, 5) => {
                if q == 0 {
                    self.push(self.pair_af(p, idx));
                } else {
                    let nn = self.fetch16();
                    self.push(self.pc);
                    self.pc = nn;
                }
            }
            (_, 6) => {
                let n = self.fetch();
                self.alu(y, n);
            }
            _ => {
                self.push(self.pc);
                self.pc = u16::from(y) * 8;
            }
        }
    }

    fn exx(&mut self) {
        let (bc, de, hl) = (self.bc(), self.de(), self.hl());
        self.set_bc(self.bc1);
        self.set_de(self.de1);
        self.set_hl(self.hl1);
        self.bc1 = bc;
        self.de1 = de;
        self.hl1 = hl;
    }

    fn alu(&mut self, y: u8, value: u8) {
        let a = self.a;
        let carry = self.flag(FLAG_C);
        let f = &mut self.f;
        match y {
            0 => self.a = ALU.add(f, a, value, false),
            1 => self.a = ALU.add(f, a, value, carry),
            2 => self.a = ALU.subtract(f, a, value, false),
            3 => self.a = ALU.subtract(f, a, value, carry),
            4 => self.a = ALU.and(f, a, value),
            5 => self.a = ALU.xor(f, a, value),
            6 => self.a = ALU.or(f, a, value),
            _ => ALU.compare(f, a, value),
        }
    }

    fn rotate(&mut self, y: u8, value: u8) -> u8 {
        let carry = self.flag(FLAG_C);
        let f = &mut self.f;
        match y {
            0 => ALU.shift_left(f, value, value & 0x80 != 0),
            1 => ALU.shift_right(f, value, value & 0x01 != 0),
            2 => ALU.shift_left(f, value, carry),
            3 => ALU.shift_right(f, value, carry),
            4 => ALU.shift_left(f, value, false),
            5 => ALU.shift_right(f, value, value & 0x80 != 0),
            6 => ALU.shift_left(f, value, true),
            _ => ALU.shift_right(f, value, false),
        }
    }

    /// `rlca` through `ccf`: sign, zero and parity are left alone.
    fn accumulator_op(&mut self, y: u8) {
        let a = self.a;
        let keep = self.f & (FLAG_S | FLAG_Z | FLAG_V);
        let carry = self.f & FLAG_C;
        let (result, flags) = match y {
            0 => (a.rotate_left(1), a >> 7),
            1 => (a.rotate_right(1), a & 0x01),
            2 => ((a << 1) | carry, a >> 7),
            3 => ((a >> 1) | (carry << 7), a & 0x01),
            4 => return self.daa(),
            5 => (!a, carry | FLAG_H | FLAG_N),
            6 => (a, FLAG_C),
            _ => (a, if carry == 0 { FLAG_C } else { FLAG_H }),
        };
        self.a = result;
        self.f = keep | flags | (result & (FLAG_3 | FLAG_5));
    }

    fn daa(&mut self) {
        let a = self.a;
        let half = self.flag(FLAG_H);
        let mut carry = self.flag(FLAG_C);
        let mut fix = 0;
        if half || (a & 0x0f) > 9 {
            fix |= 0x06;
        }
        if carry || a > 0x99 {
            fix |= 0x60;
            carry = true;
        }
        let (result, half) = if self.flag(FLAG_N) {
            (a.wrapping_sub(fix), half && (a & 0x0f) < 6)
        } else {
            (a.wrapping_add(fix), (a & 0x0f) > 9)
        };
        self.a = result;
        self.f = (self.f & FLAG_N)
            | flag_if(carry, FLAG_C)
            | flag_if(half, FLAG_H)
            | flag_if(parity(result), FLAG_V);
        ALU.pass(&mut self.f, result);
    }

    fn add16(&mut self, a: u16, b: u16) -> u16 {
        let sum = u32::from(a) + u32::from(b);
        let [lo, hi, carry, _] = sum.to_le_bytes();
        let half = (a & 0x0fff) + (b & 0x0fff) > 0x0fff;
        self.f = (self.f & (FLAG_S | FLAG_Z | FLAG_V))
            | flag_if(carry != 0, FLAG_C)
            | flag_if(half, FLAG_H)
            | (hi & (FLAG_3 | FLAG_5));
        u16::from_le_bytes([lo, hi])
    }

    fn adc16(&mut self, a: u16, b: u16) -> u16 {
        let c = u32::from(self.flag(FLAG_C));
        let sum = u32::from(a) + u32::from(b) + c;
        let [lo, hi, carry, _] = sum.to_le_bytes();
        let result = u16::from_le_bytes([lo, hi]);
        let half = u32::from(a & 0x0fff) + u32::from(b & 0x0fff) + c > 0x0fff;
        let overflow = (!(a ^ b) & (a ^ result) & 0x8000) != 0;
        self.f = flag_if(carry != 0, FLAG_C)
            | flag_if(half, FLAG_H)
            | flag_if(overflow, FLAG_V)
            | flag_if(result == 0, FLAG_Z)
            | (hi & (FLAG_S | FLAG_3 | FLAG_5));
        result
    }

    fn sbc16(&mut self, a: u16, b: u16) -> u16 {
        let borrow = self.flag(FLAG_C);
        let c = i32::from(borrow);
        let diff = i32::from(a) - i32::from(b) - c;
        let result = a.wrapping_sub(b).wrapping_sub(u16::from(borrow));
        let [hi, _] = result.to_be_bytes();
        let half = i32::from(a & 0x0fff) - i32::from(b & 0x0fff) - c < 0;
        let overflow = ((a ^ b) & (a ^ result) & 0x8000) != 0;
        self.f = FLAG_N
            | flag_if(diff < 0, FLAG_C)
            | flag_if(half, FLAG_H)
            | flag_if(overflow, FLAG_V)
            | flag_if(result == 0, FLAG_Z)
            | (hi & (FLAG_S | FLAG_3 | FLAG_5));
        result
    }

    fn bit(&mut self, y: u8, value: u8, copy: u8) {
        let mut f = (self.f & FLAG_C) | FLAG_H | (copy & (FLAG_3 | FLAG_5));
        if value & (1 << y) == 0 {
            f |= FLAG_Z | FLAG_V;
        } else if y == 7 {
            f |= FLAG_S;
        }
        self.f = f;
    }

    /// `cb` table. Under an index prefix the displacement precedes the
    /// opcode and the result is also copied into register `z`.
    fn prefix_cb(&mut self, idx: Index) {
        let (loc, op) = if idx == Index::Hl {
            let op = self.fetch_opcode();
            (self.plain(op & 7), op)
        } else {
            let addr = self.indirect(idx);
            (Loc::Mem(addr), self.fetch())
        };
        let y = (op >> 3) & 7;
        let z = op & 7;
        let value = self.get(loc);
        let result = match op >> 6 {
            0 => self.rotate(y, value),
            1 => {
                let copy = match loc {
                    Loc::Mem(addr) => addr.to_be_bytes()[0],
                    _ => value,
                };
                self.bit(y, value, copy);
                return;
            }
            2 => value & !(1 << y),
            _ => value | (1 << y),
        };
        self.put(loc, result);
        if idx != Index::Hl && z != 6 {
            self.put(self.plain(z), result);
        }
    }

    fn prefix_ed(&mut self) {
        let op = self.fetch_opcode();
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = y >> 1;
        let q = y & 1;
        match (x, z) {
            (1, 0) => {
                let value = self.input(self.c);
                self.f = (self.f & FLAG_C) | flag_if(parity(value), FLAG_V);
                ALU.pass(&mut self.f, value);
                if y != 6 {
                    self.put(self.plain(y), value);
                }
            }
            (1, 1) => {
                let value = if y == 6 { 0 } else { self.get(self.plain(y)) };
                self.output(self.c, value);
            }
            (1, 2) => {
                let hl = self.hl();
                let rr = self.pair(p, Index::Hl);
                let result = if q == 0 {
                    self.sbc16(hl, rr)
                } else {
                    self.adc16(hl, rr)
                };
                self.set_hl(result);
            }
            (1, 3) => {
                let nn = self.fetch16();
                if q == 0 {
                    self.write16(nn, self.pair(p, Index::Hl));
                } else {
                    let value = self.read16(nn);
                    self.set_pair(p, Index::Hl, value);
                }
            }
            (1, 4) => {
                let a = self.a;
                self.a = ALU.subtract(&mut self.f, 0, a, false);
            }
            (1, 5) => {
                self.pc = self.pop();
                self.iff1 = self.iff2;
            }
            (1, 6) => self.im = IM_MODES[usize::from(y)],
            (1, _) => match y {
                0 => self.i = self.a,
                1 => self.r = self.a,
                2 => self.a = self.load_special(self.i),
                3 => self.a = self.load_special(self.r),
                4 => self.rotate_digit(false),
                5 => self.rotate_digit(true),
                _ => {}
            },
            (2, 0..=3) if y >= 4 => self.block(y, z),
            _ => {}
        }
    }

    /// `ld a,i` and `ld a,r` report `iff2` in the parity flag.
    fn load_special(&mut self, value: u8) -> u8 {
        self.f = (self.f & FLAG_C) | flag_if(self.iff2, FLAG_V);
        ALU.pass(&mut self.f, value)
    }

    /// `rld` when `left`, otherwise `rrd`.
    fn rotate_digit(&mut self, left: bool) {
        let addr = self.hl();
        let m = self.read(addr);
        let a = self.a;
        if left {
            self.write(addr, (m << 4) | (a & 0x0f));
            self.a = (a & 0xf0) | (m >> 4);
        } else {
            self.write(addr, (a << 4) | (m >> 4));
            self.a = (a & 0xf0) | (m & 0x0f);
        }
        let a = self.a;
        self.f = (self.f & FLAG_C) | flag_if(parity(a), FLAG_V);
        ALU.pass(&mut self.f, a);
    }

    /// Block transfer, compare and I/O. Repeating forms rewind the program
    /// counter onto themselves until done.
    fn block(&mut self, y: u8, z: u8) {
        let decrement = y & 1 == 1;
        let step = |v: u16| {
            if decrement {
                v.wrapping_sub(1)
            } else {
                v.wrapping_add(1)
            }
        };
        let hl = self.hl();
        let again = match z {
            0 => {
                let value = self.read(hl);
                self.write(self.de(), value);
                self.set_hl(step(hl));
                self.set_de(step(self.de()));
                let bc = self.bc().wrapping_sub(1);
                self.set_bc(bc);
                let n = value.wrapping_add(self.a);
                self.f = (self.f & (FLAG_S | FLAG_Z | FLAG_C))
                    | flag_if(bc != 0, FLAG_V)
                    | (n & FLAG_3)
                    | flag_if(n & 0x02 != 0, FLAG_5);
                bc != 0
            }
            1 => {
                let value = self.read(hl);
                let carry = self.f & FLAG_C;
                let a = self.a;
                let result = ALU.subtract(&mut self.f, a, value, false);
                self.set_hl(step(hl));
                let bc = self.bc().wrapping_sub(1);
                self.set_bc(bc);
                let n = result.wrapping_sub(u8::from(self.flag(FLAG_H)));
                self.f = (self.f & (FLAG_S | FLAG_Z | FLAG_H))
                    | FLAG_N
                    | carry
                    | flag_if(bc != 0, FLAG_V)
                    | (n & FLAG_3)
                    | flag_if(n & 0x02 != 0, FLAG_5);
                bc != 0 && !self.flag(FLAG_Z)
            }
            2 => {
                let value = self.input(self.c);
                self.write(hl, value);
                self.set_hl(step(hl));
                self.b = self.b.wrapping_sub(1);
                self.block_io_flags();
                self.b != 0
            }
            _ => {
                let value = self.read(hl);
                self.b = self.b.wrapping_sub(1);
                self.output(self.c, value);
                self.set_hl(step(hl));
                self.block_io_flags();
                self.b != 0
            }
        };
        if y >= 6 && again {
            self.pc = self.pc.wrapping_sub(2);
        }
    }

    fn block_io_flags(&mut self) {
        let b = self.b;
        self.f = (self.f & FLAG_C) | FLAG_N;
        ALU.pass(&mut self.f, b);
    }
}
