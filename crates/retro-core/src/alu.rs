//! Flag-aware arithmetic and logic shared by the interpreters.
//!
//! An [`Alu`] describes where each condition flag lives in a processor's
//! status register and which family of flag rules applies. Every primitive
//! takes the status register by mutable reference, computes its result and
//! updates only the flags that operation defines for that family.

/// Flag rule family of a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Family {
    /// MOS 6502: carry is inverted borrow, no half-carry or parity.
    Mos,
    /// Zilog Z80: carry is borrow, half-carry, subtract and parity flags.
    Zilog,
}

/// Flag layout and rules for one processor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alu {
    /// Rule family.
    pub family: Family,
    /// Carry (or borrow) flag mask.
    pub carry: u8,
    /// Zero flag mask.
    pub zero: u8,
    /// Sign (negative) flag mask.
    pub sign: u8,
    /// Overflow flag mask. On the Z80 this shares a bit with parity.
    pub overflow: u8,
    /// Half-carry flag mask, zero when absent.
    pub half: u8,
    /// Subtract flag mask, zero when absent.
    pub subtract: u8,
    /// Parity flag mask, zero when absent.
    pub parity: u8,
    /// Undocumented flag bits copied from results, zero when absent.
    pub copy: u8,
}

/// Flag layout of the MOS 6502 status register (`NV-BDIZC`).
pub const MOS6502: Alu = Alu {
    family: Family::Mos,
    carry: 0x01,
    zero: 0x02,
    sign: 0x80,
    overflow: 0x40,
    half: 0,
    subtract: 0,
    parity: 0,
    copy: 0,
};

/// Flag layout of the Z80 flag register (`SZ5H3PNC`).
pub const Z80: Alu = Alu {
    family: Family::Zilog,
    carry: 0x01,
    zero: 0x40,
    sign: 0x80,
    overflow: 0x04,
    half: 0x10,
    subtract: 0x02,
    parity: 0x04,
    copy: 0x28,
};

fn set(flags: &mut u8, mask: u8, on: bool) {
    if on {
        *flags |= mask;
    } else {
        *flags &= !mask;
    }
}

/// Returns `true` when `value` has an even number of set bits.
#[must_use]
pub const fn parity(value: u8) -> bool {
    value.count_ones() % 2 == 0
}

impl Alu {
    /// Returns `true` when the carry flag is set in `flags`.
    #[must_use]
    pub const fn carry_set(&self, flags: u8) -> bool {
        flags & self.carry != 0
    }

    fn zero_sign(&self, flags: &mut u8, value: u8) {
        set(flags, self.zero, value == 0);
        set(flags, self.sign, value & 0x80 != 0);
        if self.copy != 0 {
            *flags = (*flags & !self.copy) | (value & self.copy);
        }
    }

    /// Sets zero and sign from `value` without altering it.
    ///
    /// Used after loads and register transfers.
    pub fn pass(&self, flags: &mut u8, value: u8) -> u8 {
        self.zero_sign(flags, value);
        value
    }

    /// Binary addition of `a`, `b` and an incoming carry.
    pub fn add(&self, flags: &mut u8, a: u8, b: u8, carry_in: bool) -> u8 {
        let c = u16::from(carry_in);
        let sum = u16::from(a) + u16::from(b) + c;
        let [result, high] = sum.to_le_bytes();
        set(flags, self.carry, high != 0);
        set(flags, self.overflow, (!(a ^ b) & (a ^ result) & 0x80) != 0);
        set(flags, self.half, ((a & 0x0f) + (b & 0x0f) + u8::from(carry_in)) > 0x0f);
        set(flags, self.subtract, false);
        self.zero_sign(flags, result);
        result
    }

    /// Binary subtraction of `b` and an incoming borrow from `a`.
    ///
    /// The carry flag afterwards holds the borrow on the Z80 and its inverse
    /// on the 6502.
    pub fn subtract(&self, flags: &mut u8, a: u8, b: u8, borrow_in: bool) -> u8 {
        let diff = i16::from(a) - i16::from(b) - i16::from(borrow_in);
        let result = a.wrapping_sub(b).wrapping_sub(u8::from(borrow_in));
        let borrow = diff < 0;
        match self.family {
            Family::Mos => set(flags, self.carry, !borrow),
            Family::Zilog => set(flags, self.carry, borrow),
        }
        set(flags, self.overflow, ((a ^ b) & (a ^ result) & 0x80) != 0);
        set(
            flags,
            self.half,
            i16::from(a & 0x0f) - i16::from(b & 0x0f) - i16::from(borrow_in) < 0,
        );
        set(flags, self.subtract, true);
        self.zero_sign(flags, result);
        result
    }

    /// Compares `a` with `b` by subtraction, discarding the result.
    pub fn compare(&self, flags: &mut u8, a: u8, b: u8) {
        match self.family {
            Family::Mos => {
                let result = a.wrapping_sub(b);
                set(flags, self.carry, a >= b);
                self.zero_sign(flags, result);
            }
            Family::Zilog => {
                self.subtract(flags, a, b, false);
                *flags = (*flags & !self.copy) | (b & self.copy);
            }
        }
    }

    /// Decimal addition with NMOS 6502 flag behavior.
    ///
    /// Zero comes from the binary sum; sign and overflow come from the
    /// intermediate high nibble before the final decimal adjustment.
    pub fn add_bcd(&self, flags: &mut u8, a: u8, b: u8, carry_in: bool) -> u8 {
        let c = u8::from(carry_in);
        let binary = a.wrapping_add(b).wrapping_add(c);
        let mut lo = (a & 0x0f) + (b & 0x0f) + c;
        if lo > 0x09 {
            lo += 0x06;
        }
        let mut hi = u16::from(a >> 4) + u16::from(b >> 4) + u16::from(lo > 0x0f);
        set(flags, self.zero, binary == 0);
        set(flags, self.sign, hi & 0x08 != 0);
        let partial = u8::try_from((hi << 4) & 0xf0).unwrap_or(0);
        set(flags, self.overflow, (!(a ^ b) & (a ^ partial) & 0x80) != 0);
        if hi > 0x09 {
            hi += 0x06;
        }
        set(flags, self.carry, hi > 0x0f);
        u8::try_from((hi & 0x0f) << 4).unwrap_or(0) | (lo & 0x0f)
    }

    /// Decimal subtraction with NMOS 6502 flag behavior.
    ///
    /// All flags come from the equivalent binary subtraction; only the
    /// accumulator result is decimal adjusted.
    pub fn subtract_bcd(&self, flags: &mut u8, a: u8, b: u8, borrow_in: bool) -> u8 {
        let bin = i16::from(borrow_in);
        self.subtract(flags, a, b, borrow_in);
        let mut lo = i16::from(a & 0x0f) - i16::from(b & 0x0f) - bin;
        let mut hi = i16::from(a >> 4) - i16::from(b >> 4);
        if lo < 0 {
            lo -= 0x06;
            hi -= 1;
        }
        if hi < 0 {
            hi -= 0x06;
        }
        let [result, _] = (((hi << 4) & 0xf0) | (lo & 0x0f)).to_le_bytes();
        result
    }

    fn logic(&self, flags: &mut u8, result: u8, half: bool) -> u8 {
        if self.family == Family::Zilog {
            set(flags, self.carry, false);
            set(flags, self.half, half);
            set(flags, self.subtract, false);
            set(flags, self.parity, parity(result));
        }
        self.zero_sign(flags, result);
        result
    }

    /// Bitwise and.
    pub fn and(&self, flags: &mut u8, a: u8, b: u8) -> u8 {
        self.logic(flags, a & b, true)
    }

    /// Bitwise inclusive or.
    pub fn or(&self, flags: &mut u8, a: u8, b: u8) -> u8 {
        self.logic(flags, a | b, false)
    }

    /// Bitwise exclusive or.
    pub fn xor(&self, flags: &mut u8, a: u8, b: u8) -> u8 {
        self.logic(flags, a ^ b, false)
    }

    fn shifted(&self, flags: &mut u8, result: u8, carry_out: bool) -> u8 {
        set(flags, self.carry, carry_out);
        if self.family == Family::Zilog {
            set(flags, self.half, false);
            set(flags, self.subtract, false);
            set(flags, self.parity, parity(result));
        }
        self.zero_sign(flags, result);
        result
    }

    /// Shifts left, moving `carry_in` into bit 0 and bit 7 into carry.
    pub fn shift_left(&self, flags: &mut u8, value: u8, carry_in: bool) -> u8 {
        self.shifted(flags, (value << 1) | u8::from(carry_in), value & 0x80 != 0)
    }

    /// Shifts right, moving `carry_in` into bit 7 and bit 0 into carry.
    pub fn shift_right(&self, flags: &mut u8, value: u8, carry_in: bool) -> u8 {
        self.shifted(
            flags,
            (value >> 1) | (u8::from(carry_in) << 7),
            value & 0x01 != 0,
        )
    }

    /// Adds one. Carry is never affected.
    pub fn increment(&self, flags: &mut u8, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        if self.family == Family::Zilog {
            set(flags, self.half, value & 0x0f == 0x0f);
            set(flags, self.overflow, value == 0x7f);
            set(flags, self.subtract, false);
        }
        self.zero_sign(flags, result);
        result
    }

    /// Subtracts one. Carry is never affected.
    pub fn decrement(&self, flags: &mut u8, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        if self.family == Family::Zilog {
            set(flags, self.half, value & 0x0f == 0x00);
            set(flags, self.overflow, value == 0x80);
            set(flags, self.subtract, true);
        }
        self.zero_sign(flags, result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::{parity, MOS6502, Z80};
    use proptest::prelude::*;
    use rstest::rstest;

    const C: u8 = 0x01;
    const Z: u8 = 0x02;
    const V: u8 = 0x40;
    const N: u8 = 0x80;

    #[test]
    fn decimal_add_of_15_and_27_is_42() {
        let mut flags = 0;
        assert_eq!(MOS6502.add_bcd(&mut flags, 0x15, 0x27, false), 0x42);
        assert_eq!(flags & C, 0);
    }

    #[test]
    fn binary_add_of_15_and_27_is_3c() {
        let mut flags = 0;
        assert_eq!(MOS6502.add(&mut flags, 0x15, 0x27, false), 0x3c);
        assert_eq!(flags & C, 0);
    }

    #[rstest]
    #[case(0x58, 0x46, true, 0x05, true)]
    #[case(0x12, 0x34, false, 0x46, false)]
    #[case(0x81, 0x92, false, 0x73, true)]
    #[case(0x99, 0x01, false, 0x00, true)]
    #[case(0x09, 0x00, true, 0x10, false)]
    fn decimal_add_vectors(
        #[case] a: u8,
        #[case] b: u8,
        #[case] carry_in: bool,
        #[case] expected: u8,
        #[case] carry_out: bool,
    ) {
        let mut flags = 0;
        assert_eq!(MOS6502.add_bcd(&mut flags, a, b, carry_in), expected);
        assert_eq!(flags & C != 0, carry_out);
    }

    #[test]
    fn decimal_add_zero_flag_follows_binary_sum() {
        let mut flags = 0;
        let result = MOS6502.add_bcd(&mut flags, 0x99, 0x01, false);
        assert_eq!(result, 0x00);
        assert_eq!(flags & Z, 0, "binary 0x9a is not zero");
    }

    #[rstest]
    #[case(0x46, 0x12, false, 0x34, true)]
    #[case(0x40, 0x13, false, 0x27, true)]
    #[case(0x32, 0x02, true, 0x29, true)]
    #[case(0x12, 0x21, false, 0x91, false)]
    #[case(0x21, 0x34, false, 0x87, false)]
    fn decimal_subtract_vectors(
        #[case] a: u8,
        #[case] b: u8,
        #[case] borrow_in: bool,
        #[case] expected: u8,
        #[case] carry_out: bool,
    ) {
        let mut flags = 0;
        assert_eq!(MOS6502.subtract_bcd(&mut flags, a, b, borrow_in), expected);
        assert_eq!(flags & C != 0, carry_out);
    }

    #[test]
    fn binary_overflow_sets_v() {
        let mut flags = 0;
        assert_eq!(MOS6502.add(&mut flags, 0x50, 0x50, false), 0xa0);
        assert_eq!(flags & (V | N), V | N);
    }

    #[test]
    fn mos_subtract_sets_carry_when_no_borrow() {
        let mut flags = 0;
        assert_eq!(MOS6502.subtract(&mut flags, 0x05, 0x03, false), 0x02);
        assert_eq!(flags & C, C);
        assert_eq!(MOS6502.subtract(&mut flags, 0x03, 0x05, false), 0xfe);
        assert_eq!(flags & C, 0);
    }

    #[test]
    fn zilog_subtract_sets_carry_on_borrow_and_n() {
        let mut flags = 0;
        assert_eq!(Z80.subtract(&mut flags, 0x03, 0x05, false), 0xfe);
        assert_eq!(flags & 0x01, 0x01);
        assert_eq!(flags & 0x02, 0x02);
        assert_eq!(flags & 0x10, 0x10, "half borrow");
    }

    #[test]
    fn mos_logic_leaves_carry_alone() {
        let mut flags = C;
        assert_eq!(MOS6502.and(&mut flags, 0xf0, 0x0f), 0x00);
        assert_eq!(flags & (C | Z), C | Z);
    }

    #[test]
    fn zilog_logic_clears_carry_and_sets_parity() {
        let mut flags = 0x01;
        assert_eq!(Z80.or(&mut flags, 0x03, 0x00), 0x03);
        assert_eq!(flags & 0x01, 0);
        assert_eq!(flags & 0x04, 0x04);
        assert_eq!(Z80.and(&mut flags, 0xff, 0x01), 0x01);
        assert_eq!(flags & 0x14, 0x10, "and sets half, odd parity");
    }

    #[test]
    fn shifts_move_carry_through() {
        let mut flags = 0;
        assert_eq!(MOS6502.shift_left(&mut flags, 0x81, true), 0x03);
        assert_eq!(flags & C, C);
        assert_eq!(MOS6502.shift_right(&mut flags, 0x02, true), 0x81);
        assert_eq!(flags & (C | N), N);
    }

    #[test]
    fn increment_and_decrement_preserve_carry() {
        let mut flags = C;
        assert_eq!(MOS6502.increment(&mut flags, 0xff), 0x00);
        assert_eq!(flags & (C | Z), C | Z);
        let mut zflags = 0x01;
        assert_eq!(Z80.decrement(&mut zflags, 0x80), 0x7f);
        assert_eq!(zflags & 0x07, 0x07, "carry kept, overflow and subtract set");
    }

    #[test]
    fn pass_sets_zero_and_sign_without_changing_value() {
        let mut flags = 0;
        assert_eq!(MOS6502.pass(&mut flags, 0x80), 0x80);
        assert_eq!(flags, N);
        assert_eq!(MOS6502.pass(&mut flags, 0x00), 0x00);
        assert_eq!(flags, Z);
    }

    #[test]
    fn compare_sets_carry_when_greater_or_equal() {
        let mut flags = 0;
        MOS6502.compare(&mut flags, 0x40, 0x40);
        assert_eq!(flags & (C | Z), C | Z);
        MOS6502.compare(&mut flags, 0x3f, 0x40);
        assert_eq!(flags & (C | Z | N), N);
    }

    proptest! {
        #[test]
        fn binary_add_matches_wide_arithmetic(a in any::<u8>(), b in any::<u8>(), c in any::<bool>()) {
            let mut flags = 0;
            let result = MOS6502.add(&mut flags, a, b, c);
            let wide = u16::from(a) + u16::from(b) + u16::from(c);
            prop_assert_eq!(u16::from(result), wide & 0xff);
            prop_assert_eq!(flags & C != 0, wide > 0xff);
        }

        #[test]
        fn decimal_add_of_valid_digits_is_decimal_sum(a in 0u8..100, b in 0u8..100) {
            let mut flags = 0;
            let result = MOS6502.add_bcd(&mut flags, crate::bits::to_bcd(a), crate::bits::to_bcd(b), false);
            let sum = u16::from(a) + u16::from(b);
            prop_assert_eq!(u16::from(crate::bits::from_bcd(result)), sum % 100);
            prop_assert_eq!(flags & C != 0, sum > 99);
        }

        #[test]
        fn parity_matches_bit_count(v in any::<u8>()) {
            prop_assert_eq!(parity(v), v.count_ones() % 2 == 0);
        }
    }
}
