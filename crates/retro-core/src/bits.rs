//! Bit manipulation and binary-coded decimal helpers.

use crate::text::ParseError;

/// Converts a binary value to packed BCD.
///
/// Values above 99 keep only their last two decimal digits, so
/// `to_bcd(112) == 0x12`.
#[must_use]
pub const fn to_bcd(value: u8) -> u8 {
    let tens = (value / 10) % 10;
    let ones = value % 10;
    (tens << 4) | ones
}

/// Converts a packed BCD value to binary.
#[must_use]
pub const fn from_bcd(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0f)
}

/// Extracts bits `lo..=hi` of `value`, shifted down to bit zero.
///
/// An empty range (`hi < lo`) or a range starting past bit 7 yields 0.
#[must_use]
pub const fn slice_bits(value: u8, lo: u32, hi: u32) -> u8 {
    if hi < lo {
        return 0;
    }
    let Some(shifted) = value.checked_shr(lo) else {
        return 0;
    };
    let mask = match 1u8.checked_shl(hi - lo + 1) {
        Some(bit) => bit - 1,
        None => 0xff,
    };
    shifted & mask
}

/// Gathers a two-bit pixel from a nibble-interleaved bit plane byte.
///
/// Bit `offset` becomes bit 0 and bit `offset + 4` becomes bit 1. Bits past
/// bit 7 read as 0.
#[must_use]
pub const fn bit_plane4(value: u8, offset: u32) -> u8 {
    (bit(value, offset.saturating_add(4)) << 1) | bit(value, offset)
}

const fn bit(value: u8, n: u32) -> u8 {
    match value.checked_shr(n) {
        Some(v) => v & 1,
        None => 0,
    }
}

/// Parses a string of binary digits, such as `"00111000"`.
///
/// # Errors
///
/// Returns [`ParseError`] when the text is empty, wider than eight digits
/// or contains anything other than `0` and `1`.
pub fn parse_bits(text: &str) -> Result<u8, ParseError> {
    u8::from_str_radix(text, 2).map_err(|_| ParseError::InvalidValue(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{bit_plane4, from_bcd, parse_bits, slice_bits, to_bcd};
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn bcd_conversions_match_decimal_digits() {
        assert_eq!(to_bcd(42), 0x42);
        assert_eq!(from_bcd(0x42), 42);
    }

    #[test]
    fn to_bcd_truncates_hundreds() {
        assert_eq!(to_bcd(112), 0x12);
        assert_eq!(to_bcd(255), 0x55);
    }

    #[rstest]
    #[case::high_one(6, 7, "11000000", "011")]
    #[case::high_zero(6, 7, "00111111", "000")]
    #[case::middle_one(3, 5, "00111000", "111")]
    #[case::middle_zero(3, 5, "11000111", "000")]
    #[case::low_one(0, 2, "00000111", "111")]
    #[case::low_zero(0, 2, "11111000", "000")]
    fn slice_bits_extracts_inclusive_range(
        #[case] lo: u32,
        #[case] hi: u32,
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let value = parse_bits(input).unwrap();
        assert_eq!(slice_bits(value, lo, hi), parse_bits(expected).unwrap());
    }

    #[rstest]
    #[case(0, "00010001")]
    #[case(1, "00100010")]
    #[case(2, "01000100")]
    #[case(3, "10001000")]
    fn bit_plane4_pairs_nibble_bits(#[case] offset: u32, #[case] input: &str) {
        assert_eq!(bit_plane4(parse_bits(input).unwrap(), offset), 0b11);
    }

    #[rstest]
    #[case::reversed(0xff, 5, 3, 0)]
    #[case::past_the_byte(0xff, 8, 9, 0)]
    #[case::wide_top(0xf0, 4, 31, 0x0f)]
    fn slice_bits_out_of_range_is_zero_filled(
        #[case] value: u8,
        #[case] lo: u32,
        #[case] hi: u32,
        #[case] expected: u8,
    ) {
        assert_eq!(slice_bits(value, lo, hi), expected);
    }

    #[test]
    fn bit_plane4_past_the_byte_reads_zero() {
        assert_eq!(bit_plane4(0xff, 4), 0b01);
        assert_eq!(bit_plane4(0xff, 8), 0);
        assert_eq!(bit_plane4(0xff, u32::MAX), 0);
    }

    #[test]
    fn parse_bits_rejects_non_binary_digits() {
        assert!(parse_bits("0012").is_err());
        assert!(parse_bits("").is_err());
        assert!(parse_bits("111111111").is_err());
    }

    proptest! {
        #[test]
        fn bcd_round_trips_below_one_hundred(value in 0u8..100) {
            prop_assert_eq!(from_bcd(to_bcd(value)), value);
        }

        #[test]
        fn full_slice_is_identity(value in any::<u8>()) {
            prop_assert_eq!(slice_bits(value, 0, 7), value);
        }
    }
}
