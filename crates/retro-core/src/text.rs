//! Text formatting and parsing of addresses and register values.
//!
//! Hexadecimal is the default radix. Values are written with a `$` prefix,
//! decimal with `+` and binary with `%`, grouping nibbles with `.` and bytes
//! with `:`. The parsers accept every form the formatters produce, plus the
//! `0x` prefix.

use thiserror::Error;

/// Failures raised when parsing operator-supplied text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Text is not a valid address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// Text is not a valid value or does not fit the requested width.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Formats a value in hexadecimal without padding, e.g. `$f`.
#[must_use]
pub fn x(value: u32) -> String {
    format!("${value:x}")
}

/// Formats an 8-bit value in hexadecimal, e.g. `$0f`.
#[must_use]
pub fn x8(value: u8) -> String {
    format!("${value:02x}")
}

/// Formats a 16-bit value in hexadecimal, e.g. `$000f`.
#[must_use]
pub fn x16(value: u16) -> String {
    format!("${value:04x}")
}

/// Formats a value in binary without padding, e.g. `%1111`.
#[must_use]
pub fn b(value: u32) -> String {
    format!("%{value:b}")
}

/// Formats an 8-bit value in binary with a nibble separator, e.g. `%0000.1111`.
#[must_use]
pub fn b8(value: u8) -> String {
    format!("%{:04b}.{:04b}", value >> 4, value & 0x0f)
}

/// Formats a 16-bit value in binary, e.g. `%0000.0000:0000.1111`.
#[must_use]
pub fn b16(value: u16) -> String {
    let [hi, lo] = value.to_be_bytes();
    format!("{}:{}", b8(hi), &b8(lo)[1..])
}

/// Monitor display of an 8-bit value: hex, decimal and binary.
#[must_use]
pub fn format_value8(value: u8) -> String {
    format!("${value:02x} +{value} %{value:08b}")
}

/// Monitor display of a 16-bit value: hex and decimal.
#[must_use]
pub fn format_value16(value: u16) -> String {
    format!("${value:04x} +{value}")
}

/// Parses an unsigned integer that must fit in `bits` bits.
///
/// `$` and `0x` select hexadecimal, `+` selects decimal and `%` selects
/// binary. Text without a prefix is read as hexadecimal.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] for malformed text or values that
/// exceed the requested width.
pub fn parse_uint(text: &str, bits: u32) -> Result<u32, ParseError> {
    let invalid = || ParseError::InvalidValue(text.to_string());
    let (digits, radix) = if let Some(rest) = text.strip_prefix('$') {
        (rest.to_string(), 16)
    } else if let Some(rest) = text.strip_prefix("0x") {
        (rest.to_string(), 16)
    } else if let Some(rest) = text.strip_prefix('+') {
        (rest.to_string(), 10)
    } else if let Some(rest) = text.strip_prefix('%') {
        (rest.replace(['.', ':'], ""), 2)
    } else {
        (text.to_string(), 16)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(invalid());
    }
    let value = u32::from_str_radix(&digits, radix).map_err(|_| invalid())?;
    if bits < 32 && value >> bits != 0 {
        return Err(invalid());
    }
    Ok(value)
}

/// Parses an 8-bit value.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] when the text is not a value in
/// `0..=255`.
pub fn parse_value8(text: &str) -> Result<u8, ParseError> {
    parse_uint(text, 8)
        .and_then(|v| u8::try_from(v).map_err(|_| ParseError::InvalidValue(text.to_string())))
}

/// Parses a 16-bit value.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] when the text is not a value in
/// `0..=65535`.
pub fn parse_value16(text: &str) -> Result<u16, ParseError> {
    parse_uint(text, 16)
        .and_then(|v| u16::try_from(v).map_err(|_| ParseError::InvalidValue(text.to_string())))
}

/// Parses an address, which may include a bank offset above 16 bits.
///
/// # Errors
///
/// Returns [`ParseError::InvalidAddress`] for malformed text.
pub fn parse_address(text: &str) -> Result<usize, ParseError> {
    parse_uint(text, 32)
        .ok()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| ParseError::InvalidAddress(text.to_string()))
}

/// Parses a boolean switch such as `on`, `yes`, `1` or `false`.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] for any other word.
pub fn parse_bool(text: &str) -> Result<bool, ParseError> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" | "on" => Ok(true),
        "false" | "f" | "0" | "no" | "n" | "off" => Ok(false),
        _ => Err(ParseError::InvalidValue(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        b, b16, b8, format_value16, format_value8, parse_address, parse_bool, parse_uint,
        parse_value16, parse_value8, x, x16, x8, ParseError,
    };
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn formats_match_monitor_conventions() {
        assert_eq!(x(15), "$f");
        assert_eq!(x8(15), "$0f");
        assert_eq!(x16(15), "$000f");
        assert_eq!(b(15), "%1111");
        assert_eq!(b8(15), "%0000.1111");
        assert_eq!(b16(15), "%0000.0000:0000.1111");
    }

    #[test]
    fn value_display_shows_every_radix() {
        assert_eq!(format_value8(0x2a), "$2a +42 %00101010");
        assert_eq!(format_value16(0x0400), "$0400 +1024");
    }

    #[rstest]
    #[case("$ff", 255)]
    #[case("0xff", 255)]
    #[case("ff", 255)]
    #[case("+42", 42)]
    #[case("%0010.1010", 42)]
    fn parse_uint_honors_prefixes(#[case] text: &str, #[case] expected: u32) {
        assert_eq!(parse_uint(text, 8), Ok(expected));
    }

    #[rstest]
    #[case("$100")]
    #[case("+256")]
    #[case("")]
    #[case("$")]
    #[case("zz")]
    #[case("+-1")]
    fn parse_value8_rejects_bad_or_wide_input(#[case] text: &str) {
        assert_eq!(
            parse_value8(text),
            Err(ParseError::InvalidValue(text.to_string()))
        );
    }

    #[test]
    fn parse_address_reports_invalid_address() {
        assert_eq!(parse_address("$c000"), Ok(0xc000));
        assert_eq!(
            parse_address("nope"),
            Err(ParseError::InvalidAddress("nope".to_string()))
        );
    }

    #[rstest]
    #[case("true", true)]
    #[case("on", true)]
    #[case("YES", true)]
    #[case("1", true)]
    #[case("off", false)]
    #[case("no", false)]
    #[case("0", false)]
    fn parse_bool_accepts_switch_words(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(parse_bool(text), Ok(expected));
    }

    #[test]
    fn parse_bool_rejects_other_words() {
        assert!(parse_bool("maybe").is_err());
    }

    proptest! {
        #[test]
        fn eight_bit_formats_round_trip(value in any::<u8>()) {
            prop_assert_eq!(parse_value8(&x8(value)), Ok(value));
            prop_assert_eq!(parse_value8(&b8(value)), Ok(value));
            prop_assert_eq!(parse_value8(&format!("+{value}")), Ok(value));
        }

        #[test]
        fn sixteen_bit_formats_round_trip(value in any::<u16>()) {
            prop_assert_eq!(parse_value16(&x16(value)), Ok(value));
            prop_assert_eq!(parse_value16(&b16(value)), Ok(value));
            prop_assert_eq!(parse_value16(&format!("0x{value:x}")), Ok(value));
        }
    }
}
