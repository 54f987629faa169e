//! Sequential binary codec for machine state snapshots.
//!
//! A snapshot is a flat stream of fixed-width little-endian fields whose order
//! is defined entirely by the save routine of each component. There is no
//! embedded schema. Errors are sticky: once an operation fails every later
//! operation is a no-op, and the failure is reported by `finish`.

use std::io::{Read, Write};

use crate::error::CodecError;

/// Component whose state can be written to and restored from a snapshot.
pub trait Snapshot {
    /// Appends this component's fields to the stream.
    fn save(&self, enc: &mut Encoder<'_>);
    /// Restores this component's fields, in the same order `save` wrote them.
    fn load(&mut self, dec: &mut Decoder<'_>);
}

/// Writes primitive fields to a byte stream.
pub struct Encoder<'a> {
    out: &'a mut dyn Write,
    err: Option<CodecError>,
}

impl<'a> Encoder<'a> {
    /// Creates an encoder writing to `out`.
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out, err: None }
    }

    fn put(&mut self, bytes: &[u8]) {
        if self.err.is_some() {
            return;
        }
        if let Err(e) = self.out.write_all(bytes) {
            self.err = Some(CodecError::Io(e));
        }
    }

    /// Returns the first error encountered, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&CodecError> {
        self.err.as_ref()
    }

    /// Writes a boolean as a single `0` or `1` byte.
    pub fn write_bool(&mut self, value: bool) {
        self.put(&[u8::from(value)]);
    }

    /// Writes an unsigned byte.
    pub fn write_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    /// Writes an unsigned 16-bit integer.
    pub fn write_u16(&mut self, value: u16) {
        self.put(&value.to_le_bytes());
    }

    /// Writes an unsigned 32-bit integer.
    pub fn write_u32(&mut self, value: u32) {
        self.put(&value.to_le_bytes());
    }

    /// Writes an unsigned 64-bit integer.
    pub fn write_u64(&mut self, value: u64) {
        self.put(&value.to_le_bytes());
    }

    /// Writes a signed byte.
    pub fn write_i8(&mut self, value: i8) {
        self.put(&value.to_le_bytes());
    }

    /// Writes a signed 16-bit integer.
    pub fn write_i16(&mut self, value: i16) {
        self.put(&value.to_le_bytes());
    }

    /// Writes a signed 32-bit integer.
    pub fn write_i32(&mut self, value: i32) {
        self.put(&value.to_le_bytes());
    }

    /// Writes a signed 64-bit integer.
    pub fn write_i64(&mut self, value: i64) {
        self.put(&value.to_le_bytes());
    }

    /// Writes a string as a `u32` byte length followed by UTF-8 bytes.
    pub fn write_str(&mut self, value: &str) {
        let Ok(len) = u32::try_from(value.len()) else {
            if self.err.is_none() {
                self.err = Some(CodecError::LengthOverflow(value.len()));
            }
            return;
        };
        self.write_u32(len);
        self.put(value.as_bytes());
    }

    /// Writes raw bytes with no length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.put(value);
    }

    /// Flushes the stream and reports the first error encountered.
    ///
    /// # Errors
    ///
    /// Returns the sticky [`CodecError`] or a flush failure.
    pub fn finish(mut self) -> Result<(), CodecError> {
        if let Some(err) = self.err.take() {
            return Err(err);
        }
        self.out.flush().map_err(CodecError::Io)
    }
}

/// Reads primitive fields from a byte stream.
///
/// After an error every read returns a zero value.
pub struct Decoder<'a> {
    input: &'a mut dyn Read,
    err: Option<CodecError>,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder reading from `input`.
    pub fn new(input: &'a mut dyn Read) -> Self {
        Self { input, err: None }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut buf = [0; N];
        self.fill(&mut buf);
        buf
    }

    fn fill(&mut self, buf: &mut [u8]) {
        if self.err.is_some() {
            buf.fill(0);
            return;
        }
        if let Err(e) = self.input.read_exact(buf) {
            buf.fill(0);
            self.err = Some(CodecError::Io(e));
        }
    }

    /// Returns the first error encountered, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&CodecError> {
        self.err.as_ref()
    }

    /// Reads a boolean written by [`Encoder::write_bool`].
    pub fn read_bool(&mut self) -> bool {
        let [byte] = self.take::<1>();
        match byte {
            0 => false,
            1 => true,
            other => {
                if self.err.is_none() {
                    self.err = Some(CodecError::InvalidBool(other));
                }
                false
            }
        }
    }

    /// Reads an unsigned byte.
    pub fn read_u8(&mut self) -> u8 {
        u8::from_le_bytes(self.take())
    }

    /// Reads an unsigned 16-bit integer.
    pub fn read_u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    /// Reads an unsigned 32-bit integer.
    pub fn read_u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    /// Reads an unsigned 64-bit integer.
    pub fn read_u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    /// Reads a signed byte.
    pub fn read_i8(&mut self) -> i8 {
        i8::from_le_bytes(self.take())
    }

    /// Reads a signed 16-bit integer.
    pub fn read_i16(&mut self) -> i16 {
        i16::from_le_bytes(self.take())
    }

    /// Reads a signed 32-bit integer.
    pub fn read_i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    /// Reads a signed 64-bit integer.
    pub fn read_i64(&mut self) -> i64 {
        i64::from_le_bytes(self.take())
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> String {
        let len = self.read_u32();
        if self.err.is_some() {
            return String::new();
        }
        let mut bytes = Vec::new();
        let limit = u64::from(len);
        let mut reader = (&mut *self.input).take(limit);
        match reader.read_to_end(&mut bytes) {
            Ok(n) if u64::try_from(n).ok() == Some(limit) => {}
            Ok(_) => {
                self.err = Some(CodecError::Io(std::io::ErrorKind::UnexpectedEof.into()));
                return String::new();
            }
            Err(e) => {
                self.err = Some(CodecError::Io(e));
                return String::new();
            }
        }
        String::from_utf8(bytes).unwrap_or_else(|_| {
            self.err = Some(CodecError::InvalidUtf8);
            String::new()
        })
    }

    /// Fills `buf` with raw bytes.
    pub fn read_bytes(&mut self, buf: &mut [u8]) {
        self.fill(buf);
    }

    /// Reports the first error encountered.
    ///
    /// # Errors
    ///
    /// Returns the sticky [`CodecError`].
    pub fn finish(mut self) -> Result<(), CodecError> {
        self.err.take().map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::{Decoder, Encoder};
    use crate::error::CodecError;
    use proptest::prelude::*;

    #[test]
    fn fields_are_little_endian_and_fixed_width() {
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.write_u16(0x1234);
        enc.write_bool(true);
        enc.write_i8(-2);
        enc.write_str("ok");
        enc.finish().unwrap();

        assert_eq!(buf, [0x34, 0x12, 0x01, 0xfe, 0x02, 0, 0, 0, b'o', b'k']);
    }

    #[test]
    fn decoding_mixed_fields_restores_values_in_order() {
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        enc.write_u8(7);
        enc.write_i32(-100_000);
        enc.write_u64(u64::MAX - 1);
        enc.write_str("c64");
        enc.write_bytes(&[1, 2, 3]);
        enc.write_bool(false);
        enc.finish().unwrap();

        let mut input = buf.as_slice();
        let mut dec = Decoder::new(&mut input);
        assert_eq!(dec.read_u8(), 7);
        assert_eq!(dec.read_i32(), -100_000);
        assert_eq!(dec.read_u64(), u64::MAX - 1);
        assert_eq!(dec.read_string(), "c64");
        let mut raw = [0; 3];
        dec.read_bytes(&mut raw);
        assert_eq!(raw, [1, 2, 3]);
        assert!(!dec.read_bool());
        dec.finish().unwrap();
    }

    #[test]
    fn short_stream_error_sticks_and_later_reads_are_zero() {
        let mut input: &[u8] = &[0x01];
        let mut dec = Decoder::new(&mut input);
        assert_eq!(dec.read_u16(), 0);
        assert!(dec.error().is_some());
        assert_eq!(dec.read_u8(), 0);
        assert!(matches!(dec.finish(), Err(CodecError::Io(_))));
    }

    #[test]
    fn invalid_bool_is_reported_at_finish() {
        let mut input: &[u8] = &[0x02, 0x05];
        let mut dec = Decoder::new(&mut input);
        assert!(!dec.read_bool());
        assert_eq!(dec.read_u8(), 0);
        assert!(matches!(dec.finish(), Err(CodecError::InvalidBool(2))));
    }

    #[test]
    fn invalid_utf8_string_is_rejected() {
        let mut input: &[u8] = &[0x01, 0, 0, 0, 0xff];
        let mut dec = Decoder::new(&mut input);
        assert_eq!(dec.read_string(), "");
        assert!(matches!(dec.finish(), Err(CodecError::InvalidUtf8)));
    }

    proptest! {
        #[test]
        fn integers_and_strings_round_trip(
            a in any::<u16>(),
            b in any::<i64>(),
            s in ".{0,16}",
        ) {
            let mut buf = Vec::new();
            let mut enc = Encoder::new(&mut buf);
            enc.write_u16(a);
            enc.write_i64(b);
            enc.write_str(&s);
            enc.finish().unwrap();

            let mut input = buf.as_slice();
            let mut dec = Decoder::new(&mut input);
            prop_assert_eq!(dec.read_u16(), a);
            prop_assert_eq!(dec.read_i64(), b);
            prop_assert_eq!(dec.read_string(), s);
            prop_assert!(dec.finish().is_ok());
        }
    }
}
