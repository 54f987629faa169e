//! Character decoders used by memory dumps and text screens.
//!
//! A decoder maps a byte to a character and reports whether that character is
//! printable. Systems register the decoders that make sense for their
//! hardware and pick one as the default.

mod petscii;

pub use petscii::{petscii, petscii_shifted, screen, screen_shifted};

use std::collections::BTreeMap;

/// Maps a byte to a character and whether it is printable.
pub type CharDecoder = fn(u8) -> (char, bool);

/// Name of the ASCII decoder, the default for systems without their own.
pub const ASCII: &str = "ascii";

/// Decodes printable 7-bit ASCII.
#[must_use]
pub fn ascii(code: u8) -> (char, bool) {
    let ch = char::from(code);
    (ch, (0x20..0x7f).contains(&code))
}

/// Named set of decoders with a selected default.
#[derive(Debug, Clone)]
pub struct Decoders {
    table: BTreeMap<&'static str, CharDecoder>,
    default: &'static str,
}

impl Default for Decoders {
    fn default() -> Self {
        let mut decoders = Self {
            table: BTreeMap::new(),
            default: ASCII,
        };
        decoders.register(ASCII, ascii);
        decoders
    }
}

impl Decoders {
    /// Adds or replaces the decoder called `name`.
    pub fn register(&mut self, name: &'static str, decoder: CharDecoder) {
        self.table.insert(name, decoder);
    }

    /// Selects the default decoder. Unknown names leave it unchanged.
    pub fn set_default(&mut self, name: &str) -> bool {
        match self.table.get_key_value(name) {
            Some((key, _)) => {
                self.default = *key;
                true
            }
            None => false,
        }
    }

    /// Name of the default decoder.
    #[must_use]
    pub const fn default_name(&self) -> &'static str {
        self.default
    }

    /// Decoder called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<CharDecoder> {
        self.table.get(name).copied()
    }

    /// The default decoder.
    #[must_use]
    pub fn default_decoder(&self) -> CharDecoder {
        self.get(self.default).unwrap_or(ascii)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table.keys().copied()
    }
}
