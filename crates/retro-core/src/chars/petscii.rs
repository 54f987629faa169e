//! Commodore PETSCII and screen code decoders.

use super::CharDecoder;

fn graphic(code: u8) -> Option<char> {
    let ch = match code {
        0x60 | 0x63 => '─',
        0x61 => '♠',
        0x62 | 0x7d => '│',
        0x71 => '●',
        0x73 => '♥',
        0x77 => '○',
        0x78 => '♣',
        0x7a => '♦',
        0x7b => '┼',
        0x7e => 'π',
        _ => return None,
    };
    Some(ch)
}

fn common(code: u8) -> Option<char> {
    match code {
        0x20..=0x40 | 0x5b | 0x5d => Some(char::from(code)),
        0x5c => Some('£'),
        0x5e => Some('↑'),
        0x5f => Some('←'),
        0xa0 => Some('\u{a0}'),
        _ => None,
    }
}

fn printable(ch: Option<char>) -> (char, bool) {
    ch.map_or(('\0', false), |ch| (ch, true))
}

/// Decodes unshifted PETSCII: upper case letters and graphics.
#[must_use]
pub fn petscii(code: u8) -> (char, bool) {
    let ch = match code {
        0x41..=0x5a => Some(char::from(code)),
        0x60..=0x7f => graphic(code),
        0xc0..=0xdf => graphic(code - 0x60),
        0xff => Some('π'),
        _ => common(code),
    };
    printable(ch)
}

/// Decodes shifted PETSCII: lower and upper case letters.
#[must_use]
pub fn petscii_shifted(code: u8) -> (char, bool) {
    let ch = match code {
        0x41..=0x5a => Some(char::from(code + 0x20)),
        0x61..=0x7a => Some(char::from(code - 0x20)),
        0xc1..=0xda => Some(char::from(code - 0x80)),
        _ => common(code),
    };
    printable(ch)
}

fn from_screen(code: u8, decode: CharDecoder) -> (char, bool) {
    match code {
        0x5e => decode(0xff),
        0x00..=0x1f => decode(code + 0x40),
        0x40..=0x5f => decode(code + 0x20),
        0x60..=0x7f => decode(code + 0x40),
        0x80..=0x9f => decode(code - 0x80),
        0xc0..=0xdf => decode(code - 0x40),
        _ => decode(code),
    }
}

/// Decodes screen codes through the unshifted PETSCII set.
#[must_use]
pub fn screen(code: u8) -> (char, bool) {
    from_screen(code, petscii)
}

/// Decodes screen codes through the shifted PETSCII set.
#[must_use]
pub fn screen_shifted(code: u8) -> (char, bool) {
    from_screen(code, petscii_shifted)
}
