//! Hex and character dump of a memory range.

use retro_core::{CharDecoder, Memory};

const ROW: usize = 0x10;

/// Formats `start..=end` as rows of sixteen bytes.
///
/// Each row starts at a multiple of sixteen, e.g.
/// `$0400  41 42 43 44 45 46 47 48  49 4a 4b 4c 4d 4e 4f 50  ABCDEFGHIJKLMNOP`.
/// Positions outside the range are left blank and characters the decoder
/// reports as unprintable are shown as `.`. `end` is clamped to the last
/// address of the memory.
#[must_use]
pub fn dump(mem: &Memory, start: usize, end: usize, decode: CharDecoder) -> Vec<String> {
    let mut rows = Vec::new();
    let end = end.min(mem.size().saturating_sub(1));
    if end < start {
        return rows;
    }
    let mut base = start / ROW * ROW;
    while base <= end {
        let mut hex = format!("${:04x} ", base & 0xffff);
        let mut chars = String::with_capacity(ROW);
        for addr in base..base + ROW {
            if addr < start || addr > end {
                hex.push_str("   ");
                chars.push(' ');
            } else {
                let value = mem.read(addr);
                hex.push_str(&format!(" {value:02x}"));
                let (ch, printable) = decode(value);
                chars.push(if printable { ch } else { '.' });
            }
            if addr % ROW == 7 {
                hex.push(' ');
            }
        }
        rows.push(format!("{hex}  {}", chars.trim_end()));
        base += ROW;
    }
    rows
}
