//! Addressable memory with bank switching and I/O port hooks.
//!
//! A [`Memory`] is a fixed-size address space. Each bank holds its own map
//! from address to backing storage: a byte of a RAM or ROM block, or a
//! [`Port`]. Switching banks changes which storage subsequent accesses see
//! without changing the visible address range. Blocks can be mapped into more
//! than one bank to model regions that do not switch.

/// Read/write hooks for memory-mapped devices.
pub mod port;

pub use port::{Latch, Port};

use std::fmt;

use crate::codec::{Decoder, Encoder, Snapshot};

/// Identifier of a storage block allocated by [`Memory::map_ram`] or
/// [`Memory::map_rom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Unmapped,
    Byte { block: usize, index: usize },
    Port(usize),
}

#[derive(Debug)]
struct Block {
    data: Box<[u8]>,
    writable: bool,
}

/// Linear address space of `size` bytes with `banks` switchable maps.
///
/// Reads of unmapped or out-of-range addresses return zero. Writes to
/// unmapped, out-of-range or ROM addresses are ignored.
pub struct Memory {
    size: usize,
    bank: usize,
    maps: Vec<Vec<Slot>>,
    blocks: Vec<Block>,
    ports: Vec<Box<dyn Port>>,
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("size", &self.size)
            .field("bank", &self.bank)
            .field("banks", &self.maps.len())
            .field("blocks", &self.blocks.len())
            .field("ports", &self.ports.len())
            .finish()
    }
}

impl Memory {
    /// Creates an unmapped address space. At least one bank is always present.
    #[must_use]
    pub fn new(size: usize, banks: usize) -> Self {
        Self {
            size,
            bank: 0,
            maps: vec![vec![Slot::Unmapped; size]; banks.max(1)],
            blocks: Vec::new(),
            ports: Vec::new(),
        }
    }

    /// Creates a single-bank space backed entirely by zeroed RAM.
    #[must_use]
    pub fn with_ram(size: usize) -> Self {
        let mut mem = Self::new(size, 1);
        mem.map_ram(0, size);
        mem
    }

    /// Size of the visible address range in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Number of banks.
    #[must_use]
    pub fn banks(&self) -> usize {
        self.maps.len()
    }

    /// Currently selected bank.
    #[must_use]
    pub const fn bank(&self) -> usize {
        self.bank
    }

    /// Selects the bank seen by subsequent accesses. Out-of-range values wrap.
    pub fn set_bank(&mut self, bank: usize) {
        self.bank = bank % self.maps.len();
    }

    /// Offset of the current bank in a flattened view of all banks.
    ///
    /// Processors add this to their program counter so breakpoints and trace
    /// addresses distinguish code in different banks.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.bank * self.size
    }

    fn map_block(&mut self, addr: usize, block: usize, len: usize) {
        let map = &mut self.maps[self.bank];
        for index in 0..len {
            if let Some(slot) = map.get_mut(addr + index) {
                *slot = Slot::Byte { block, index };
            }
        }
    }

    /// Allocates `len` bytes of zeroed RAM and maps it at `addr` in the
    /// current bank.
    pub fn map_ram(&mut self, addr: usize, len: usize) -> BlockId {
        let block = self.blocks.len();
        self.blocks.push(Block {
            data: vec![0; len].into_boxed_slice(),
            writable: true,
        });
        self.map_block(addr, block, len);
        BlockId(block)
    }

    /// Maps a read-only copy of `data` at `addr` in the current bank.
    pub fn map_rom(&mut self, addr: usize, data: &[u8]) -> BlockId {
        let block = self.blocks.len();
        self.blocks.push(Block {
            data: data.into(),
            writable: false,
        });
        self.map_block(addr, block, data.len());
        BlockId(block)
    }

    /// Maps an already allocated block at `addr` in the current bank.
    pub fn map_shared(&mut self, addr: usize, id: BlockId) {
        let len = self.blocks.get(id.0).map_or(0, |b| b.data.len());
        self.map_block(addr, id.0, len);
    }

    /// Routes reads and writes of `addr` in the current bank to `port`.
    pub fn map_port(&mut self, addr: usize, port: Box<dyn Port>) {
        let index = self.ports.len();
        self.ports.push(port);
        if let Some(slot) = self.maps[self.bank].get_mut(addr) {
            *slot = Slot::Port(index);
        }
    }

    /// Removes any mapping for `len` bytes at `addr` in the current bank.
    pub fn unmap(&mut self, addr: usize, len: usize) {
        let map = &mut self.maps[self.bank];
        for slot in map.iter_mut().skip(addr).take(len) {
            *slot = Slot::Unmapped;
        }
    }

    fn slot(&self, addr: usize) -> Slot {
        self.maps[self.bank]
            .get(addr)
            .copied()
            .unwrap_or(Slot::Unmapped)
    }

    /// Reads the byte visible at `addr`.
    #[must_use]
    pub fn read(&self, addr: usize) -> u8 {
        match self.slot(addr) {
            Slot::Unmapped => 0,
            Slot::Byte { block, index } => self.blocks[block].data[index],
            Slot::Port(port) => self.ports[port].load(),
        }
    }

    /// Writes `value` to `addr`.
    pub fn write(&mut self, addr: usize, value: u8) {
        match self.slot(addr) {
            Slot::Unmapped => {}
            Slot::Byte { block, index } => {
                let block = &mut self.blocks[block];
                if block.writable {
                    block.data[index] = value;
                }
            }
            Slot::Port(port) => self.ports[port].store(value),
        }
    }

    /// Writes `values` to consecutive addresses starting at `addr`.
    pub fn write_n(&mut self, addr: usize, values: &[u8]) {
        for (i, value) in values.iter().enumerate() {
            self.write(addr + i, *value);
        }
    }

    /// Reads `len` consecutive bytes starting at `addr`.
    #[must_use]
    pub fn read_n(&self, addr: usize, len: usize) -> Vec<u8> {
        (addr..addr + len).map(|a| self.read(a)).collect()
    }

    /// Reads a little-endian word: low byte at `addr`, high byte at `addr + 1`.
    #[must_use]
    pub fn read_le16(&self, addr: usize) -> u16 {
        u16::from_le_bytes([self.read(addr), self.read(addr + 1)])
    }

    /// Writes a little-endian word: low byte at `addr`, high byte at `addr + 1`.
    pub fn write_le16(&mut self, addr: usize, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, lo);
        self.write(addr + 1, hi);
    }
}

impl Snapshot for Memory {
    fn save(&self, enc: &mut Encoder<'_>) {
        enc.write_u32(u32::try_from(self.bank).unwrap_or(0));
        for block in self.blocks.iter().filter(|b| b.writable) {
            enc.write_bytes(&block.data);
        }
    }

    fn load(&mut self, dec: &mut Decoder<'_>) {
        let bank = dec.read_u32();
        self.set_bank(usize::try_from(bank).unwrap_or(0));
        for block in self.blocks.iter_mut().filter(|b| b.writable) {
            dec.read_bytes(&mut block.data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Latch, Memory};
    use crate::codec::{Decoder, Encoder, Snapshot};
    use proptest::prelude::*;

    #[test]
    fn unmapped_and_out_of_range_reads_are_zero() {
        let mut mem = Memory::new(0x100, 1);
        mem.write(0x10, 0xaa);
        assert_eq!(mem.read(0x10), 0);
        assert_eq!(mem.read(0x1000), 0);
        mem.write(0x1000, 0xaa);
    }

    #[test]
    fn rom_ignores_writes() {
        let mut mem = Memory::new(0x100, 1);
        mem.map_rom(0x80, &[1, 2, 3]);
        mem.write(0x81, 0xff);
        assert_eq!(mem.read_n(0x80, 3), vec![1, 2, 3]);
    }

    #[test]
    fn write_n_applies_in_address_order() {
        let mut mem = Memory::with_ram(0x100);
        mem.write_n(0x10, &[0xa9, 0x2a, 0x00]);
        assert_eq!(mem.read_n(0x10, 3), vec![0xa9, 0x2a, 0x00]);
    }

    #[test]
    fn le16_puts_low_byte_first() {
        let mut mem = Memory::with_ram(0x100);
        mem.write_le16(0x20, 0x1234);
        assert_eq!(mem.read(0x20), 0x34);
        assert_eq!(mem.read(0x21), 0x12);
    }

    #[test]
    fn bank_switch_changes_visible_storage_only() {
        let mut mem = Memory::new(0x100, 2);
        let shared = mem.map_ram(0x00, 0x80);
        mem.map_ram(0x80, 0x80);
        mem.set_bank(1);
        mem.map_shared(0x00, shared);
        mem.map_rom(0x80, &[0xee; 0x80]);

        mem.write(0x10, 0x42);
        assert_eq!(mem.read(0x90), 0xee);
        assert_eq!(mem.offset(), 0x100);

        mem.set_bank(0);
        assert_eq!(mem.read(0x10), 0x42);
        assert_eq!(mem.read(0x90), 0x00);
        assert_eq!(mem.size(), 0x100);
    }

    #[test]
    fn ports_intercept_reads_and_writes() {
        let latch = Latch::default();
        let mut mem = Memory::with_ram(0x100);
        mem.map_port(0x40, Box::new(latch.clone()));
        mem.write(0x40, 0x99);
        assert_eq!(latch.get(), 0x99);
        latch.set(0x17);
        assert_eq!(mem.read(0x40), 0x17);
    }

    #[test]
    fn unmap_restores_default_reads() {
        let mut mem = Memory::with_ram(0x100);
        mem.write(0x05, 0x55);
        mem.unmap(0x00, 0x10);
        assert_eq!(mem.read(0x05), 0);
    }

    #[test]
    fn snapshot_restores_ram_and_bank() {
        let mut mem = Memory::new(0x100, 2);
        mem.map_ram(0x00, 0x100);
        mem.set_bank(1);
        mem.map_ram(0x00, 0x100);
        mem.write(0x33, 0x77);

        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        mem.save(&mut enc);
        enc.finish().unwrap();

        let mut other = Memory::new(0x100, 2);
        other.map_ram(0x00, 0x100);
        other.set_bank(1);
        other.map_ram(0x00, 0x100);
        other.set_bank(0);

        let mut input = buf.as_slice();
        let mut dec = Decoder::new(&mut input);
        other.load(&mut dec);
        dec.finish().unwrap();

        assert_eq!(other.bank(), 1);
        assert_eq!(other.read(0x33), 0x77);
    }

    proptest! {
        #[test]
        fn le16_round_trips(addr in 0usize..0xff, value in any::<u16>()) {
            let mut mem = Memory::with_ram(0x100);
            mem.write_le16(addr, value);
            prop_assert_eq!(mem.read_le16(addr), value);
        }
    }
}
