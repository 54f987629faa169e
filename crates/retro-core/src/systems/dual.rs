//! A 6502 and a Z80 exchanging bytes through a shared mailbox register.
//!
//! The mailbox appears at [`MAILBOX_ADDR`] in the 6502's memory and at I/O
//! port [`MAILBOX_PORT`] on the Z80. Each processor otherwise has its own
//! 64K of RAM; the Z80 port space is RAM apart from the mailbox.

use crate::chars::{self, Decoders};
use crate::codec::{Decoder, Encoder, Snapshot};
use crate::memory::{Latch, Memory};
use crate::system::{load_processors, save_processors, Frame, Processor, System};
use crate::{Mos6502, Z80};

use super::mos6502::{commodore_decoders, render_text};

/// Mailbox address in 6502 memory.
pub const MAILBOX_ADDR: usize = 0xc000;
/// Mailbox port on the Z80.
pub const MAILBOX_PORT: usize = 0x01;

/// The `dual` system.
#[derive(Debug)]
pub struct DualSystem {
    cpus: Vec<Processor>,
    mailbox: Latch,
}

impl Default for DualSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl DualSystem {
    /// Creates the system with zeroed memories and an empty mailbox.
    #[must_use]
    pub fn new() -> Self {
        let mailbox = Latch::default();

        let mut mem = Memory::with_ram(0x10000);
        mem.map_port(MAILBOX_ADDR, Box::new(mailbox.clone()));

        let mut ports = Memory::with_ram(0x100);
        ports.map_port(MAILBOX_PORT, Box::new(mailbox.clone()));

        Self {
            cpus: vec![
                Processor::new("cpu", Mos6502::new(mem)),
                Processor::new("z80", Z80::with_ports(Memory::with_ram(0x10000), ports)),
            ],
            mailbox,
        }
    }

    /// The shared mailbox register.
    #[must_use]
    pub const fn mailbox(&self) -> &Latch {
        &self.mailbox
    }
}

impl Snapshot for DualSystem {
    fn save(&self, enc: &mut Encoder<'_>) {
        save_processors(&self.cpus, enc);
        enc.write_u8(self.mailbox.get());
    }

    fn load(&mut self, dec: &mut Decoder<'_>) {
        load_processors(&mut self.cpus, dec);
        self.mailbox.set(dec.read_u8());
    }
}

impl System for DualSystem {
    fn name(&self) -> &str {
        "dual"
    }

    fn cpus(&self) -> &[Processor] {
        &self.cpus
    }

    fn cpus_mut(&mut self) -> &mut [Processor] {
        &mut self.cpus
    }

    fn decoders(&self) -> Decoders {
        commodore_decoders()
    }

    fn saver(&self) -> Option<&dyn Snapshot> {
        Some(self)
    }

    fn loader(&mut self) -> Option<&mut dyn Snapshot> {
        Some(self)
    }

    fn frame(&self) -> Option<Frame> {
        let mem = self.cpus.first()?.cpu.memory();
        Some(render_text(mem, chars::screen))
    }
}
