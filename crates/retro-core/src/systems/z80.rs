//! Single Z80 with 64K of RAM and a RAM-backed port space.

use crate::codec::{Decoder, Encoder, Snapshot};
use crate::memory::Memory;
use crate::system::{load_processors, save_processors, Processor, System};
use crate::Z80;

const PORTS: usize = 0x100;

/// The `z80` system.
#[derive(Debug)]
pub struct Z80System {
    cpus: Vec<Processor>,
}

impl Default for Z80System {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80System {
    /// Creates the system with zeroed RAM and ports.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cpus: vec![Processor::new(
                "cpu",
                Z80::with_ports(Memory::with_ram(0x10000), Memory::with_ram(PORTS)),
            )],
        }
    }
}

impl Snapshot for Z80System {
    fn save(&self, enc: &mut Encoder<'_>) {
        save_processors(&self.cpus, enc);
    }

    fn load(&mut self, dec: &mut Decoder<'_>) {
        load_processors(&mut self.cpus, dec);
    }
}

impl System for Z80System {
    fn name(&self) -> &str {
        "z80"
    }

    fn cpus(&self) -> &[Processor] {
        &self.cpus
    }

    fn cpus_mut(&mut self) -> &mut [Processor] {
        &mut self.cpus
    }

    fn saver(&self) -> Option<&dyn Snapshot> {
        Some(self)
    }

    fn loader(&mut self) -> Option<&mut dyn Snapshot> {
        Some(self)
    }
}
