//! Single 6502 with a timer register and a 40x25 text screen.

use crate::chars::{self, Decoders};
use crate::codec::{Decoder, Encoder, Snapshot};
use crate::memory::{Latch, Memory};
use crate::system::{load_processors, save_processors, Frame, Proc, Processor, System, Ticker};
use crate::Mos6502;

/// Start of screen memory, one screen code per cell.
pub const SCREEN_ADDR: usize = 0x0400;
/// Text columns.
pub const SCREEN_COLS: usize = 40;
/// Text rows.
pub const SCREEN_ROWS: usize = 25;
/// Address of the timer register.
pub const TIMER_ADDR: usize = 0xdc04;

const CELL: u32 = 8;
const BACKGROUND: [u8; 3] = [0x40, 0x31, 0x8d];
const FOREGROUND: [u8; 3] = [0x7b, 0x71, 0xd5];

/// Ticker that counts instruction rounds into a shared register.
#[derive(Debug, Clone, Default)]
pub struct Timer(pub Latch);

impl Proc for Timer {
    fn step(&mut self) {
        self.0.increment();
    }
}

/// The `mos6502` system.
#[derive(Debug)]
pub struct Mos6502System {
    cpus: Vec<Processor>,
    tickers: Vec<Ticker>,
    timer: Latch,
}

impl Default for Mos6502System {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502System {
    /// Creates the system with zeroed RAM and the timer at zero.
    #[must_use]
    pub fn new() -> Self {
        let timer = Latch::default();
        let mut mem = Memory::with_ram(0x10000);
        mem.map_port(TIMER_ADDR, Box::new(timer.clone()));
        Self {
            cpus: vec![Processor::new("cpu", Mos6502::new(mem))],
            tickers: vec![Ticker::new("timer", Timer(timer.clone()))],
            timer,
        }
    }

    /// The timer register.
    #[must_use]
    pub const fn timer(&self) -> &Latch {
        &self.timer
    }
}

/// Draws each printable, non-blank cell of a text screen as a solid block.
pub(super) fn render_text(mem: &Memory, decode: chars::CharDecoder) -> Frame {
    let width = u32::try_from(SCREEN_COLS).unwrap_or(0) * CELL;
    let height = u32::try_from(SCREEN_ROWS).unwrap_or(0) * CELL;
    let mut frame = Frame::new(width, height);
    for y in 0..height {
        for x in 0..width {
            frame.set(x, y, BACKGROUND);
        }
    }
    for (i, code) in mem
        .read_n(SCREEN_ADDR, SCREEN_COLS * SCREEN_ROWS)
        .into_iter()
        .enumerate()
    {
        let (ch, printable) = decode(code);
        if !printable || ch == ' ' {
            continue;
        }
        let col = u32::try_from(i % SCREEN_COLS).unwrap_or(0);
        let row = u32::try_from(i / SCREEN_COLS).unwrap_or(0);
        for dy in 1..CELL - 1 {
            for dx in 1..CELL - 1 {
                frame.set(col * CELL + dx, row * CELL + dy, FOREGROUND);
            }
        }
    }
    frame
}

pub(super) fn commodore_decoders() -> Decoders {
    let mut decoders = Decoders::default();
    decoders.register("petscii", chars::petscii);
    decoders.register("petscii-shifted", chars::petscii_shifted);
    decoders.register("screen", chars::screen);
    decoders.register("screen-shifted", chars::screen_shifted);
    decoders.set_default("petscii");
    decoders
}

impl Snapshot for Mos6502System {
    fn save(&self, enc: &mut Encoder<'_>) {
        save_processors(&self.cpus, enc);
        enc.write_u8(self.timer.get());
    }

    fn load(&mut self, dec: &mut Decoder<'_>) {
        load_processors(&mut self.cpus, dec);
        self.timer.set(dec.read_u8());
    }
}

impl System for Mos6502System {
    fn name(&self) -> &str {
        "mos6502"
    }

    fn cpus(&self) -> &[Processor] {
        &self.cpus
    }

    fn cpus_mut(&mut self) -> &mut [Processor] {
        &mut self.cpus
    }

    fn tickers_mut(&mut self) -> &mut [Ticker] {
        &mut self.tickers
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

#[cfg(test)]
mod tests {
    use super::{Mos6502System, BACKGROUND, FOREGROUND, SCREEN_ADDR, TIMER_ADDR};
    use crate::system::System;

    #[test]
    fn timer_ticks_once_per_step() {
        let mut system = Mos6502System::new();
        for ticker in system.tickers_mut() {
            ticker.proc.step();
            ticker.proc.step();
        }
        assert_eq!(system.cpus()[0].cpu.memory().read(TIMER_ADDR), 2);
    }

    #[test]
    fn program_can_reset_the_timer() {
        let mut system = Mos6502System::new();
        system.timer().set(9);
        system.cpus_mut()[0].cpu.memory_mut().write(TIMER_ADDR, 0);
        assert_eq!(system.timer().get(), 0);
    }

    #[test]
    fn frame_draws_non_blank_cells() {
        let mut system = Mos6502System::new();
        let mem = system.cpus_mut()[0].cpu.memory_mut();
        for i in 0..1000 {
            mem.write(SCREEN_ADDR + i, 0x20);
        }
        mem.write(SCREEN_ADDR + 1, 0x01);
        let frame = system.frame().unwrap();
        assert_eq!((frame.width, frame.height), (320, 200));
        let px = |x: usize, y: usize| {
            let i = (y * 320 + x) * 4;
            [frame.pixels[i], frame.pixels[i + 1], frame.pixels[i + 2]]
        };
        assert_eq!(px(3, 3), BACKGROUND);
        assert_eq!(px(11, 3), FOREGROUND);
        assert_eq!(px(8, 0), BACKGROUND);
    }

    #[test]
    fn petscii_is_the_default_encoding() {
        let system = Mos6502System::new();
        assert_eq!(system.decoders().default_name(), "petscii");
    }
}
