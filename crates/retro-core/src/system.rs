//! Concrete machine description consumed by the scheduler.
//!
//! A [`System`] owns its processors and auxiliary tickers. Save/load and
//! screen capture are optional capabilities a system opts into by overriding
//! the default methods.

use std::io::Write;

use crate::chars::Decoders;
use crate::codec::{Decoder, Encoder, Snapshot};
use crate::cpu::Cpu;
use crate::error::MachError;

/// Auxiliary component stepped once per instruction round.
pub trait Proc: Send {
    /// Advances the component by one step.
    fn step(&mut self);
}

/// Named processor of a system.
pub struct Processor {
    /// Name used by trace, breakpoint and monitor commands.
    pub name: String,
    /// The interpreter.
    pub cpu: Box<dyn Cpu>,
}

impl Processor {
    /// Wraps `cpu` under `name`.
    pub fn new(name: impl Into<String>, cpu: impl Cpu + 'static) -> Self {
        Self {
            name: name.into(),
            cpu: Box::new(cpu),
        }
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("name", &self.name)
            .field("pc", &self.cpu.pc())
            .finish_non_exhaustive()
    }
}

/// Named auxiliary component.
pub struct Ticker {
    /// Component name.
    pub name: String,
    /// The component.
    pub proc: Box<dyn Proc>,
}

impl Ticker {
    /// Wraps `proc` under `name`.
    pub fn new(name: impl Into<String>, proc: impl Proc + 'static) -> Self {
        Self {
            name: name.into(),
            proc: Box::new(proc),
        }
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// RGBA framebuffer captured for a screen snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA bytes, four per pixel.
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Creates an opaque black frame.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = usize::try_from(u64::from(width) * u64::from(height) * 4).unwrap_or(0);
        let mut pixels = vec![0; len];
        pixels.chunks_exact_mut(4).for_each(|px| px[3] = 0xff);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Sets the pixel at `(x, y)` to an RGB color. Out of range is ignored.
    pub fn set(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let Ok(i) = usize::try_from((u64::from(y) * u64::from(self.width) + u64::from(x)) * 4)
        else {
            return;
        };
        if let Some(px) = self.pixels.get_mut(i..i + 3) {
            px.copy_from_slice(&rgb);
        }
    }

    /// Encodes the frame as a PNG image.
    ///
    /// # Errors
    ///
    /// Returns [`MachError::Image`] when the encoder rejects the data or the
    /// writer fails.
    pub fn write_png(&self, out: impl Write) -> Result<(), MachError> {
        let mut encoder = png::Encoder::new(out, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pixels)?;
        writer.finish()?;
        Ok(())
    }
}

/// A machine: its processors, tickers and optional capabilities.
pub trait System: Send {
    /// System name, as accepted by [`crate::systems::new_system`].
    fn name(&self) -> &str;

    /// Processors in stepping order.
    fn cpus(&self) -> &[Processor];

    /// Mutable processors in stepping order.
    fn cpus_mut(&mut self) -> &mut [Processor];

    /// Auxiliary components stepped after each round of instructions.
    fn tickers_mut(&mut self) -> &mut [Ticker] {
        &mut []
    }

    /// Character decoders offered for memory dumps.
    fn decoders(&self) -> Decoders {
        Decoders::default()
    }

    /// State export capability.
    fn saver(&self) -> Option<&dyn Snapshot> {
        None
    }

    /// State import capability.
    fn loader(&mut self) -> Option<&mut dyn Snapshot> {
        None
    }

    /// Current screen contents, when the system has one.
    fn frame(&self) -> Option<Frame> {
        None
    }
}

/// Saves every processor in order. Used by systems whose whole state lives
/// in their processors and memories.
pub fn save_processors(cpus: &[Processor], enc: &mut Encoder<'_>) {
    for p in cpus {
        p.cpu.save(enc);
    }
}

/// Loads every processor in the order written by [`save_processors`].
pub fn load_processors(cpus: &mut [Processor], dec: &mut Decoder<'_>) {
    for p in cpus {
        p.cpu.load(dec);
    }
}
