//! Virtual machine runtime for 8-bit microcomputers.
//!
//! Interpreters for the MOS 6502 and Z80 run against a banked [`Memory`]
//! and are driven in fixed quanta by the [`Mach`] scheduler, which also
//! handles breakpoints, tracing, and state export and import.

/// Flag-aware arithmetic shared by the interpreters.
pub mod alu;

/// Asynchronous host-facing types: configuration, status and events.
pub mod api;
pub use api::{
    Event, EventSink, MachConfig, Status, COMMAND_CAPACITY, INSTRUCTIONS_PER_JIFFY, JIFFY,
};

/// BCD and bit slicing helpers.
pub mod bits;

/// Character decoders for dumps and text screens.
pub mod chars;
pub use chars::{CharDecoder, Decoders};

/// Sequential binary snapshot codec.
pub mod codec;
pub use codec::{Decoder, Encoder, Snapshot};

/// Processor capability traits and register accessors.
pub mod cpu;
pub use cpu::{Accessor, Cpu, CpuEditor, Editable, Value};

/// Instruction listing over memory.
pub mod disasm;
pub use disasm::{Disassembler, Eval, Lister, Statement};

/// Error types.
pub mod error;
pub use error::{CodecError, EditError, MachError};

/// MOS 6502 interpreter and disassembler.
pub mod m6502;
pub use m6502::Mos6502;

/// Scheduler and command queue.
pub mod mach;
pub use mach::{run, spawn, Command, Controller, Flow, Mach};

/// Banked address space and I/O ports.
pub mod memory;
pub use memory::{BlockId, Latch, Memory, Port};

/// The machine description consumed by the scheduler.
pub mod system;
pub use system::{Frame, Proc, Processor, System, Ticker};

/// Demo systems.
pub mod systems;
pub use systems::new_system;

/// Address and value formatting and parsing.
pub mod text;
pub use text::ParseError;

/// Zilog Z80 interpreter and disassembler.
pub mod z80;
pub use z80::Z80;

#[cfg(test)]
use tempfile as _;
