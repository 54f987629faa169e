//! Errors reported to the operator for a single monitor command.

use std::io;

use retro_core::{EditError, MachError, ParseError};
use thiserror::Error;

/// Argument count outside what a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArgumentCount {
    /// Fewer arguments than required.
    #[error("not enough arguments")]
    TooFew,
    /// More arguments than accepted.
    #[error("too many arguments")]
    TooMany,
}

/// Failure of one monitor command. The monitor stays usable afterwards.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The first word is not a command, or a subcommand is unknown.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// Wrong number of arguments.
    #[error(transparent)]
    InvalidArgumentCount(#[from] ArgumentCount),
    /// No decoder with this name is registered.
    #[error("no such encoding: {0}")]
    NoSuchEncoding(String),
    /// Core numbers start at one and stop at the processor count.
    #[error("invalid core: {0}")]
    NoSuchCore(String),
    /// The selected processor has no disassembler.
    #[error("cannot disassemble this processor")]
    NoDisassembler,
    /// An address or value could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A register or flag access failed.
    #[error(transparent)]
    Edit(#[from] EditError),
    /// The machine rejected the request.
    #[error(transparent)]
    Mach(#[from] MachError),
    /// Writing monitor output failed.
    #[error("output: {0}")]
    Io(#[from] io::Error),
}
