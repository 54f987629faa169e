//! Operator front end for the retro-cs machine runtime.
//!
//! The [`Monitor`] evaluates debugger command lines against a shared
//! [`retro_core::Mach`]. The `retro-cs` binary wires it to a system, a run
//! loop thread and standard input.

pub mod dump;
pub mod error;
pub mod monitor;

pub use dump::dump;
pub use error::{ArgumentCount, MonitorError};
pub use monitor::{Monitor, DEFAULT_LINES};

#[cfg(test)]
use tempfile as _;
