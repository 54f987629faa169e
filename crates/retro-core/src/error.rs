//! Error taxonomy for the machine runtime.
//!
//! Scheduler-level failures are reported as [`MachError`] and converted into
//! [`crate::Event::Error`] inside a quantum. Register editing and snapshot
//! decoding have their own narrower error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the scheduler and its command handlers.
#[derive(Debug, Error)]
pub enum MachError {
    /// The system has no state export capability.
    #[error("exporting is not supported")]
    ExportUnsupported,
    /// The system has no state import capability.
    #[error("importing is not supported")]
    ImportUnsupported,
    /// The system does not produce a framebuffer.
    #[error("no screen to snapshot")]
    NoScreen,
    /// A command named a processor the system does not have.
    #[error("no such processor: {0}")]
    NoSuchProcessor(String),
    /// File I/O failed while exporting, importing or capturing.
    #[error("unable to {action} {}: {source}", path.display())]
    Io {
        /// Operation that was being performed.
        action: &'static str,
        /// File the operation targeted.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Snapshot encoding or decoding failed.
    #[error("snapshot: {0}")]
    Codec(#[from] CodecError),
    /// Framebuffer could not be written as an image.
    #[error("unable to encode image: {0}")]
    Image(#[from] png::EncodingError),
    /// The command queue has no receiving machine.
    #[error("machine is not running")]
    Disconnected,
    /// The machine lock was poisoned by a panic in another thread.
    #[error("machine state is poisoned")]
    Poisoned,
}

/// Failures raised by the snapshot encoder and decoder.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Reading or writing the underlying stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// A boolean field held a byte other than 0 or 1.
    #[error("invalid boolean value: {0:#04x}")]
    InvalidBool(u8),
    /// A string field did not hold valid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
    /// A length did not fit the 32-bit length prefix.
    #[error("length {0} does not fit in a length prefix")]
    LengthOverflow(usize),
}

/// Failures raised by external register and flag access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The processor does not expose registers for editing.
    #[error("no registers")]
    NoRegisters,
    /// No register with the given name exists.
    #[error("no such register: {0}")]
    NoSuchRegister(String),
    /// No flag with the given name exists.
    #[error("no such flag: {0}")]
    NoSuchFlag(String),
    /// The register or flag can be read but not written.
    #[error("{0} is read-only")]
    ReadOnly(String),
    /// The value does not fit the width of the register.
    #[error("value {value} out of range for {name}")]
    OutOfRange {
        /// Register or flag name.
        name: String,
        /// Rejected value as displayed.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::{CodecError, EditError, MachError};
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn unsupported_capability_messages_are_descriptive() {
        assert_eq!(
            MachError::ExportUnsupported.to_string(),
            "exporting is not supported"
        );
        assert_eq!(
            MachError::ImportUnsupported.to_string(),
            "importing is not supported"
        );
        assert_eq!(EditError::NoRegisters.to_string(), "no registers");
    }

    #[test]
    fn io_error_names_action_and_path() {
        let err = MachError::Io {
            action: "export",
            path: PathBuf::from("state.bin"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "unable to export state.bin: denied");
    }

    #[test]
    fn codec_errors_convert_into_mach_errors() {
        let err: MachError = CodecError::InvalidBool(7).into();
        assert_eq!(err.to_string(), "snapshot: invalid boolean value: 0x07");
    }
}
