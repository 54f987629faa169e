//! Command messages and the cloneable handle that enqueues them.

use std::path::PathBuf;
use std::sync::mpsc::SyncSender;

use crate::error::MachError;

/// Asynchronous request to the scheduler, applied at the next quantum
/// boundary in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Command {
    /// Save system state to a file.
    Export(PathBuf),
    /// Restore system state from a file.
    Import(PathBuf),
    /// Stop executing.
    Pause,
    /// Write the screen to a PNG file.
    Snapshot(PathBuf),
    /// Start or resume executing.
    Start,
    /// Set tracing for one processor, or toggle it when `enabled` is `None`.
    Trace {
        /// Processor name.
        processor: String,
        /// New setting.
        enabled: Option<bool>,
    },
    /// Set tracing for every processor.
    TraceAll(bool),
    /// Stop the run loop.
    Quit,
}

/// Sending half of the command queue.
///
/// Sends block while the queue is full and fail once the machine is gone.
#[derive(Debug, Clone)]
pub struct Controller {
    tx: SyncSender<Command>,
}

impl Controller {
    pub(super) const fn new(tx: SyncSender<Command>) -> Self {
        Self { tx }
    }

    /// Enqueues `cmd`.
    ///
    /// # Errors
    ///
    /// Returns [`MachError::Disconnected`] when the machine has been dropped.
    pub fn send(&self, cmd: Command) -> Result<(), MachError> {
        self.tx.send(cmd).map_err(|_| MachError::Disconnected)
    }

    /// Enqueues [`Command::Start`].
    ///
    /// # Errors
    ///
    /// See [`Controller::send`].
    pub fn start(&self) -> Result<(), MachError> {
        self.send(Command::Start)
    }

    /// Enqueues [`Command::Pause`].
    ///
    /// # Errors
    ///
    /// See [`Controller::send`].
    pub fn pause(&self) -> Result<(), MachError> {
        self.send(Command::Pause)
    }

    /// Enqueues [`Command::Quit`].
    ///
    /// # Errors
    ///
    /// See [`Controller::send`].
    pub fn quit(&self) -> Result<(), MachError> {
        self.send(Command::Quit)
    }

    /// Enqueues [`Command::Trace`].
    ///
    /// # Errors
    ///
    /// See [`Controller::send`].
    pub fn trace(&self, processor: impl Into<String>, enabled: Option<bool>) -> Result<(), MachError> {
        self.send(Command::Trace {
            processor: processor.into(),
            enabled,
        })
    }

    /// Enqueues [`Command::TraceAll`].
    ///
    /// # Errors
    ///
    /// See [`Controller::send`].
    pub fn trace_all(&self, enabled: bool) -> Result<(), MachError> {
        self.send(Command::TraceAll(enabled))
    }

    /// Enqueues [`Command::Export`].
    ///
    /// # Errors
    ///
    /// See [`Controller::send`].
    pub fn export(&self, path: impl Into<PathBuf>) -> Result<(), MachError> {
        self.send(Command::Export(path.into()))
    }

    /// Enqueues [`Command::Import`].
    ///
    /// # Errors
    ///
    /// See [`Controller::send`].
    pub fn import(&self, path: impl Into<PathBuf>) -> Result<(), MachError> {
        self.send(Command::Import(path.into()))
    }

    /// Enqueues [`Command::Snapshot`].
    ///
    /// # Errors
    ///
    /// See [`Controller::send`].
    pub fn snapshot(&self, path: impl Into<PathBuf>) -> Result<(), MachError> {
        self.send(Command::Snapshot(path.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, Controller};
    use crate::error::MachError;
    use std::sync::mpsc;

    #[test]
    fn helpers_enqueue_in_order() {
        let (tx, rx) = mpsc::sync_channel(8);
        let ctl = Controller::new(tx);
        ctl.pause().unwrap();
        ctl.trace("cpu", Some(true)).unwrap();
        ctl.start().unwrap();
        let got: Vec<Command> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                Command::Pause,
                Command::Trace {
                    processor: "cpu".into(),
                    enabled: Some(true)
                },
                Command::Start,
            ]
        );
    }

    #[test]
    fn send_fails_after_receiver_drops() {
        let (tx, rx) = mpsc::sync_channel(1);
        drop(rx);
        let err = Controller::new(tx).quit().unwrap_err();
        assert!(matches!(err, MachError::Disconnected));
    }
}
