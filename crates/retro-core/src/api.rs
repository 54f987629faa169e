//! Host-facing configuration, status and event types of the machine runtime.

use std::sync::mpsc;
use std::time::Duration;

/// Default wall-clock length of one scheduling quantum (60 Hz).
pub const JIFFY: Duration = Duration::from_micros(16_670);

/// Default instruction rounds executed per quantum.
pub const INSTRUCTIONS_PER_JIFFY: u32 = 20_000;

/// Default capacity of the command queue.
pub const COMMAND_CAPACITY: usize = 64;

/// Scheduler pacing and queue sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachConfig {
    /// Wall-clock length of one quantum.
    pub jiffy: Duration,
    /// Rounds of one instruction per processor executed each quantum.
    pub instructions_per_jiffy: u32,
    /// Pending commands accepted before senders block.
    pub command_capacity: usize,
}

impl Default for MachConfig {
    fn default() -> Self {
        Self {
            jiffy: JIFFY,
            instructions_per_jiffy: INSTRUCTIONS_PER_JIFFY,
            command_capacity: COMMAND_CAPACITY,
        }
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Status {
    /// Not executing; waiting for a start command.
    #[default]
    Pause,
    /// Executing quanta.
    Run,
    /// Stopped by a breakpoint.
    Break,
}

impl Status {
    /// Lower-case name used in event output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Run => "run",
            Self::Break => "break",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification published by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Event {
    /// Status changed.
    Status(Status),
    /// A traced processor is about to execute the instruction at `pc`.
    Trace {
        /// Processor name.
        processor: String,
        /// Bank-resolved program counter.
        pc: usize,
    },
    /// A command failed without stopping the scheduler.
    Error(String),
}

/// Observer of scheduler events.
pub trait EventSink: Send {
    /// Receives one event in publication order.
    fn on_event(&mut self, event: Event);
}

impl EventSink for mpsc::Sender<Event> {
    fn on_event(&mut self, event: Event) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(event);
    }
}

impl EventSink for Vec<Event> {
    fn on_event(&mut self, event: Event) {
        self.push(event);
    }
}
