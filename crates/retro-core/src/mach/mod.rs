//! Machine runtime: the scheduler that drives a [`System`] in fixed quanta.
//!
//! Each quantum first drains the command queue, then, while running, executes
//! a fixed number of rounds in which every processor steps one instruction
//! and every ticker steps once. A processor whose program counter does not
//! move across a step is considered stuck: its trace events are suppressed
//! and a breakpoint at that address is honored only on arrival.

mod command;

pub use command::{Command, Controller};

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::api::{Event, EventSink, MachConfig, Status};
use crate::chars::Decoders;
use crate::codec::{Decoder, Encoder};
use crate::error::MachError;
use crate::system::System;

/// Whether the run loop should continue after a quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep running.
    Continue,
    /// A quit command was processed.
    Quit,
}

#[derive(Debug, Default)]
struct ProcessorState {
    tracing: bool,
    stuck: bool,
    breakpoints: BTreeSet<usize>,
}

/// Scheduler for one system.
pub struct Mach {
    system: Box<dyn System>,
    config: MachConfig,
    status: Status,
    procs: Vec<ProcessorState>,
    decoders: Decoders,
    controller: Controller,
    rx: Receiver<Command>,
    sink: Option<Box<dyn EventSink>>,
    executing: Option<usize>,
    at: usize,
    quit: bool,
}

impl std::fmt::Debug for Mach {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mach")
            .field("system", &self.system.name())
            .field("config", &self.config)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn publish(sink: &mut Option<Box<dyn EventSink>>, event: Event) {
    match sink {
        Some(sink) => sink.on_event(event),
        None => log::info!("{event:?}"),
    }
}

impl Mach {
    /// Creates a paused machine for `system`.
    #[must_use]
    pub fn new(system: Box<dyn System>, config: MachConfig) -> Self {
        let (tx, rx) = mpsc::sync_channel(config.command_capacity.max(1));
        let procs = system
            .cpus()
            .iter()
            .map(|_| ProcessorState::default())
            .collect();
        let decoders = system.decoders();
        Self {
            system,
            config,
            status: Status::Pause,
            procs,
            decoders,
            controller: Controller::new(tx),
            rx,
            sink: None,
            executing: None,
            at: 0,
            quit: false,
        }
    }

    /// Handle for enqueueing commands from other threads.
    #[must_use]
    pub fn controller(&self) -> Controller {
        self.controller.clone()
    }

    /// Routes events to `sink` instead of the log.
    pub fn set_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sink = Some(sink);
    }

    /// Scheduler configuration.
    #[must_use]
    pub const fn config(&self) -> &MachConfig {
        &self.config
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// The driven system.
    #[must_use]
    pub fn system(&self) -> &dyn System {
        self.system.as_ref()
    }

    /// Mutable access to the driven system.
    pub fn system_mut(&mut self) -> &mut dyn System {
        self.system.as_mut()
    }

    /// Character decoders offered by the system.
    #[must_use]
    pub const fn decoders(&self) -> &Decoders {
        &self.decoders
    }

    /// Mutable character decoders, e.g. to change the default.
    pub fn decoders_mut(&mut self) -> &mut Decoders {
        &mut self.decoders
    }

    /// Processor names in stepping order.
    #[must_use]
    pub fn processor_names(&self) -> Vec<String> {
        self.system.cpus().iter().map(|p| p.name.clone()).collect()
    }

    fn index_of(&self, name: &str) -> Result<usize, MachError> {
        self.system
            .cpus()
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| MachError::NoSuchProcessor(name.to_string()))
    }

    /// Adds a breakpoint at the bank-resolved address `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`MachError::NoSuchProcessor`] for an unknown name.
    pub fn set_breakpoint(&mut self, name: &str, addr: usize) -> Result<(), MachError> {
        let i = self.index_of(name)?;
        self.procs[i].breakpoints.insert(addr);
        Ok(())
    }

    /// Removes a breakpoint, returning whether it was set.
    ///
    /// # Errors
    ///
    /// Returns [`MachError::NoSuchProcessor`] for an unknown name.
    pub fn clear_breakpoint(&mut self, name: &str, addr: usize) -> Result<bool, MachError> {
        let i = self.index_of(name)?;
        Ok(self.procs[i].breakpoints.remove(&addr))
    }

    /// Breakpoints of one processor in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`MachError::NoSuchProcessor`] for an unknown name.
    pub fn breakpoints(&self, name: &str) -> Result<Vec<usize>, MachError> {
        let i = self.index_of(name)?;
        Ok(self.procs[i].breakpoints.iter().copied().collect())
    }

    /// Whether trace events are enabled for a processor.
    ///
    /// # Errors
    ///
    /// Returns [`MachError::NoSuchProcessor`] for an unknown name.
    pub fn tracing(&self, name: &str) -> Result<bool, MachError> {
        let i = self.index_of(name)?;
        Ok(self.procs[i].tracing)
    }

    /// Sets tracing for a processor, toggling when `enabled` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MachError::NoSuchProcessor`] for an unknown name.
    pub fn trace(&mut self, name: &str, enabled: Option<bool>) -> Result<(), MachError> {
        let i = self.index_of(name)?;
        let state = &mut self.procs[i];
        state.tracing = enabled.unwrap_or(!state.tracing);
        log::debug!("trace {name}: {}", state.tracing);
        Ok(())
    }

    /// Sets tracing for every processor.
    pub fn trace_all(&mut self, enabled: bool) {
        for state in &mut self.procs {
            state.tracing = enabled;
        }
        log::debug!("trace all: {enabled}");
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
        log::info!("status: {status}");
        publish(&mut self.sink, Event::Status(status));
    }

    /// Writes the system state to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MachError::ExportUnsupported`] when the system cannot save,
    /// and I/O or codec errors from writing the file.
    pub fn export(&self, path: &Path) -> Result<(), MachError> {
        let saver = self.system.saver().ok_or(MachError::ExportUnsupported)?;
        let file = File::create(path).map_err(|source| MachError::Io {
            action: "export",
            path: path.to_path_buf(),
            source,
        })?;
        let mut out = BufWriter::new(file);
        let mut enc = Encoder::new(&mut out);
        saver.save(&mut enc);
        enc.finish()?;
        out.flush().map_err(|source| MachError::Io {
            action: "export",
            path: path.to_path_buf(),
            source,
        })
    }

    /// Restores the system state from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MachError::ImportUnsupported`] when the system cannot load,
    /// and I/O or codec errors from reading the file.
    pub fn import(&mut self, path: &Path) -> Result<(), MachError> {
        let loader = self.system.loader().ok_or(MachError::ImportUnsupported)?;
        let file = File::open(path).map_err(|source| MachError::Io {
            action: "import",
            path: path.to_path_buf(),
            source,
        })?;
        let mut input = BufReader::new(file);
        let mut dec = Decoder::new(&mut input);
        loader.load(&mut dec);
        dec.finish()?;
        for state in &mut self.procs {
            state.stuck = false;
        }
        Ok(())
    }

    /// Writes the current screen to `path` as a PNG image.
    ///
    /// # Errors
    ///
    /// Returns [`MachError::NoScreen`] when the system has no screen, and
    /// I/O or image errors from writing the file.
    pub fn snapshot(&self, path: &Path) -> Result<(), MachError> {
        let frame = self.system.frame().ok_or(MachError::NoScreen)?;
        let file = File::create(path).map_err(|source| MachError::Io {
            action: "snapshot",
            path: path.to_path_buf(),
            source,
        })?;
        let mut out = BufWriter::new(file);
        frame.write_png(&mut out)?;
        out.flush().map_err(|source| MachError::Io {
            action: "snapshot",
            path: path.to_path_buf(),
            source,
        })
    }

    fn handle(&mut self, cmd: Command) {
        log::debug!("command: {cmd:?}");
        let result = match cmd {
            Command::Export(path) => self.export(&path),
            Command::Import(path) => self.import(&path),
            Command::Pause => {
                self.set_status(Status::Pause);
                Ok(())
            }
            Command::Snapshot(path) => self.snapshot(&path),
            Command::Start => {
                self.set_status(Status::Run);
                Ok(())
            }
            Command::Trace { processor, enabled } => self.trace(&processor, enabled),
            Command::TraceAll(enabled) => {
                self.trace_all(enabled);
                Ok(())
            }
            Command::Quit => {
                self.quit = true;
                Ok(())
            }
        };
        if let Err(err) = result {
            log::warn!("{err}");
            publish(&mut self.sink, Event::Error(err.to_string()));
        }
    }

    /// Runs one quantum: applies every pending command, then executes if
    /// running.
    pub fn jiffy(&mut self) -> Flow {
        loop {
            match self.rx.try_recv() {
                Ok(cmd) => self.handle(cmd),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        if self.quit {
            return Flow::Quit;
        }
        if self.status == Status::Run {
            self.execute();
        }
        Flow::Continue
    }

    fn execute(&mut self) {
        let mut hit = false;
        'rounds: for _ in 0..self.config.instructions_per_jiffy {
            let cpus = self.system.cpus_mut();
            for (i, (p, state)) in cpus.iter_mut().zip(&mut self.procs).enumerate() {
                let at = p.cpu.pc() + p.cpu.offset();
                self.executing = Some(i);
                self.at = at;
                if state.tracing && !state.stuck {
                    let event = Event::Trace {
                        processor: p.name.clone(),
                        pc: at,
                    };
                    publish(&mut self.sink, event);
                }
                p.cpu.step();
                let pc = p.cpu.pc() + p.cpu.offset();
                state.stuck = pc == at;
                if !state.stuck && state.breakpoints.contains(&pc) {
                    hit = true;
                    break 'rounds;
                }
            }
            self.executing = None;
            for ticker in self.system.tickers_mut() {
                ticker.proc.step();
            }
        }
        self.executing = None;
        if hit {
            self.set_status(Status::Break);
        }
    }

    /// Logs the state of every processor and its memory bank.
    pub fn report_crash(&self) {
        if let Some(i) = self.executing {
            let name = self.system.cpus().get(i).map_or("?", |p| p.name.as_str());
            log::error!("[panic while executing {name} at ${:04x}]", self.at);
        }
        for p in self.system.cpus() {
            log::error!("[panic: {}]\n{}", p.name, p.cpu);
            log::error!("bank: {:02x}", p.cpu.memory().bank());
        }
    }
}

fn lock(mach: &Mutex<Mach>) -> Result<MutexGuard<'_, Mach>, MachError> {
    mach.lock().map_err(|_| MachError::Poisoned)
}

/// Drives `mach` at its configured pace until a quit command.
///
/// The lock is held for one quantum at a time so other threads can inspect
/// the machine between quanta. Late quanta are not made up. A panic inside a
/// quantum dumps every processor through [`Mach::report_crash`] before it is
/// propagated.
///
/// # Errors
///
/// Returns [`MachError::Poisoned`] when another thread panicked while holding
/// the lock.
pub fn run(mach: &Mutex<Mach>) -> Result<(), MachError> {
    let jiffy = lock(mach)?.config.jiffy;
    let mut deadline = Instant::now();
    loop {
        let result = panic::catch_unwind(AssertUnwindSafe(|| lock(mach).map(|mut m| m.jiffy())));
        match result {
            Ok(Ok(Flow::Quit)) => return Ok(()),
            Ok(Ok(Flow::Continue)) => {}
            Ok(Err(err)) => return Err(err),
            Err(payload) => {
                mach.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .report_crash();
                panic::resume_unwind(payload);
            }
        }
        deadline += jiffy;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            deadline = now;
        }
    }
}

/// Runs `mach` on a new thread named `mach`.
///
/// # Errors
///
/// Returns an error when the thread cannot be created.
pub fn spawn(mach: Arc<Mutex<Mach>>) -> std::io::Result<JoinHandle<Result<(), MachError>>> {
    thread::Builder::new()
        .name("mach".into())
        .spawn(move || run(&mach))
}
