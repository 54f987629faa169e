//! Headless driver for the retro-cs machine runtime.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use log::{LevelFilter, Log, Metadata, Record};
use monitor::{Monitor, MonitorError};
use retro_core::text::parse_address;
use retro_core::{new_system, spawn, Event, Mach, MachConfig, MachError};
use thiserror as _;
#[cfg(test)]
use {rstest as _, tempfile as _};

const USAGE_TEXT: &str = "\
Usage: retro-cs [options]

Options:
  -s <system>        System to run: dual, mos6502, z80 (default: mos6502)
  -i <file>          Import a saved state before starting
  -l <addr>:<file>   Load a raw binary at addr and start there
  -x <file>          Evaluate a monitor script at start
  -m                 Read monitor commands from standard input
  -t                 Trace every processor
  -w                 Wait paused instead of starting
  -v, --verbose      Log debug messages to stderr
  -h, --help         Show this help message

Examples:
  retro-cs -s z80 -l 0:hello.bin
  retro-cs -w -m < session.txt
";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Load {
    addr: usize,
    path: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    system: String,
    import: Option<PathBuf>,
    load: Option<Load>,
    script: Option<PathBuf>,
    monitor: bool,
    trace: bool,
    wait: bool,
    verbose: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            system: "mos6502".to_string(),
            import: None,
            load: None,
            script: None,
            monitor: false,
            trace: false,
            wait: false,
            verbose: false,
        }
    }
}

#[derive(Debug)]
enum ParseResult {
    Run(Args),
    Help,
}

fn parse_load(text: &str) -> Result<Load, String> {
    let (addr, path) = text
        .split_once(':')
        .ok_or_else(|| format!("expected addr:file, got {text}"))?;
    if path.is_empty() {
        return Err(format!("expected addr:file, got {text}"));
    }
    let addr = parse_address(addr).map_err(|e| e.to_string())?;
    Ok(Load {
        addr,
        path: PathBuf::from(path),
    })
}

#[allow(clippy::while_let_on_iterator)]
fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        let arg = arg.to_string_lossy().to_string();
        let mut value = |flag: &str| {
            args.next()
                .map(|v| v.to_string_lossy().to_string())
                .ok_or_else(|| format!("missing value for {flag}"))
        };
        match arg.as_str() {
            "-h" | "--help" => return Ok(ParseResult::Help),
            "-s" => parsed.system = value("-s")?,
            "-i" => parsed.import = Some(PathBuf::from(value("-i")?)),
            "-l" => parsed.load = Some(parse_load(&value("-l")?)?),
            "-x" => parsed.script = Some(PathBuf::from(value("-x")?)),
            "-m" => parsed.monitor = true,
            "-t" => parsed.trace = true,
            "-w" => parsed.wait = true,
            "-v" | "--verbose" => parsed.verbose = true,
            other => return Err(format!("unknown option: {other}")),
        }
    }
    Ok(ParseResult::Run(parsed))
}

struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("{} [{}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if log::set_boxed_logger(Box::new(StderrLogger { level })).is_ok() {
        log::set_max_level(level);
    }
}

fn format_event(event: &Event) -> String {
    match event {
        Event::Status(status) => format!("status: {status}"),
        Event::Trace { processor, pc } => format!("trace {processor} ${pc:04x}"),
        Event::Error(message) => format!("error: {message}"),
    }
}

fn load_binary(mach: &Mutex<Mach>, load: &Load) -> Result<(), String> {
    let bytes = fs::read(&load.path).map_err(|source| {
        MachError::Io {
            action: "load",
            path: load.path.clone(),
            source,
        }
        .to_string()
    })?;
    let mut mach = mach.lock().map_err(|_| MachError::Poisoned.to_string())?;
    let cpu = &mut mach
        .system_mut()
        .cpus_mut()
        .first_mut()
        .ok_or_else(|| "system has no processors".to_string())?
        .cpu;
    cpu.memory_mut().write_n(load.addr, &bytes);
    cpu.set_pc(load.addr);
    Ok(())
}

fn run(args: &Args) -> Result<(), String> {
    let system = new_system(&args.system).ok_or_else(|| format!("no such system: {}", args.system))?;
    let (tx, rx) = mpsc::channel();
    let mut mach = Mach::new(system, MachConfig::default());
    mach.set_sink(Box::new(tx));
    let ctl = mach.controller();
    let mach = Arc::new(Mutex::new(mach));

    let printer = thread::Builder::new()
        .name("events".to_string())
        .spawn(move || {
            for event in rx {
                println!("{}", format_event(&event));
            }
        })
        .map_err(|e| e.to_string())?;

    if let Some(load) = &args.load {
        load_binary(&mach, load)?;
    }
    if let Some(path) = &args.import {
        ctl.import(path.clone()).map_err(|e| e.to_string())?;
    }
    if args.trace {
        ctl.trace_all(true).map_err(|e| e.to_string())?;
    }
    if !args.wait {
        ctl.start().map_err(|e| e.to_string())?;
    }

    let runner = spawn(Arc::clone(&mach)).map_err(|e| e.to_string())?;
    let mut monitor = Monitor::new(Arc::clone(&mach), io::stdout()).map_err(|e| e.to_string())?;
    if let Some(path) = &args.script {
        let file = fs::File::open(path).map_err(|source| {
            MachError::Io {
                action: "read",
                path: path.clone(),
                source,
            }
            .to_string()
        })?;
        monitor
            .run(BufReader::new(file))
            .map_err(|e: MonitorError| e.to_string())?;
    }
    if args.monitor && !monitor.quit_requested() {
        monitor.run(io::stdin().lock()).map_err(|e| e.to_string())?;
        if !monitor.quit_requested() {
            ctl.quit().map_err(|e| e.to_string())?;
        }
    }
    drop(monitor);
    drop(ctl);

    let result = runner
        .join()
        .map_err(|_| "machine thread panicked".to_string())?;
    // The sink lives inside the machine; dropping it closes the channel.
    drop(mach);
    printer
        .join()
        .map_err(|_| "event printer panicked".to_string())?;
    result.map_err(|e| e.to_string())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Run(args)) => {
            init_logging(args.verbose);
            match run(&args) {
                Ok(()) => 0,
                Err(error) => {
                    eprintln!("error: {error}");
                    1
                }
            }
        }
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}
