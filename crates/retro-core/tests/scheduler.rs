//! Scheduler behaviour driven through the public command surface.

use png as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use retro_core::systems::TIMER_ADDR;
use retro_core::{
    new_system, run, spawn, Cpu, Decoder, Encoder, Event, Mach, MachConfig, Memory, Mos6502,
    Processor, Snapshot, Status, System, Value,
};

fn config(rounds: u32) -> MachConfig {
    MachConfig {
        instructions_per_jiffy: rounds,
        jiffy: Duration::from_millis(1),
        ..MachConfig::default()
    }
}

fn machine(name: &str, rounds: u32) -> (Mach, Receiver<Event>) {
    let system = new_system(name).unwrap();
    let mut mach = Mach::new(system, config(rounds));
    let (tx, rx) = mpsc::channel();
    mach.set_sink(Box::new(tx));
    (mach, rx)
}

fn load(mach: &mut Mach, cpu: usize, addr: usize, program: &[u8]) {
    let p = &mut mach.system_mut().cpus_mut()[cpu];
    p.cpu.memory_mut().write_n(addr, program);
    p.cpu.set_pc(addr);
}

fn pc(mach: &Mach, cpu: usize) -> usize {
    mach.system().cpus()[cpu].cpu.pc()
}

#[test]
fn breakpoint_breaks_once_per_arrival() {
    let (mut mach, rx) = machine("mos6502", 100);
    // nop ; loop: jmp loop
    load(&mut mach, 0, 0x0200, &[0xea, 0x4c, 0x01, 0x02]);
    mach.set_breakpoint("cpu", 0x0201).unwrap();
    let ctl = mach.controller();

    ctl.start().unwrap();
    mach.jiffy();
    assert_eq!(mach.status(), Status::Break);
    assert_eq!(pc(&mach, 0), 0x0201);
    let events: Vec<Event> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![Event::Status(Status::Run), Event::Status(Status::Break)]
    );

    ctl.start().unwrap();
    mach.jiffy();
    mach.jiffy();
    assert_eq!(mach.status(), Status::Run);
    assert_eq!(pc(&mach, 0), 0x0201);
    let events: Vec<Event> = rx.try_iter().collect();
    assert_eq!(events, vec![Event::Status(Status::Run)]);
}

#[test]
fn breakpoint_aborts_the_rest_of_the_quantum() {
    let (mut mach, _rx) = machine("mos6502", 100);
    load(&mut mach, 0, 0x0200, &[0xea; 16]);
    mach.set_breakpoint("cpu", 0x0203).unwrap();
    mach.controller().start().unwrap();
    mach.jiffy();
    assert_eq!(pc(&mach, 0), 0x0203);
    // the timer only ticks after complete rounds
    assert_eq!(mach.system().cpus()[0].cpu.memory().read(TIMER_ADDR), 2);
}

#[test]
fn commands_apply_in_submission_order() {
    let (mut mach, rx) = machine("mos6502", 2);
    load(&mut mach, 0, 0x0200, &[0xea; 8]);
    let ctl = mach.controller();
    ctl.pause().unwrap();
    ctl.trace("cpu", Some(true)).unwrap();
    ctl.start().unwrap();
    mach.jiffy();

    let events: Vec<Event> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            Event::Status(Status::Pause),
            Event::Status(Status::Run),
            Event::Trace {
                processor: "cpu".into(),
                pc: 0x0200
            },
            Event::Trace {
                processor: "cpu".into(),
                pc: 0x0201
            },
        ]
    );
}

#[test]
fn tickers_step_once_per_round() {
    let (mut mach, _rx) = machine("mos6502", 7);
    load(&mut mach, 0, 0x0200, &[0xea; 16]);
    mach.controller().start().unwrap();
    mach.jiffy();
    assert_eq!(mach.system().cpus()[0].cpu.memory().read(TIMER_ADDR), 7);
}

#[test]
fn dual_system_steps_both_processors_each_round() {
    let (mut mach, _rx) = machine("dual", 3);
    load(&mut mach, 0, 0x0200, &[0xea; 8]);
    load(&mut mach, 1, 0x0000, &[0x00; 8]);
    mach.controller().start().unwrap();
    mach.jiffy();
    assert_eq!(pc(&mach, 0), 0x0203);
    assert_eq!(pc(&mach, 1), 0x0003);
}

#[test]
fn trace_all_covers_every_processor() {
    let (mut mach, rx) = machine("dual", 1);
    load(&mut mach, 0, 0x0200, &[0xea; 8]);
    let ctl = mach.controller();
    ctl.trace_all(true).unwrap();
    ctl.start().unwrap();
    mach.jiffy();
    let traced: Vec<String> = rx
        .try_iter()
        .filter_map(|e| match e {
            Event::Trace { processor, .. } => Some(processor),
            _ => None,
        })
        .collect();
    assert_eq!(traced, vec!["cpu".to_string(), "z80".to_string()]);
}

#[test]
fn export_then_import_restores_registers_and_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.bin");
    let (mut mach, rx) = machine("z80", 1);
    {
        let cpu = &mut mach.system_mut().cpus_mut()[0].cpu;
        cpu.memory_mut().write_n(0x8000, &[1, 2, 3]);
        let editor = cpu.editor_mut().unwrap();
        editor.put_register("hl", Value::U16(0xbeef)).unwrap();
        editor.put_flag("c", Value::Bool(true)).unwrap();
        cpu.set_pc(0x1234);
    }
    let ctl = mach.controller();
    ctl.export(&path).unwrap();
    mach.jiffy();
    assert!(path.exists());

    {
        let cpu = &mut mach.system_mut().cpus_mut()[0].cpu;
        cpu.memory_mut().write_n(0x8000, &[0, 0, 0]);
        cpu.editor_mut()
            .unwrap()
            .put_register("hl", Value::U16(0))
            .unwrap();
        cpu.set_pc(0);
    }
    ctl.import(&path).unwrap();
    mach.jiffy();

    let cpu = &mach.system().cpus()[0].cpu;
    assert_eq!(cpu.memory().read_n(0x8000, 3), vec![1, 2, 3]);
    assert_eq!(cpu.pc(), 0x1234);
    let editor = cpu.editor().unwrap();
    assert_eq!(editor.register("hl"), Ok(Value::U16(0xbeef)));
    assert_eq!(editor.flag("c"), Ok(Value::Bool(true)));
    assert_eq!(rx.try_iter().count(), 0);
}

#[test]
fn import_of_missing_file_reports_and_keeps_running() {
    let dir = tempfile::tempdir().unwrap();
    let (mut mach, rx) = machine("mos6502", 1);
    load(&mut mach, 0, 0x0200, &[0xea; 4]);
    let ctl = mach.controller();
    ctl.start().unwrap();
    ctl.import(dir.path().join("missing.bin")).unwrap();
    mach.jiffy();

    let events: Vec<Event> = rx.try_iter().collect();
    assert_eq!(events[0], Event::Status(Status::Run));
    match &events[1] {
        Event::Error(message) => assert!(message.starts_with("unable to import"), "{message}"),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(pc(&mach, 0), 0x0201);
}

struct Sealed {
    cpus: Vec<Processor>,
}

impl System for Sealed {
    fn name(&self) -> &str {
        "sealed"
    }

    fn cpus(&self) -> &[Processor] {
        &self.cpus
    }

    fn cpus_mut(&mut self) -> &mut [Processor] {
        &mut self.cpus
    }
}

#[test]
fn systems_without_export_report_an_error_event() {
    let system = Sealed {
        cpus: vec![Processor::new("cpu", Mos6502::new(Memory::with_ram(0x10000)))],
    };
    let mut mach = Mach::new(Box::new(system), config(1));
    let (tx, rx) = mpsc::channel();
    mach.set_sink(Box::new(tx));
    let ctl = mach.controller();
    ctl.export("never.bin").unwrap();
    ctl.import("never.bin").unwrap();
    mach.jiffy();
    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![
            Event::Error("exporting is not supported".into()),
            Event::Error("importing is not supported".into()),
        ]
    );
}

#[test]
fn snapshot_needs_a_screen() {
    let dir = tempfile::tempdir().unwrap();
    let (mut mach, rx) = machine("z80", 1);
    mach.controller().snapshot(dir.path().join("z80.png")).unwrap();
    mach.jiffy();
    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![Event::Error("no screen to snapshot".into())]
    );
}

#[test]
fn snapshot_writes_a_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("screen.png");
    let (mut mach, rx) = machine("mos6502", 1);
    mach.controller().snapshot(&path).unwrap();
    mach.jiffy();
    assert_eq!(rx.try_iter().count(), 0);
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
}

#[test]
fn run_loop_stops_on_quit() {
    let (mut mach, _rx) = machine("mos6502", 10);
    load(&mut mach, 0, 0x0200, &[0x4c, 0x00, 0x02]);
    let ctl = mach.controller();
    let mach = Arc::new(Mutex::new(mach));
    let handle = spawn(Arc::clone(&mach)).unwrap();
    ctl.start().unwrap();
    ctl.quit().unwrap();
    handle.join().unwrap().unwrap();
    assert_eq!(mach.lock().unwrap().status(), Status::Run);
}

struct CapturedLog(Mutex<Vec<String>>);

impl log::Log for CapturedLog {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        self.0.lock().unwrap().push(record.args().to_string());
    }

    fn flush(&self) {}
}

static CAPTURED: CapturedLog = CapturedLog(Mutex::new(Vec::new()));

struct Faulty {
    mem: Memory,
}

impl Snapshot for Faulty {
    fn save(&self, _enc: &mut Encoder<'_>) {}
    fn load(&mut self, _dec: &mut Decoder<'_>) {}
}

impl fmt::Display for Faulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "faulty registers pc=1234")
    }
}

impl Cpu for Faulty {
    fn pc(&self) -> usize {
        0x1234
    }

    fn set_pc(&mut self, _addr: usize) {}

    fn step(&mut self) {
        panic!("illegal state");
    }

    fn memory(&self) -> &Memory {
        &self.mem
    }

    fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }
}

#[test]
fn panic_in_run_loop_dumps_every_processor() {
    log::set_logger(&CAPTURED).unwrap();
    log::set_max_level(log::LevelFilter::Trace);

    let system = Sealed {
        cpus: vec![Processor::new(
            "faulty",
            Faulty {
                mem: Memory::with_ram(0x100),
            },
        )],
    };
    let mach = Mach::new(Box::new(system), config(1));
    mach.controller().start().unwrap();
    let mach = Mutex::new(mach);

    let result = panic::catch_unwind(AssertUnwindSafe(|| run(&mach)));
    assert!(result.is_err(), "the panic must propagate");

    let lines = CAPTURED.0.lock().unwrap().clone();
    let logged = lines.join("\n");
    assert!(
        logged.contains("[panic while executing faulty at $1234]"),
        "{logged}"
    );
    assert!(logged.contains("[panic: faulty]"), "{logged}");
    assert!(logged.contains("faulty registers pc=1234"), "{logged}");
    assert!(logged.contains("bank: 00"), "{logged}");
}
