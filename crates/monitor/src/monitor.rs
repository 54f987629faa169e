//! Line-oriented monitor commands over a shared machine.
//!
//! Inspection and editing (`cpu`, `dasm`, `mem`, `poke`, `break`) lock the
//! machine between quanta and act immediately. Run control and file
//! operations (`go`, `pause`, `trace`, `export`, `import`, `snapshot`,
//! `quit`) are queued through the machine's [`Controller`] and take effect
//! at the next quantum boundary.

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use retro_core::text::{parse_address, parse_bool, parse_value16, parse_value8, x16};
use retro_core::{Controller, Disassembler, EditError, Mach, MachError, ParseError, Value};

use crate::dump::dump;
use crate::error::{ArgumentCount, MonitorError};

/// Rows shown by `m` and lines shown by `d` when no range is given.
pub const DEFAULT_LINES: usize = 16;

const ROW: usize = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    Dasm,
    Mem,
}

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    dasm: Option<usize>,
    mem: Option<usize>,
}

fn check_len(args: &[&str], min: usize, max: usize) -> Result<(), MonitorError> {
    if args.len() < min {
        return Err(ArgumentCount::TooFew.into());
    }
    if args.len() > max {
        return Err(ArgumentCount::TooMany.into());
    }
    Ok(())
}

fn parse_lines(text: &str) -> Result<usize, MonitorError> {
    let n = usize::from(parse_value16(text)?);
    if n == 0 {
        return Err(ParseError::InvalidValue(text.to_string()).into());
    }
    Ok(n)
}

fn lock(mach: &Mutex<Mach>) -> Result<MutexGuard<'_, Mach>, MonitorError> {
    mach.lock().map_err(|_| MachError::Poisoned.into())
}

fn format_addr(addr: usize) -> String {
    x16(u16::try_from(addr & 0xffff).unwrap_or(0))
}

/// Interactive debugger front end writing its output to `W`.
pub struct Monitor<W: Write> {
    mach: Arc<Mutex<Mach>>,
    ctl: Controller,
    out: W,
    core: usize,
    cursors: Vec<Cursor>,
    encoding: String,
    mem_lines: usize,
    dasm_lines: usize,
    last: Option<Repeat>,
    quit: bool,
}

impl<W: Write> Monitor<W> {
    /// Creates a monitor on the first processor of `mach`.
    ///
    /// # Errors
    ///
    /// Returns [`MachError::Poisoned`] when the machine lock is poisoned.
    pub fn new(mach: Arc<Mutex<Mach>>, out: W) -> Result<Self, MonitorError> {
        let (ctl, cores, encoding) = {
            let m = lock(&mach)?;
            (
                m.controller(),
                m.system().cpus().len(),
                m.decoders().default_name().to_string(),
            )
        };
        Ok(Self {
            mach,
            ctl,
            out,
            core: 0,
            cursors: vec![Cursor::default(); cores],
            encoding,
            mem_lines: DEFAULT_LINES,
            dasm_lines: DEFAULT_LINES,
            last: None,
            quit: false,
        })
    }

    /// Whether a `quit` command has been evaluated.
    #[must_use]
    pub const fn quit_requested(&self) -> bool {
        self.quit
    }

    /// The output sink.
    pub const fn output(&self) -> &W {
        &self.out
    }

    /// Prompt naming the selected core when there is more than one.
    #[must_use]
    pub fn prompt(&self) -> String {
        if self.cursors.len() > 1 {
            format!("monitor:{}> ", self.core + 1)
        } else {
            "monitor> ".to_string()
        }
    }

    /// Evaluates every line of `input`, reporting failures to the output and
    /// continuing. Stops early after `quit`.
    ///
    /// # Errors
    ///
    /// Returns an error only when reading the input or writing the output
    /// fails.
    pub fn run(&mut self, input: impl BufRead) -> Result<(), MonitorError> {
        for line in input.lines() {
            let line = line?;
            if let Err(err) = self.eval(&line) {
                if let MonitorError::Io(_) = err {
                    return Err(err);
                }
                writeln!(self.out, "{err}")?;
            }
            if self.quit {
                break;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Evaluates one command line. An empty line repeats the last `d` or `m`.
    ///
    /// # Errors
    ///
    /// Returns the failure of the command; the monitor stays usable.
    pub fn eval(&mut self, line: &str) -> Result<(), MonitorError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = fields.split_first() else {
            log::trace!("repeat {:?}", self.last);
            return match self.last {
                Some(Repeat::Dasm) => self.dasm_list(&[]),
                Some(Repeat::Mem) => self.mem_dump(&[]),
                None => Ok(()),
            };
        };
        log::debug!("monitor: {line}");
        self.last = None;
        match cmd {
            "b" | "break" => self.breakpoint(args),
            "core" => self.select_core(args),
            "cpu" => self.cpu(args),
            "d" => self.dasm_list(args),
            "dasm" => self.dasm(args),
            "export" => self.file_command(args, |ctl, path| ctl.export(path)),
            "g" | "go" => self.control(args, Controller::start),
            "import" => self.file_command(args, |ctl, path| ctl.import(path)),
            "m" => self.mem_dump(args),
            "mem" => self.mem(args),
            "p" | "pause" => self.control(args, Controller::pause),
            "poke" => self.poke(args),
            "q" | "quit" => {
                self.control(args, Controller::quit)?;
                self.quit = true;
                Ok(())
            }
            "r" => {
                check_len(args, 0, 0)?;
                self.cpu(args)
            }
            "snapshot" => self.file_command(args, |ctl, path| ctl.snapshot(path)),
            "t" | "trace" => self.trace(args),
            "trace-all" => self.trace_all(args),
            other => Err(MonitorError::UnknownCommand(other.to_string())),
        }
    }

    fn control(
        &self,
        args: &[&str],
        send: fn(&Controller) -> Result<(), MachError>,
    ) -> Result<(), MonitorError> {
        check_len(args, 0, 0)?;
        send(&self.ctl)?;
        Ok(())
    }

    fn file_command(
        &self,
        args: &[&str],
        send: impl Fn(&Controller, &str) -> Result<(), MachError>,
    ) -> Result<(), MonitorError> {
        check_len(args, 1, 1)?;
        send(&self.ctl, args[0])?;
        Ok(())
    }

    fn processor_name(&self) -> Result<String, MonitorError> {
        let mach = lock(&self.mach)?;
        Ok(mach
            .system()
            .cpus()
            .get(self.core)
            .map(|p| p.name.clone())
            .unwrap_or_default())
    }

    fn breakpoint(&mut self, args: &[&str]) -> Result<(), MonitorError> {
        check_len(args, 0, 2)?;
        let name = self.processor_name()?;
        let mut mach = lock(&self.mach)?;
        match args {
            [] => {
                let lines: Vec<String> = mach
                    .breakpoints(&name)?
                    .into_iter()
                    .map(format_addr)
                    .collect();
                for line in lines {
                    writeln!(self.out, "{line}")?;
                }
            }
            ["set", addr] | [addr] => mach.set_breakpoint(&name, parse_address(addr)?)?,
            ["clear", addr] => {
                mach.clear_breakpoint(&name, parse_address(addr)?)?;
            }
            [other, _] => return Err(MonitorError::UnknownCommand((*other).to_string())),
            _ => return Err(ArgumentCount::TooMany.into()),
        }
        Ok(())
    }

    fn select_core(&mut self, args: &[&str]) -> Result<(), MonitorError> {
        check_len(args, 0, 1)?;
        let Some(arg) = args.first() else {
            let name = self.processor_name()?;
            writeln!(self.out, "{} {name}", self.core + 1)?;
            return Ok(());
        };
        let n = usize::from(parse_value8(arg)?);
        if n == 0 || n > self.cursors.len() {
            return Err(MonitorError::NoSuchCore((*arg).to_string()));
        }
        self.core = n - 1;
        Ok(())
    }

    fn cpu(&mut self, args: &[&str]) -> Result<(), MonitorError> {
        match args.split_first() {
            None => {
                let text = {
                    let mach = lock(&self.mach)?;
                    let status = mach.status();
                    let cpu = &mach.system().cpus()[self.core].cpu;
                    format!("[{status}]\n{cpu}")
                };
                writeln!(self.out, "{text}")?;
                Ok(())
            }
            Some((&"reg", rest)) => self.cpu_value(rest, false),
            Some((&"flag", rest)) => self.cpu_value(rest, true),
            Some((other, _)) => Err(MonitorError::UnknownCommand((*other).to_string())),
        }
    }

    fn cpu_value(&mut self, args: &[&str], flags: bool) -> Result<(), MonitorError> {
        check_len(args, 0, 2)?;
        let mut mach = lock(&self.mach)?;
        let cpu = &mut mach.system_mut().cpus_mut()[self.core].cpu;
        let lines: Vec<String> = match args {
            [] => {
                let editor = cpu.editor().ok_or(EditError::NoRegisters)?;
                let values = if flags {
                    editor.flags()
                } else {
                    editor.registers()
                };
                values
                    .into_iter()
                    .map(|(name, value)| format!("{name:<5}{value}"))
                    .collect()
            }
            [name] => {
                let editor = cpu.editor().ok_or(EditError::NoRegisters)?;
                let value = if flags {
                    editor.flag(name)?
                } else {
                    editor.register(name)?
                };
                vec![value.to_string()]
            }
            [name, text] => {
                let editor = cpu
                    .editor_mut()
                    .ok_or(EditError::NoRegisters)?;
                let current = if flags {
                    editor.flag(name)?
                } else {
                    editor.register(name)?
                };
                let value = match current {
                    Value::U8(_) => Value::U8(parse_value8(text)?),
                    Value::U16(_) => Value::U16(parse_value16(text)?),
                    Value::Bool(_) => Value::Bool(parse_bool(text)?),
                };
                if flags {
                    editor.put_flag(name, value)?;
                } else {
                    editor.put_register(name, value)?;
                }
                Vec::new()
            }
            _ => return Err(ArgumentCount::TooMany.into()),
        };
        drop(mach);
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }

    fn dasm(&mut self, args: &[&str]) -> Result<(), MonitorError> {
        match args.split_first() {
            Some((&"list", rest)) => self.dasm_list(rest),
            Some((&"lines", rest)) => {
                check_len(rest, 0, 1)?;
                match rest.first() {
                    None => writeln!(self.out, "{}", self.dasm_lines)?,
                    Some(text) => self.dasm_lines = parse_lines(text)?,
                }
                Ok(())
            }
            _ => self.dasm_list(args),
        }
    }

    fn dasm_list(&mut self, args: &[&str]) -> Result<(), MonitorError> {
        check_len(args, 0, 2)?;
        let start = args.first().map(|a| parse_address(a)).transpose()?;
        let end = args.get(1).map(|a| parse_address(a)).transpose()?;
        let (lines, next) = {
            let mach = lock(&self.mach)?;
            let cpu = &mach.system().cpus()[self.core].cpu;
            let lister = cpu.lister().ok_or(MonitorError::NoDisassembler)?;
            let pc = start
                .or(self.cursors[self.core].dasm)
                .unwrap_or_else(|| cpu.pc());
            let mut dasm = Disassembler::new(cpu.memory(), lister, pc);
            let stmts = match end {
                Some(end) => dasm.list_range(end),
                None => dasm.list_lines(self.dasm_lines),
            };
            let lines: Vec<String> = stmts.iter().map(ToString::to_string).collect();
            (lines, dasm.pc())
        };
        for line in lines {
            writeln!(self.out, "{line}")?;
        }
        self.cursors[self.core].dasm = Some(next);
        self.last = Some(Repeat::Dasm);
        Ok(())
    }

    fn mem(&mut self, args: &[&str]) -> Result<(), MonitorError> {
        match args.split_first() {
            Some((&"dump", rest)) => self.mem_dump(rest),
            Some((&"encoding", rest)) => self.mem_encoding(rest),
            Some((&"lines", rest)) => {
                check_len(rest, 0, 1)?;
                match rest.first() {
                    None => writeln!(self.out, "{}", self.mem_lines)?,
                    Some(text) => self.mem_lines = parse_lines(text)?,
                }
                Ok(())
            }
            _ => self.mem_dump(args),
        }
    }

    fn mem_dump(&mut self, args: &[&str]) -> Result<(), MonitorError> {
        check_len(args, 0, 2)?;
        let start = args.first().map(|a| parse_address(a)).transpose()?;
        let end = args.get(1).map(|a| parse_address(a)).transpose()?;
        let (rows, next) = {
            let mach = lock(&self.mach)?;
            let decode = mach
                .decoders()
                .get(&self.encoding)
                .ok_or_else(|| MonitorError::NoSuchEncoding(self.encoding.clone()))?;
            let cpu = &mach.system().cpus()[self.core].cpu;
            let start = start
                .or(self.cursors[self.core].mem)
                .unwrap_or_else(|| cpu.pc());
            let last = cpu.memory().size().saturating_sub(1);
            let end = end
                .unwrap_or_else(|| start.saturating_add(self.mem_lines * ROW - 1))
                .min(last);
            (dump(cpu.memory(), start, end, decode), end.saturating_add(1))
        };
        for row in rows {
            writeln!(self.out, "{row}")?;
        }
        self.cursors[self.core].mem = Some(next);
        self.last = Some(Repeat::Mem);
        Ok(())
    }

    fn mem_encoding(&mut self, args: &[&str]) -> Result<(), MonitorError> {
        check_len(args, 0, 1)?;
        let names: Vec<&'static str> = lock(&self.mach)?.decoders().names().collect();
        match args.first() {
            None => {
                for name in names {
                    let mark = if name == self.encoding { '*' } else { ' ' };
                    writeln!(self.out, "{mark} {name}")?;
                }
            }
            Some(name) => {
                if !names.contains(name) {
                    return Err(MonitorError::NoSuchEncoding((*name).to_string()));
                }
                self.encoding = (*name).to_string();
            }
        }
        Ok(())
    }

    fn poke(&self, args: &[&str]) -> Result<(), MonitorError> {
        check_len(args, 2, 0x100)?;
        let addr = parse_address(args[0])?;
        let values = args[1..]
            .iter()
            .map(|v| parse_value8(v))
            .collect::<Result<Vec<u8>, _>>()?;
        let mut mach = lock(&self.mach)?;
        mach.system_mut().cpus_mut()[self.core]
            .cpu
            .memory_mut()
            .write_n(addr, &values);
        Ok(())
    }

    fn trace(&self, args: &[&str]) -> Result<(), MonitorError> {
        check_len(args, 0, 1)?;
        let enabled = args.first().map(|v| parse_bool(v)).transpose()?;
        let name = self.processor_name()?;
        self.ctl.trace(name, enabled)?;
        Ok(())
    }

    fn trace_all(&self, args: &[&str]) -> Result<(), MonitorError> {
        check_len(args, 1, 1)?;
        self.ctl.trace_all(parse_bool(args[0])?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Monitor;
    use crate::error::MonitorError;
    use retro_core::{new_system, Mach, MachConfig, Status};
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    fn monitor(system: &str) -> (Monitor<Vec<u8>>, Arc<Mutex<Mach>>) {
        let mach = Mach::new(new_system(system).unwrap(), MachConfig::default());
        let mach = Arc::new(Mutex::new(mach));
        let mon = Monitor::new(Arc::clone(&mach), Vec::new()).unwrap();
        (mon, mach)
    }

    fn output(mon: &Monitor<Vec<u8>>) -> String {
        String::from_utf8(mon.output().clone()).unwrap()
    }

    #[test]
    fn poke_then_dump_a_row() {
        let (mut mon, _mach) = monitor("z80");
        mon.eval("poke $4000 48 49 +33").unwrap();
        mon.eval("m $4000 $400f").unwrap();
        assert_eq!(
            output(&mon),
            "$4000  48 49 21 00 00 00 00 00  00 00 00 00 00 00 00 00  HI!.............\n"
        );
    }

    #[test]
    fn empty_line_continues_the_dump() {
        let (mut mon, _mach) = monitor("z80");
        mon.eval("mem lines 1").unwrap();
        mon.eval("m 0").unwrap();
        mon.eval("").unwrap();
        let out = output(&mon);
        let rows: Vec<&str> = out.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("$0000 "));
        assert!(rows[1].starts_with("$0010 "));
    }

    #[test]
    fn dump_stops_at_the_end_of_memory() {
        let (mut mon, _mach) = monitor("z80");
        mon.eval("m $fff0 $ffffffff").unwrap();
        let out = output(&mon);
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("$fff0  00 "));
        mon.eval("").unwrap();
        assert_eq!(output(&mon).lines().count(), 1);
    }

    #[test]
    fn disassembles_from_the_program_counter() {
        let (mut mon, mach) = monitor("mos6502");
        {
            let mut m = mach.lock().unwrap();
            let cpu = &mut m.system_mut().cpus_mut()[0].cpu;
            cpu.memory_mut().write_n(0x0400, &[0xa9, 0x2a, 0x00]);
            cpu.set_pc(0x0400);
        }
        mon.eval("dasm lines 2").unwrap();
        mon.eval("d").unwrap();
        mon.eval("").unwrap();
        let out = output(&mon);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("$0400:  a9 2a"));
        assert!(lines[0].ends_with("lda #$2a"));
        assert!(lines[1].ends_with("brk"));
        assert!(lines[2].starts_with("$0403:"));
    }

    #[test]
    fn dasm_range_is_inclusive() {
        let (mut mon, mach) = monitor("z80");
        mach.lock().unwrap().system_mut().cpus_mut()[0]
            .cpu
            .memory_mut()
            .write_n(0, &[0x3e, 0x01, 0x00, 0x76]);
        mon.eval("d 0 2").unwrap();
        let out = output(&mon);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("nop"));
    }

    #[test]
    fn registers_can_be_read_and_written() {
        let (mut mon, mach) = monitor("mos6502");
        mon.eval("cpu reg a $7f").unwrap();
        mon.eval("cpu reg a").unwrap();
        mon.eval("cpu flag c true").unwrap();
        mon.eval("cpu flag c").unwrap();
        assert_eq!(output(&mon), "$7f +127 %01111111\ntrue\n");
        let m = mach.lock().unwrap();
        let editor = m.system().cpus()[0].cpu.editor().unwrap();
        assert_eq!(editor.register("a"), Ok(retro_core::Value::U8(0x7f)));
    }

    #[test]
    fn register_puts_are_range_checked() {
        let (mut mon, _mach) = monitor("mos6502");
        let err = mon.eval("cpu reg a $100").unwrap_err();
        assert_eq!(err.to_string(), "invalid value: $100");
        let err = mon.eval("cpu reg q").unwrap_err();
        assert_eq!(err.to_string(), "no such register: q");
    }

    #[test]
    fn breakpoints_are_listed_per_core() {
        let (mut mon, mach) = monitor("dual");
        mon.eval("b set $0400").unwrap();
        mon.eval("b $0300").unwrap();
        mon.eval("core 2").unwrap();
        mon.eval("b 10").unwrap();
        mon.eval("core 1").unwrap();
        mon.eval("b clear $0300").unwrap();
        mon.eval("b").unwrap();
        assert_eq!(output(&mon), "$0400\n");
        assert_eq!(mach.lock().unwrap().breakpoints("z80").unwrap(), vec![0x10]);
    }

    #[test]
    fn core_selection_changes_the_prompt() {
        let (mut mon, _mach) = monitor("dual");
        assert_eq!(mon.prompt(), "monitor:1> ");
        mon.eval("core 2").unwrap();
        assert_eq!(mon.prompt(), "monitor:2> ");
        mon.eval("core").unwrap();
        assert_eq!(output(&mon), "2 z80\n");
        assert!(matches!(
            mon.eval("core 3"),
            Err(MonitorError::NoSuchCore(_))
        ));
    }

    #[test]
    fn encodings_are_listed_with_the_current_marked() {
        let (mut mon, _mach) = monitor("mos6502");
        mon.eval("mem encoding screen").unwrap();
        mon.eval("mem encoding").unwrap();
        assert_eq!(
            output(&mon),
            "  ascii\n  petscii\n  petscii-shifted\n* screen\n  screen-shifted\n"
        );
        assert!(matches!(
            mon.eval("mem encoding ebcdic"),
            Err(MonitorError::NoSuchEncoding(_))
        ));
    }

    #[test]
    fn run_control_is_queued_until_the_next_quantum() {
        let (mut mon, mach) = monitor("mos6502");
        mon.eval("g").unwrap();
        assert_eq!(mach.lock().unwrap().status(), Status::Pause);
        mach.lock().unwrap().jiffy();
        assert_eq!(mach.lock().unwrap().status(), Status::Run);
        mon.eval("trace on").unwrap();
        mon.eval("p").unwrap();
        mach.lock().unwrap().jiffy();
        let m = mach.lock().unwrap();
        assert_eq!(m.status(), Status::Pause);
        assert!(m.tracing("cpu").unwrap());
    }

    #[test]
    fn quit_stops_a_script() {
        let (mut mon, _mach) = monitor("z80");
        mon.run("poke 0 1\nq\npoke 0 2\n".as_bytes()).unwrap();
        assert!(mon.quit_requested());
        assert_eq!(output(&mon), "");
    }

    #[test]
    fn script_errors_are_reported_and_skipped() {
        let (mut mon, _mach) = monitor("z80");
        mon.run("frobnicate\npoke\nr extra\n".as_bytes()).unwrap();
        assert_eq!(
            output(&mon),
            "unknown command: frobnicate\nnot enough arguments\ntoo many arguments\n"
        );
    }

    #[rstest]
    #[case("export")]
    #[case("import a b")]
    #[case("trace-all")]
    #[case("go now")]
    fn argument_counts_are_checked(#[case] line: &str) {
        let (mut mon, _mach) = monitor("z80");
        assert!(matches!(
            mon.eval(line),
            Err(MonitorError::InvalidArgumentCount(_))
        ));
    }
}
