//! Disassembly of instruction streams in memory.
//!
//! Each architecture supplies a [`Lister`] that decodes one instruction
//! through an [`Eval`] cursor. The [`Disassembler`] walks memory with it
//! without touching processor state, so listings are lazy and can be
//! restarted from any address.

use std::fmt;

use crate::memory::Memory;
use crate::text::x16;

/// Decodes the instruction at the cursor of `eval`.
pub type Lister = fn(&mut Eval<'_>) -> Statement;

/// Read cursor used by a [`Lister`] to fetch instruction bytes.
#[derive(Debug)]
pub struct Eval<'a> {
    mem: &'a Memory,
    start: usize,
    pc: usize,
    bytes: Vec<u8>,
}

impl<'a> Eval<'a> {
    /// Creates a cursor at `addr`.
    #[must_use]
    pub const fn new(mem: &'a Memory, addr: usize) -> Self {
        Self {
            mem,
            start: addr,
            pc: addr,
            bytes: Vec::new(),
        }
    }

    /// Address of the instruction being decoded.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Address of the next byte to fetch.
    #[must_use]
    pub const fn pc(&self) -> usize {
        self.pc
    }

    /// Fetches the next byte and records it in the statement.
    pub fn fetch(&mut self) -> u8 {
        let value = self.mem.read(self.pc);
        self.pc += 1;
        self.bytes.push(value);
        value
    }

    /// Reads the next byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> u8 {
        self.mem.read(self.pc)
    }

    /// Fetches a little-endian word.
    pub fn fetch16(&mut self) -> u16 {
        let lo = self.fetch();
        let hi = self.fetch();
        u16::from_le_bytes([lo, hi])
    }

    /// Completes the statement with its mnemonic and operand text.
    #[must_use]
    pub fn finish(&mut self, op: impl Into<String>, operands: impl Into<String>) -> Statement {
        Statement {
            addr: self.start,
            bytes: std::mem::take(&mut self.bytes),
            op: op.into(),
            operands: operands.into(),
        }
    }
}

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Statement {
    /// Address of the first byte.
    pub addr: usize,
    /// Raw instruction bytes, prefixes included.
    pub bytes: Vec<u8>,
    /// Mnemonic, or a `?xx` placeholder for undefined opcodes.
    pub op: String,
    /// Operand text, empty when there are none.
    pub operands: String,
}

impl Statement {
    /// Address of the instruction that follows this one.
    #[must_use]
    pub fn next_addr(&self) -> usize {
        self.addr + self.bytes.len()
    }

    /// Mnemonic and operands as one instruction string.
    #[must_use]
    pub fn instruction(&self) -> String {
        if self.operands.is_empty() {
            self.op.clone()
        } else {
            format!("{} {}", self.op, self.operands)
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self
            .bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ");
        let addr = u16::try_from(self.addr & 0xffff).unwrap_or(0);
        write!(f, "{}:  {bytes:<11}  {}", x16(addr), self.instruction())
    }
}

/// Restartable cursor producing disassembled statements from memory.
#[derive(Debug)]
pub struct Disassembler<'a> {
    mem: &'a Memory,
    pc: usize,
    lister: Lister,
}

impl<'a> Disassembler<'a> {
    /// Creates a disassembler positioned at `pc`.
    #[must_use]
    pub const fn new(mem: &'a Memory, lister: Lister, pc: usize) -> Self {
        Self { mem, pc, lister }
    }

    /// Address of the next statement.
    #[must_use]
    pub const fn pc(&self) -> usize {
        self.pc
    }

    /// Moves the cursor to `addr`.
    pub fn set_pc(&mut self, addr: usize) {
        self.pc = addr;
    }

    /// Decodes the statement at the cursor and advances past it.
    pub fn next_statement(&mut self) -> Statement {
        let mut eval = Eval::new(self.mem, self.pc);
        let stmt = (self.lister)(&mut eval);
        self.pc = stmt.next_addr().max(self.pc + 1);
        stmt
    }

    /// Decodes `count` statements.
    pub fn list_lines(&mut self, count: usize) -> Vec<Statement> {
        (0..count).map(|_| self.next_statement()).collect()
    }

    /// Decodes statements until the cursor passes `end`.
    ///
    /// Every statement starting at or before `end` is listed, including one
    /// whose bytes run past it.
    pub fn list_range(&mut self, end: usize) -> Vec<Statement> {
        let mut lines = Vec::new();
        while self.pc <= end {
            lines.push(self.next_statement());
        }
        lines
    }
}

impl Iterator for Disassembler<'_> {
    type Item = Statement;

    fn next(&mut self) -> Option<Statement> {
        Some(self.next_statement())
    }
}
