//! Capability interfaces shared by every processor interpreter.
//!
//! The scheduler and the monitor only see processors through [`Cpu`]. Register
//! editing is a separate, optional capability ([`CpuEditor`]) that a processor
//! provides by describing its registers in static [`Accessor`] tables.

use std::fmt;

use crate::codec::Snapshot;
use crate::disasm::Lister;
use crate::error::EditError;
use crate::memory::Memory;

/// One instruction-set interpreter bound to its memory.
pub trait Cpu: Snapshot + fmt::Display + Send {
    /// Address of the next instruction.
    fn pc(&self) -> usize;
    /// Moves execution to `addr`.
    fn set_pc(&mut self, addr: usize);
    /// Bank offset added to the program counter to resolve breakpoint and
    /// trace addresses.
    fn offset(&self) -> usize {
        0
    }
    /// Executes one instruction, including all of its operand bytes.
    fn step(&mut self);
    /// Memory this processor fetches from.
    fn memory(&self) -> &Memory;
    /// Mutable access to the processor's memory.
    fn memory_mut(&mut self) -> &mut Memory;
    /// Register editing capability, when supported.
    fn editor(&self) -> Option<&dyn CpuEditor> {
        None
    }
    /// Mutable register editing capability, when supported.
    fn editor_mut(&mut self) -> Option<&mut dyn CpuEditor> {
        None
    }
    /// Disassembler entry point, when supported.
    fn lister(&self) -> Option<Lister> {
        None
    }
}

/// Typed value of a register or flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Value {
    /// 8-bit register.
    U8(u8),
    /// 16-bit register.
    U16(u16),
    /// Single flag bit.
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8(v) => f.write_str(&crate::text::format_value8(*v)),
            Self::U16(v) => f.write_str(&crate::text::format_value16(*v)),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Getter and optional setter for one named register of `C`.
///
/// The variant fixes the value type, so callers dispatch on it exhaustively.
pub enum Accessor<C> {
    /// 8-bit register.
    U8 {
        /// Reads the register.
        get: fn(&C) -> u8,
        /// Writes the register, `None` when read-only.
        put: Option<fn(&mut C, u8)>,
    },
    /// 16-bit register.
    U16 {
        /// Reads the register.
        get: fn(&C) -> u16,
        /// Writes the register, `None` when read-only.
        put: Option<fn(&mut C, u16)>,
    },
    /// Flag bit.
    Bool {
        /// Reads the flag.
        get: fn(&C) -> bool,
        /// Writes the flag, `None` when read-only.
        put: Option<fn(&mut C, bool)>,
    },
}

impl<C> Accessor<C> {
    /// Reads the current value from `cpu`.
    pub fn get(&self, cpu: &C) -> Value {
        match self {
            Self::U8 { get, .. } => Value::U8(get(cpu)),
            Self::U16 { get, .. } => Value::U16(get(cpu)),
            Self::Bool { get, .. } => Value::Bool(get(cpu)),
        }
    }

    /// Writes `value` into `cpu`, widening or narrowing integers when the
    /// value fits.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::ReadOnly`] when there is no setter and
    /// [`EditError::OutOfRange`] when the value does not fit.
    pub fn put(&self, cpu: &mut C, name: &str, value: Value) -> Result<(), EditError> {
        let out_of_range = || EditError::OutOfRange {
            name: name.to_string(),
            value: value.to_string(),
        };
        let read_only = || EditError::ReadOnly(name.to_string());
        match self {
            Self::U8 { put, .. } => {
                let put = put.ok_or_else(read_only)?;
                let v = match value {
                    Value::U8(v) => v,
                    Value::U16(v) => u8::try_from(v).map_err(|_| out_of_range())?,
                    Value::Bool(v) => u8::from(v),
                };
                put(cpu, v);
            }
            Self::U16 { put, .. } => {
                let put = put.ok_or_else(read_only)?;
                let v = match value {
                    Value::U8(v) => u16::from(v),
                    Value::U16(v) => v,
                    Value::Bool(v) => u16::from(v),
                };
                put(cpu, v);
            }
            Self::Bool { put, .. } => {
                let put = put.ok_or_else(read_only)?;
                let v = match value {
                    Value::Bool(v) => v,
                    Value::U8(0) | Value::U16(0) => false,
                    Value::U8(1) | Value::U16(1) => true,
                    Value::U8(_) | Value::U16(_) => return Err(out_of_range()),
                };
                put(cpu, v);
            }
        }
        Ok(())
    }
}

/// Named accessor table entry.
pub type Entry<C> = (&'static str, Accessor<C>);

/// Processor that describes its registers and flags with accessor tables.
///
/// Implementing this trait provides [`CpuEditor`].
pub trait Editable: Sized + 'static {
    /// Registers in display order.
    fn register_table() -> &'static [Entry<Self>];
    /// Flags in display order.
    fn flag_table() -> &'static [Entry<Self>];
}

/// External read/write access to a processor's registers and flags.
///
/// Puts from a debugger take effect between instruction steps.
pub trait CpuEditor {
    /// All registers in display order.
    fn registers(&self) -> Vec<(&'static str, Value)>;
    /// All flags in display order.
    fn flags(&self) -> Vec<(&'static str, Value)>;
    /// Reads one register.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::NoSuchRegister`] for unknown names.
    fn register(&self, name: &str) -> Result<Value, EditError>;
    /// Reads one flag.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::NoSuchFlag`] for unknown names.
    fn flag(&self, name: &str) -> Result<Value, EditError>;
    /// Writes one register.
    ///
    /// # Errors
    ///
    /// Returns an [`EditError`] for unknown, read-only or out-of-range puts.
    fn put_register(&mut self, name: &str, value: Value) -> Result<(), EditError>;
    /// Writes one flag.
    ///
    /// # Errors
    ///
    /// Returns an [`EditError`] for unknown, read-only or out-of-range puts.
    fn put_flag(&mut self, name: &str, value: Value) -> Result<(), EditError>;
}

fn find<C>(table: &'static [Entry<C>], name: &str) -> Option<&'static Accessor<C>> {
    table
        .iter()
        .find_map(|(key, accessor)| (*key == name).then_some(accessor))
}

impl<C: Editable> CpuEditor for C {
    fn registers(&self) -> Vec<(&'static str, Value)> {
        C::register_table()
            .iter()
            .map(|(name, accessor)| (*name, accessor.get(self)))
            .collect()
    }

    fn flags(&self) -> Vec<(&'static str, Value)> {
        C::flag_table()
            .iter()
            .map(|(name, accessor)| (*name, accessor.get(self)))
            .collect()
    }

    fn register(&self, name: &str) -> Result<Value, EditError> {
        find(C::register_table(), name)
            .map(|accessor| accessor.get(self))
            .ok_or_else(|| EditError::NoSuchRegister(name.to_string()))
    }

    fn flag(&self, name: &str) -> Result<Value, EditError> {
        find(C::flag_table(), name)
            .map(|accessor| accessor.get(self))
            .ok_or_else(|| EditError::NoSuchFlag(name.to_string()))
    }

    fn put_register(&mut self, name: &str, value: Value) -> Result<(), EditError> {
        let accessor = find(C::register_table(), name)
            .ok_or_else(|| EditError::NoSuchRegister(name.to_string()))?;
        accessor.put(self, name, value)
    }

    fn put_flag(&mut self, name: &str, value: Value) -> Result<(), EditError> {
        let accessor =
            find(C::flag_table(), name).ok_or_else(|| EditError::NoSuchFlag(name.to_string()))?;
        accessor.put(self, name, value)
    }
}
