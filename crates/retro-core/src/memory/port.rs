use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Device register mapped into a [`crate::Memory`] address.
///
/// Loads take `&self` so that disassembly and memory dumps can read through
/// a shared borrow; ports with side effects use interior mutability.
pub trait Port: Send {
    /// Value returned by a read of the mapped address.
    fn load(&self) -> u8;
    /// Handles a write to the mapped address.
    fn store(&mut self, value: u8);
}

/// Single shared byte register.
///
/// Clones refer to the same byte, which lets two memories, or a memory and a
/// ticker, communicate through one mapped address.
#[derive(Debug, Clone, Default)]
pub struct Latch(Arc<AtomicU8>);

impl Latch {
    /// Current value.
    #[must_use]
    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    /// Replaces the value.
    pub fn set(&self, value: u8) {
        self.0.store(value, Ordering::Relaxed);
    }

    /// Adds one, wrapping at 256.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

impl Port for Latch {
    fn load(&self) -> u8 {
        self.get()
    }

    fn store(&mut self, value: u8) {
        self.set(value);
    }
}
