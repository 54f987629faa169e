//! Demo systems selectable by name.

mod dual;
mod mos6502;
mod z80;

pub use dual::{DualSystem, MAILBOX_ADDR, MAILBOX_PORT};
pub use mos6502::{Mos6502System, Timer, SCREEN_ADDR, SCREEN_COLS, SCREEN_ROWS, TIMER_ADDR};
pub use z80::Z80System;

use crate::system::System;

/// Names accepted by [`new_system`], in sorted order.
pub const NAMES: [&str; 3] = ["dual", "mos6502", "z80"];

/// Builds the system called `name`.
#[must_use]
pub fn new_system(name: &str) -> Option<Box<dyn System>> {
    let system: Box<dyn System> = match name {
        "dual" => Box::new(DualSystem::new()),
        "mos6502" => Box::new(Mos6502System::new()),
        "z80" => Box::new(Z80System::new()),
        _ => return None,
    };
    Some(system)
}
