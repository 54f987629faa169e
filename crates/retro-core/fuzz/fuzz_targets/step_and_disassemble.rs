#![no_main]

use libfuzzer_sys::fuzz_target;
use retro_core::{Cpu, Disassembler, Memory, Mos6502, Z80};

const STEPS: usize = 64;
const LINES: usize = 32;

fn exercise(cpu: &mut dyn Cpu, data: &[u8]) {
    cpu.memory_mut().write_n(0, data);
    cpu.set_pc(0);
    for _ in 0..STEPS {
        cpu.step();
    }
    let _ = cpu.to_string();
    if let Some(lister) = cpu.lister() {
        let lines = Disassembler::new(cpu.memory(), lister, 0)
            .take(LINES)
            .map(|s| s.to_string())
            .count();
        assert_eq!(lines, LINES);
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    exercise(&mut Mos6502::new(Memory::with_ram(0x10000)), data);
    exercise(&mut Z80::new(Memory::with_ram(0x10000)), data);
});
