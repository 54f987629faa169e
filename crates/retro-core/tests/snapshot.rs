//! Whole-system export and import through files.

use log as _;
use png as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use std::fs;

use proptest::prelude::*;
use retro_core::systems::{DualSystem, MAILBOX_ADDR};
use retro_core::{
    new_system, CodecError, Decoder, Encoder, Event, Mach, MachConfig, MachError, Value,
};

fn mach(name: &str) -> Mach {
    Mach::new(new_system(name).unwrap(), MachConfig::default())
}

fn state(mach: &Mach) -> Vec<(Vec<(&'static str, Value)>, Vec<(&'static str, Value)>, Vec<u8>)> {
    mach.system()
        .cpus()
        .iter()
        .map(|p| {
            let editor = p.cpu.editor().unwrap();
            (
                editor.registers(),
                editor.flags(),
                p.cpu.memory().read_n(0, 0x10000),
            )
        })
        .collect()
}

fn scramble(mach: &mut Mach, seed: u8) {
    for (n, p) in mach.system_mut().cpus_mut().iter_mut().enumerate() {
        let fill = seed.wrapping_add(u8::try_from(n).unwrap());
        for addr in (0..0x10000).step_by(0x101) {
            p.cpu.memory_mut().write(addr, fill);
        }
        let editor = p.cpu.editor_mut().unwrap();
        editor.put_register("a", Value::U8(fill)).unwrap();
        editor.put_register("sp", Value::U8(fill)).unwrap();
        editor.put_flag("c", Value::Bool(fill & 1 == 1)).unwrap();
        p.cpu.set_pc(0x1000 + usize::from(fill));
    }
}

#[test]
fn dual_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dual.bin");
    let mut mach = mach("dual");
    scramble(&mut mach, 0x21);
    mach.system_mut().cpus_mut()[0]
        .cpu
        .memory_mut()
        .write(MAILBOX_ADDR, 0x5a);
    let before = state(&mach);
    mach.export(&path).unwrap();

    scramble(&mut mach, 0x90);
    mach.system_mut().cpus_mut()[0]
        .cpu
        .memory_mut()
        .write(MAILBOX_ADDR, 0);
    assert_ne!(state(&mach), before);

    mach.import(&path).unwrap();
    assert_eq!(state(&mach), before);
    assert_eq!(
        mach.system().cpus()[0].cpu.memory().read(MAILBOX_ADDR),
        0x5a
    );
}

#[test]
fn export_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let mut mach = mach("mos6502");
    scramble(&mut mach, 3);
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    mach.export(&a).unwrap();
    mach.export(&b).unwrap();
    assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
}

#[test]
fn truncated_file_is_a_codec_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("z80.bin");
    let mut mach = mach("z80");
    mach.export(&path).unwrap();
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let err = mach.import(&path).unwrap_err();
    assert!(matches!(err, MachError::Codec(CodecError::Io(_))), "{err}");

    let (tx, rx) = std::sync::mpsc::channel();
    mach.set_sink(Box::new(tx));
    mach.controller().import(&path).unwrap();
    mach.jiffy();
    match rx.try_recv().unwrap() {
        Event::Error(message) => assert!(message.starts_with("snapshot: "), "{message}"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn export_into_missing_directory_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope").join("state.bin");
    let err = mach("z80").export(&path).unwrap_err();
    assert!(err.to_string().starts_with("unable to export "), "{err}");
}

#[test]
fn system_state_can_be_saved_without_files() {
    let mut system = DualSystem::new();
    system.mailbox().set(7);
    let mut bytes = Vec::new();
    let mut enc = Encoder::new(&mut bytes);
    retro_core::Snapshot::save(&system, &mut enc);
    enc.finish().unwrap();

    system.mailbox().set(0);
    let mut input = bytes.as_slice();
    let mut dec = Decoder::new(&mut input);
    retro_core::Snapshot::load(&mut system, &mut dec);
    dec.finish().unwrap();
    assert_eq!(system.mailbox().get(), 7);
    assert!(input.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn mos6502_registers_survive_a_round_trip(a in any::<u8>(), x in any::<u8>(), pc in any::<u16>()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpu.bin");
        let mut mach = mach("mos6502");
        {
            let cpu = &mut mach.system_mut().cpus_mut()[0].cpu;
            let editor = cpu.editor_mut().unwrap();
            editor.put_register("a", Value::U8(a)).unwrap();
            editor.put_register("x", Value::U8(x)).unwrap();
            cpu.set_pc(usize::from(pc));
        }
        mach.export(&path).unwrap();
        scramble(&mut mach, a.wrapping_add(1));
        mach.import(&path).unwrap();

        let cpu = &mach.system().cpus()[0].cpu;
        let editor = cpu.editor().unwrap();
        prop_assert_eq!(editor.register("a"), Ok(Value::U8(a)));
        prop_assert_eq!(editor.register("x"), Ok(Value::U8(x)));
        prop_assert_eq!(cpu.pc(), usize::from(pc));
    }
}
