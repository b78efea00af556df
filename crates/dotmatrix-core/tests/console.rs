//! Facade behavior: frame budgeting, kill/reset, boot ROM flow, serial
//! capture and wall-clock pacing.

mod common;

use std::time::Duration;

use common::console_with;
use dotmatrix_core::cartridge::Cartridge;
use dotmatrix_core::console::{Console, FRAME_CYCLES, FramePacer};
use dotmatrix_core::cpu::RunState;
use dotmatrix_core::serial::NullLinkPort;

#[test]
fn run_frame_consumes_the_cycle_budget() {
    // Tight infinite loop: JR -2.
    let mut console = console_with(&[0x18, 0xFE]);
    let consumed = console.run_frame().unwrap();
    assert!(consumed >= FRAME_CYCLES);
    // The instruction in flight finishes, so overshoot is bounded by the
    // longest opcode.
    assert!(consumed < FRAME_CYCLES + 24);

    // A second frame continues from exactly where the first suspended.
    let pc = console.cpu.regs.pc;
    assert!(pc == 0x100 || pc == 0x102, "still inside the loop, pc={pc:#06x}");
    let consumed = console.run_frame().unwrap();
    assert!(consumed >= FRAME_CYCLES);
}

#[test]
fn run_frame_keeps_counting_while_halted() {
    let mut console = console_with(&[0x76]);
    let consumed = console.run_frame().unwrap();
    assert!(consumed >= FRAME_CYCLES);
    assert_eq!(console.cpu.state, RunState::Halted);
    assert_eq!(console.cpu.regs.pc, 0x101);
}

#[test]
fn kill_is_terminal() {
    let mut console = console_with(&[0x00, 0x00]);
    console.step().unwrap();
    console.kill();

    let pc = console.cpu.regs.pc;
    console.step().unwrap();
    assert_eq!(console.cpu.regs.pc, pc);
    assert_eq!(console.run_frame().unwrap(), 0, "a killed frame loop exits at once");
}

#[test]
fn fatal_error_kills_the_frame_loop() {
    let mut console = console_with(&[0xD3]);
    console.run_frame().unwrap_err();
    assert_eq!(console.cpu.state, RunState::Killed);
    assert_eq!(console.run_frame().unwrap(), 0);
}

#[test]
fn reset_preserves_the_cartridge() {
    let mut console = console_with(&[0x3E, 0x42]);
    console.step().unwrap();
    assert_eq!(console.cpu.regs.a, 0x42);
    console.bus.write(0xC000, 0x99).unwrap();

    console.reset();
    assert_eq!(console.cpu.regs.pc, 0x100);
    assert_eq!(console.cpu.regs.a, 0x01, "post-boot accumulator");
    assert_eq!(console.bus.read(0xC000).unwrap(), 0x00, "work RAM cleared");
    assert_eq!(console.bus.read(0x100).unwrap(), 0x3E, "cartridge survives");
    assert_eq!(console.bus.clock.cycles(), 0);

    console.step().unwrap();
    assert_eq!(console.cpu.regs.a, 0x42, "the program runs again");
}

#[test]
fn single_step_resumes_exactly() {
    let mut console = console_with(&[0x06, 0x07, 0x04, 0x04]);
    console.step().unwrap();
    let cycles = console.bus.clock.cycles();
    let regs = console.cpu.regs.clone();

    // A debugger pausing here discards nothing.
    assert_eq!(console.bus.clock.cycles(), cycles);
    assert_eq!(console.cpu.regs, regs);

    console.step().unwrap();
    console.step().unwrap();
    assert_eq!(console.cpu.regs.b, 0x09);
}

#[test]
fn boot_rom_runs_first_and_unmaps_itself() {
    let mut rom = vec![0x00u8; 0x8000];
    rom[0x147] = 0x00;
    rom[0x04] = 0x3C; // INC A, only visible once the overlay is gone

    // LD A,0x11; LDH (0x50),A — the canonical boot hand-off.
    let mut boot = vec![0x00u8; 0x100];
    boot[0..4].copy_from_slice(&[0x3E, 0x11, 0xE0, 0x50]);

    let mut console = Console::new_power_on();
    console.load_cartridge(Cartridge::load(rom).unwrap());
    console.load_boot_rom(boot);

    assert_eq!(console.cpu.regs.pc, 0x0000);
    console.step().unwrap(); // LD A,0x11 from the boot ROM
    assert_eq!(console.cpu.regs.a, 0x11);
    console.step().unwrap(); // the 0xFF50 write removes the overlay
    assert_eq!(console.bus.read(0x0000).unwrap(), 0x00);

    console.step().unwrap(); // now fetching cartridge bytes at 0x0004
    assert_eq!(console.cpu.regs.a, 0x12);
}

#[test]
fn serial_output_reaches_the_host() {
    // LD A,0x5A; LDH (0x01),A; LD A,0x81; LDH (0x02),A; JR -2.
    let mut console = console_with(&[0x3E, 0x5A, 0xE0, 0x01, 0x3E, 0x81, 0xE0, 0x02, 0x18, 0xFE]);
    console.bus.serial.connect(Box::new(NullLinkPort::new(true)));

    console.run_frame().unwrap();
    assert_eq!(console.serial_output(), vec![0x5A]);
    assert_ne!(
        console.bus.ints.read_flags() & 0x08,
        0,
        "transfer completion raised the serial request"
    );
    assert!(console.serial_output().is_empty(), "output drains on read");
}

#[test]
fn frame_pacer_tracks_absolute_deadlines() {
    let mut pacer = FramePacer::new();
    let first = pacer.next_delay();
    assert!(first <= Duration::from_millis(17));

    // Deadlines accumulate from the start time, not from "now", so two
    // back-to-back frames never owe more than two periods.
    let second = pacer.next_delay();
    assert!(second <= Duration::from_millis(34));
}
