#![allow(dead_code)]

use once_cell::sync::Lazy;

use dotmatrix_core::cartridge::Cartridge;
use dotmatrix_core::console::Console;

/// 32 KiB ROM template with a valid header; test programs are spliced in at
/// the post-boot entry point.
static BASE_ROM: Lazy<Vec<u8>> = Lazy::new(|| {
    let mut rom = vec![0u8; 0x8000];
    rom[0x134..0x138].copy_from_slice(b"TEST");
    rom[0x147] = 0x00;
    rom
});

/// Console in the post-boot state with `program` placed at 0x0100.
pub fn console_with(program: &[u8]) -> Console {
    let mut rom = BASE_ROM.clone();
    rom[0x100..0x100 + program.len()].copy_from_slice(program);
    let mut console = Console::new();
    console.load_cartridge(Cartridge::load(rom).expect("test ROM header is valid"));
    console
}

/// Step once and return the base clock units it consumed.
pub fn step_cycles(console: &mut Console) -> u64 {
    let before = console.bus.clock.cycles();
    console.step().expect("step failed");
    console.bus.clock.cycles() - before
}
