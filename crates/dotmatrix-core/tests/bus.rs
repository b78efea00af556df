//! Memory bus dispatch: region mapping, the echo alias, the boot overlay,
//! permissive no-ops, unmapped-I/O faults and DMA pacing.

mod common;

use dotmatrix_core::audio::{AudioUnit, SilentAudio};
use dotmatrix_core::bus::Bus;
use dotmatrix_core::cartridge::Cartridge;
use dotmatrix_core::error::{Access, CoreError};
use dotmatrix_core::video::HeadlessVideo;

#[test]
fn wram_and_hram_round_trip() {
    let mut bus = Bus::new();
    bus.write(0xC000, 0xAA).unwrap();
    bus.write(0xDFFF, 0xBB).unwrap();
    bus.write(0xFF80, 0xCC).unwrap();
    bus.write(0xFFFE, 0xDD).unwrap();
    assert_eq!(bus.read(0xC000).unwrap(), 0xAA);
    assert_eq!(bus.read(0xDFFF).unwrap(), 0xBB);
    assert_eq!(bus.read(0xFF80).unwrap(), 0xCC);
    assert_eq!(bus.read(0xFFFE).unwrap(), 0xDD);
}

#[test]
fn echo_region_aliases_working_ram() {
    let mut bus = Bus::new();
    bus.write(0xC000, 0xAA).unwrap();
    assert_eq!(bus.read(0xE000).unwrap(), 0xAA);
    bus.write(0xE123, 0xBB).unwrap();
    assert_eq!(bus.read(0xC123).unwrap(), 0xBB);
    bus.write(0xFDFF, 0xCC).unwrap();
    assert_eq!(bus.read(0xDDFF).unwrap(), 0xCC);
}

#[test]
fn unusable_region_swallows_writes_and_reads_open_bus() {
    let mut bus = Bus::new();
    bus.write(0xFEA0, 0x12).unwrap();
    bus.write(0xFEFF, 0x34).unwrap();
    assert_eq!(bus.read(0xFEA0).unwrap(), 0xFF);
    assert_eq!(bus.read(0xFEFF).unwrap(), 0xFF);
}

#[test]
fn unmapped_io_is_a_fault_not_a_no_op() {
    let mut bus = Bus::new();
    match bus.read(0xFF03).unwrap_err() {
        CoreError::Address { addr, access } => {
            assert_eq!(addr, 0xFF03);
            assert_eq!(access, Access::Read);
        }
        other => panic!("unexpected error: {other}"),
    }
    match bus.write(0xFF7F, 0x00).unwrap_err() {
        CoreError::Address { addr, access } => {
            assert_eq!(addr, 0xFF7F);
            assert_eq!(access, Access::Write);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(bus.read(0xFF4C).is_err());
    assert!(bus.write(0xFF08, 0x00).is_err());
}

#[test]
fn vram_and_oam_route_to_the_video_unit() {
    let mut bus = Bus::new();
    bus.write(0x8000, 0x11).unwrap();
    bus.write(0x9FFF, 0x22).unwrap();
    bus.write(0xFE00, 0x33).unwrap();
    bus.write(0xFE9F, 0x44).unwrap();
    assert_eq!(bus.read(0x8000).unwrap(), 0x11);
    assert_eq!(bus.read(0x9FFF).unwrap(), 0x22);
    assert_eq!(bus.read(0xFE00).unwrap(), 0x33);
    assert_eq!(bus.read(0xFE9F).unwrap(), 0x44);
}

#[test]
fn lcd_line_register_ignores_writes() {
    let mut bus = Bus::new();
    bus.write(0xFF44, 0x55).unwrap();
    assert_eq!(bus.read(0xFF44).unwrap(), 0x00);
    // Neighboring scroll registers stay writable.
    bus.write(0xFF42, 0x55).unwrap();
    assert_eq!(bus.read(0xFF42).unwrap(), 0x55);
    bus.write(0xFF45, 0x66).unwrap();
    assert_eq!(bus.read(0xFF45).unwrap(), 0x66);
}

#[test]
fn audio_registers_route_to_the_audio_unit() {
    let mut bus = Bus::new();
    bus.write(0xFF10, 0x77).unwrap();
    bus.write(0xFF3F, 0x88).unwrap();
    assert_eq!(bus.read(0xFF10).unwrap(), 0x77);
    assert_eq!(bus.read(0xFF3F).unwrap(), 0x88);
}

#[test]
fn joypad_register_reads_idle_lines() {
    let mut bus = Bus::new();
    bus.write(0xFF00, 0x20).unwrap();
    assert_eq!(bus.read(0xFF00).unwrap(), 0xEF);
}

#[test]
fn boot_overlay_unmaps_on_ff50_write_permanently() {
    let mut rom = vec![0xBB; 0x8000];
    rom[0x147] = 0x00;
    let mut bus = Bus::new_power_on();
    bus.load_cartridge(Cartridge::load(rom).unwrap());
    bus.load_boot_rom(vec![0xAA; 0x100]);

    assert_eq!(bus.read(0x0000).unwrap(), 0xAA);
    assert_eq!(bus.read(0x00FF).unwrap(), 0xAA);
    // The overlay only covers the first page.
    assert_eq!(bus.read(0x0100).unwrap(), 0xBB);

    bus.write(0xFF50, 0x01).unwrap();
    assert_eq!(bus.read(0x0000).unwrap(), 0xBB);

    // The transition is one-way; no later write brings the overlay back.
    bus.write(0xFF50, 0x00).unwrap();
    bus.write(0xFF50, 0x01).unwrap();
    assert_eq!(bus.read(0x0000).unwrap(), 0xBB);
}

#[test]
fn dma_trigger_copies_one_byte_per_four_units() {
    let mut bus = Bus::new();
    for i in 0..0xA0u16 {
        bus.write(0xC000 + i, i as u8).unwrap();
    }

    bus.write(0xFF46, 0xC0).unwrap();
    assert_eq!(bus.read(0xFF46).unwrap(), 0xC0, "trigger reads back");

    // 40 machine cycles = 160 base units = 40 DMA slots.
    bus.tick(40);
    assert_eq!(bus.read(0xFE00).unwrap(), 0x00);
    assert_eq!(bus.read(0xFE27).unwrap(), 0x27);
    assert!(bus.dma.active(), "transfer still in flight");

    // The rest of the 160 bytes complete after 160 machine cycles total.
    bus.tick(120);
    assert!(!bus.dma.active());
    assert_eq!(bus.read(0xFE9F).unwrap(), 0x9F);
}

#[test]
fn dma_reads_echo_sources_through_the_alias() {
    let mut bus = Bus::new();
    bus.write(0xC010, 0x5A).unwrap();
    bus.write(0xFF46, 0xE0).unwrap();
    bus.tick(160);
    assert_eq!(bus.read(0xFE10).unwrap(), 0x5A);
}

#[test]
fn rom_regions_read_open_bus_with_no_cartridge() {
    let bus = Bus::new();
    assert_eq!(bus.read(0x0000).unwrap(), 0xFF);
    assert_eq!(bus.read(0x7FFF).unwrap(), 0xFF);
    assert_eq!(bus.read(0xA000).unwrap(), 0xFF);
}

#[test]
fn hosts_can_install_their_own_video_unit() {
    let mut video = HeadlessVideo::new();
    video.set_line(0x90);

    let mut bus = Bus::new();
    bus.video = Box::new(video);
    assert_eq!(bus.read(0xFF44).unwrap(), 0x90);
    // Still read-only from the bus side.
    bus.write(0xFF44, 0x00).unwrap();
    assert_eq!(bus.read(0xFF44).unwrap(), 0x90);
}

#[test]
fn audio_unit_exposes_a_mute_switch() {
    let mut audio = SilentAudio::new();
    assert!(!audio.is_muted());
    audio.mute();
    assert!(audio.is_muted());
    audio.unmute();
    assert!(!audio.is_muted());
}

#[test]
fn serial_registers_route_to_the_serial_unit() {
    let mut bus = Bus::new();
    bus.write(0xFF01, 0x42).unwrap();
    assert_eq!(bus.read(0xFF01).unwrap(), 0x42);
    assert_eq!(bus.read(0xFF02).unwrap() & 0x7E, 0x7E);
}
