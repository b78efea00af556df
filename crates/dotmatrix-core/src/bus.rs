use log::debug;

use crate::audio::{AudioUnit, SilentAudio};
use crate::cartridge::Cartridge;
use crate::clock::Clock;
use crate::dma::OamDma;
use crate::error::{Access, CoreError};
use crate::input::{InputPort, NoInput};
use crate::interrupts::Interrupts;
use crate::serial::Serial;
use crate::timer::Timer;
use crate::video::{HeadlessVideo, VideoUnit};

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7F;

/// Power-on DIV phase left behind by the boot sequence.
const BOOT_DIV: u16 = 0xABCC;

/// The memory bus: a total dispatcher over the 16-bit address space, owner of
/// all peripherals, and the clock coordinator's fan-out point. Every consumed
/// machine cycle passes through [`Bus::tick`], which distributes base clock
/// units to the peripherals one at a time in fixed order.
pub struct Bus {
    wram: [u8; WRAM_SIZE],
    hram: [u8; HRAM_SIZE],
    pub cart: Option<Cartridge>,
    pub(crate) boot_rom: Option<Vec<u8>>,
    boot_mapped: bool,
    pub ints: Interrupts,
    pub clock: Clock,
    pub timer: Timer,
    pub serial: Serial,
    pub dma: OamDma,
    pub video: Box<dyn VideoUnit>,
    pub audio: Box<dyn AudioUnit>,
    pub input: Box<dyn InputPort>,
}

impl Bus {
    /// Bus in the post-boot state.
    pub fn new() -> Self {
        let mut timer = Timer::new();
        timer.div = BOOT_DIV;
        Self {
            wram: [0; WRAM_SIZE],
            hram: [0; HRAM_SIZE],
            cart: None,
            boot_rom: None,
            boot_mapped: false,
            ints: Interrupts::new(),
            clock: Clock::new(),
            timer,
            serial: Serial::new(),
            dma: OamDma::new(),
            video: Box::new(HeadlessVideo::new()),
            audio: Box::new(SilentAudio::new()),
            input: Box::new(NoInput::new()),
        }
    }

    /// Bus in a neutral power-on state, intended to be paired with a mapped
    /// boot ROM.
    pub fn new_power_on() -> Self {
        Self {
            ints: Interrupts::power_on(),
            timer: Timer::new(),
            ..Self::new()
        }
    }

    pub fn load_cartridge(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    /// Map a boot ROM over 0x0000-0x00FF. The overlay stays until software
    /// writes 0xFF50, after which it can never come back.
    pub fn load_boot_rom(&mut self, data: Vec<u8>) {
        self.boot_rom = Some(data);
        self.boot_mapped = true;
    }

    pub fn read(&self, addr: u16) -> Result<u8, CoreError> {
        let val = match addr {
            0x0000..=0x00FF if self.boot_mapped => self
                .boot_rom
                .as_ref()
                .and_then(|b| b.get(addr as usize).copied())
                .unwrap_or(0xFF),
            0x0000..=0x7FFF => self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF),
            0x8000..=0x9FFF => self.video.read_vram(addr),
            0xA000..=0xBFFF => self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            // Echo RAM: incomplete address decoding aliases working RAM.
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            0xFE00..=0xFE9F => self.video.read_oam(addr),
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00 => self.input.read(),
            0xFF01..=0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.ints.read_flags(),
            0xFF10..=0xFF3F => self.audio.read_reg(addr),
            0xFF40..=0xFF45 | 0xFF47..=0xFF4B => self.video.read_reg(addr),
            0xFF46 => self.dma.register(),
            // The boot lockout register is write-only.
            0xFF50 => 0xFF,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ints.read_enable(),
            _ => {
                return Err(CoreError::Address {
                    addr,
                    access: Access::Read,
                });
            }
        };
        Ok(val)
    }

    pub fn write(&mut self, addr: u16, val: u8) -> Result<(), CoreError> {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => self.video.write_vram(addr, val),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize] = val,
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize] = val,
            0xFE00..=0xFE9F => self.video.write_oam(addr, val),
            0xFEA0..=0xFEFF => {
                // Known cartridges write here; the hardware has nothing
                // mapped and the write is dropped.
                debug!("ignored write of {val:#04x} to unusable region {addr:#06x}");
            }
            0xFF00 => self.input.write(val),
            0xFF01..=0xFF02 => self.serial.write(addr, val),
            0xFF04..=0xFF07 => self.timer.write(addr, val, &mut self.ints),
            0xFF0F => self.ints.write_flags(val),
            0xFF10..=0xFF3F => self.audio.write_reg(addr, val),
            // The video unit owns its registers; LY writes are swallowed
            // on its side of the seam.
            0xFF40..=0xFF45 | 0xFF47..=0xFF4B => self.video.write_reg(addr, val),
            0xFF46 => self.dma.trigger(val),
            0xFF50 => {
                if self.boot_mapped {
                    self.boot_mapped = false;
                }
            }
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ints.write_enable(val),
            _ => {
                return Err(CoreError::Address {
                    addr,
                    access: Access::Write,
                });
            }
        }
        Ok(())
    }

    /// Advance the clock by whole machine cycles, fanning each base unit out
    /// to the peripherals in fixed order: Timer, Video, Audio, then DMA on
    /// every 4th unit and Serial on every 512th. A request raised inside any
    /// unit is visible to the interrupt check that follows the same
    /// instruction. Ticks are O(1) and never call back into the engine.
    pub fn tick(&mut self, m_cycles: u32) {
        for _ in 0..(m_cycles as u64 * 4) {
            let slots = self.clock.tick();
            self.timer.tick(&mut self.ints);
            self.video.tick(&mut self.ints);
            self.audio.tick();
            if slots.dma {
                self.dma_tick();
            }
            if slots.serial {
                self.serial.tick(&mut self.ints);
            }
        }
    }

    fn dma_tick(&mut self) {
        if let Some((src, index)) = self.dma.next_byte() {
            let byte = self.dma_read(src);
            self.video.write_oam(0xFE00 + index as u16, byte);
        }
    }

    /// DMA source reads never fault; a source with nothing mapped reads back
    /// open bus.
    fn dma_read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF)
            }
            0x8000..=0x9FFF => self.video.read_vram(addr),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            _ => 0xFF,
        }
    }

    /// Reset the divider, applying the timer's edge logic.
    pub fn reset_divider(&mut self) {
        self.timer.reset_div(&mut self.ints);
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
