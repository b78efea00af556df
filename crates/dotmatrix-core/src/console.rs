use std::time::{Duration, Instant};

use crate::bus::Bus;
use crate::cartridge::Cartridge;
use crate::cpu::{Cpu, RunState};
use crate::error::CoreError;

/// Master clock rate in base clock units per second.
pub const CLOCK_RATE: u64 = 4_194_304;

/// Frames per second the host is expected to pace at.
pub const FRAME_RATE: u64 = 60;

/// Per-frame cycle budget.
pub const FRAME_CYCLES: u64 = CLOCK_RATE / FRAME_RATE;

/// The assembled machine: CPU plus bus (which owns everything else).
///
/// The core is cooperative: a host calls [`Console::run_frame`] (or
/// [`Console::step`] for per-instruction debugging), gets control back once
/// the budget is spent, and decides when to resume — typically via
/// [`FramePacer`]. Nothing here blocks.
pub struct Console {
    pub cpu: Cpu,
    pub bus: Bus,
}

impl Console {
    /// Console in the post-boot state, ready to run a cartridge from 0x0100.
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            bus: Bus::new(),
        }
    }

    /// Console in a neutral power-on state for executing a boot ROM.
    pub fn new_power_on() -> Self {
        Self {
            cpu: Cpu::new_power_on(),
            bus: Bus::new_power_on(),
        }
    }

    pub fn load_cartridge(&mut self, cart: Cartridge) {
        self.bus.load_cartridge(cart);
    }

    pub fn load_boot_rom(&mut self, data: Vec<u8>) {
        self.bus.load_boot_rom(data);
    }

    /// Reset to the post-boot state while preserving the loaded cartridge
    /// and boot ROM.
    pub fn reset(&mut self) {
        let cart = self.bus.cart.take();
        let boot = self.bus.boot_rom.take();
        self.cpu = Cpu::new();
        self.bus = Bus::new();
        if let Some(c) = cart {
            self.bus.load_cartridge(c);
        }
        if let Some(b) = boot {
            self.bus.load_boot_rom(b);
        }
    }

    /// Execute a single instruction (or halt poll / interrupt dispatch).
    /// Clock and register state are never discarded, so a debugger can
    /// single-step and resume exactly.
    pub fn step(&mut self) -> Result<(), CoreError> {
        self.cpu.step(&mut self.bus)
    }

    /// Step until the per-frame cycle budget is exhausted, returning the
    /// base clock units actually consumed. The engine always finishes the
    /// instruction in flight, so a frame may run slightly over budget.
    pub fn run_frame(&mut self) -> Result<u64, CoreError> {
        let start = self.bus.clock.cycles();
        while self.cpu.state != RunState::Killed
            && self.bus.clock.cycles().wrapping_sub(start) < FRAME_CYCLES
        {
            self.step()?;
        }
        Ok(self.bus.clock.cycles() - start)
    }

    /// One-way external stop. No opcode enters this state, and nothing
    /// leaves it short of [`Console::reset`].
    pub fn kill(&mut self) {
        self.cpu.state = RunState::Killed;
    }

    /// Drain the serial output captured since the last call.
    pub fn serial_output(&mut self) -> Vec<u8> {
        self.bus.serial.take_output()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock pacing helper for hosts.
///
/// Each frame's deadline is computed from the absolute elapsed time since the
/// pacer started rather than from a fixed per-frame delay, so scheduling
/// jitter never accumulates into drift over a long run.
pub struct FramePacer {
    started: Instant,
    frames: u64,
}

impl FramePacer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            frames: 0,
        }
    }

    /// Account one emulated frame and return how long the host should sleep
    /// before running the next. Returns zero when the schedule is behind.
    pub fn next_delay(&mut self) -> Duration {
        self.frames += 1;
        let deadline =
            self.started + Duration::from_nanos(self.frames * 1_000_000_000 / FRAME_RATE);
        deadline.saturating_duration_since(Instant::now())
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}
