/// Audio unit contract consumed by the bus: the channel register window
/// (0xFF10-0xFF3F, covering sweep, length/duty, envelope, period and the wave
/// pattern RAM) plus the host mute switch.
pub trait AudioUnit: Send {
    /// Advance one base clock unit.
    fn tick(&mut self);

    fn read_reg(&self, addr: u16) -> u8;
    fn write_reg(&mut self, addr: u16, value: u8);

    fn mute(&mut self);
    fn unmute(&mut self);
}

const REG_BASE: u16 = 0xFF10;
const REG_COUNT: usize = 0x30;

/// Audio unit that latches register writes and synthesizes nothing.
pub struct SilentAudio {
    regs: [u8; REG_COUNT],
    muted: bool,
}

impl SilentAudio {
    pub fn new() -> Self {
        Self {
            regs: [0; REG_COUNT],
            muted: false,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }
}

impl AudioUnit for SilentAudio {
    fn tick(&mut self) {}

    fn read_reg(&self, addr: u16) -> u8 {
        self.regs[(addr - REG_BASE) as usize]
    }

    fn write_reg(&mut self, addr: u16, value: u8) {
        self.regs[(addr - REG_BASE) as usize] = value;
    }

    fn mute(&mut self) {
        self.muted = true;
    }

    fn unmute(&mut self) {
        self.muted = false;
    }
}

impl Default for SilentAudio {
    fn default() -> Self {
        Self::new()
    }
}
