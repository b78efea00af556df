use std::fmt;

use thiserror::Error;

use crate::opcodes;
use crate::registers::Registers;

/// Direction of the memory access that faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// One recently executed instruction, for post-mortem reporting.
#[derive(Debug, Clone, Copy)]
pub struct TraceEntry {
    pub pc: u16,
    pub opcode: u8,
    pub prefixed: bool,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic =
            opcodes::mnemonic(self.opcode, self.prefixed).unwrap_or_else(|| "??".into());
        if self.prefixed {
            write!(f, "{:04X}  CB {:02X}  {}", self.pc, self.opcode, mnemonic)
        } else {
            write!(f, "{:04X}  {:02X}     {}", self.pc, self.opcode, mnemonic)
        }
    }
}

/// Full engine state captured when decoding fails. A decode failure flags a
/// missing engine feature, so the report carries everything needed to
/// reproduce it: the offending byte, the register file, the elapsed clock and
/// the instructions that led there.
#[derive(Debug, Clone)]
pub struct DecodeContext {
    pub opcode: u8,
    pub pc: u16,
    pub registers: Registers,
    pub cycles: u64,
    /// Recently executed instructions, oldest first.
    pub history: Vec<TraceEntry>,
}

impl fmt::Display for DecodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "opcode {:#04X} at {:#06X} after {} cycles",
            self.opcode, self.pc, self.cycles
        )?;
        writeln!(
            f,
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} SP:{:04X}",
            self.registers.af(),
            self.registers.bc(),
            self.registers.de(),
            self.registers.hl(),
            self.registers.sp,
        )?;
        for entry in &self.history {
            writeln!(f, "  {entry}")?;
        }
        Ok(())
    }
}

/// Fatal core conditions. Each stops the frame loop; instructions execute
/// atomically, so there is no partial state to unwind and no retry path.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Opcode byte with no table entry.
    #[error("illegal opcode {:#04x} at {:#06x}", .0.opcode, .0.pc)]
    Decode(Box<DecodeContext>),

    /// Access to an I/O address with no registered handler.
    #[error("unmapped I/O {access} at {addr:#06x}")]
    Address { addr: u16, access: Access },

    /// Unknown cartridge-type byte in the ROM header.
    #[error("unsupported cartridge type {code:#04x}")]
    UnsupportedCartridge { code: u8 },
}
