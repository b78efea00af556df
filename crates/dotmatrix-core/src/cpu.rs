use crate::bus::Bus;
use crate::error::{CoreError, DecodeContext, TraceEntry};
use crate::opcodes::{self, AluOp, CbOp, Cond, Op, Operand, Pointer, Reg8, Reg16, RotOp, StackReg};
use crate::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Registers};

// Post-boot register state left behind by the boot sequence.
const BOOT_A: u8 = 0x01;
const BOOT_F: u8 = 0xB0;
const BOOT_B: u8 = 0x00;
const BOOT_C: u8 = 0x13;
const BOOT_D: u8 = 0x00;
const BOOT_E: u8 = 0xD8;
const BOOT_H: u8 = 0x01;
const BOOT_L: u8 = 0x4D;
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

const HISTORY_LEN: usize = 16;

/// Engine execution state. `Killed` is terminal and only ever entered from
/// the outside (or by a fatal error); no opcode reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Halted,
    Killed,
}

/// Ring of recently executed instructions, kept for decode-failure reports.
struct History {
    entries: [Option<TraceEntry>; HISTORY_LEN],
    next: usize,
}

impl History {
    fn new() -> Self {
        Self {
            entries: [None; HISTORY_LEN],
            next: 0,
        }
    }

    fn record(&mut self, entry: TraceEntry) {
        self.entries[self.next] = Some(entry);
        self.next = (self.next + 1) % HISTORY_LEN;
    }

    /// Entries oldest-first.
    fn snapshot(&self) -> Vec<TraceEntry> {
        (0..HISTORY_LEN)
            .filter_map(|i| self.entries[(self.next + i) % HISTORY_LEN])
            .collect()
    }
}

/// The SM83 instruction engine. Owns the register file; everything else is
/// reached through the bus it is handed per step.
///
/// Cycle accounting is structural: every bus access and every internal delay
/// ticks the bus by one machine cycle, so each opcode's data-dependent cycle
/// count (conditional branches taken vs. not) falls out of its execution path
/// rather than a side table.
pub struct Cpu {
    pub regs: Registers,
    pub state: RunState,
    ime_enable_delay: u8,
    history: History,
}

impl Cpu {
    /// CPU in the post-boot register state.
    pub fn new() -> Self {
        let mut regs = Registers::new();
        regs.a = BOOT_A;
        regs.set_f(BOOT_F);
        regs.b = BOOT_B;
        regs.c = BOOT_C;
        regs.d = BOOT_D;
        regs.e = BOOT_E;
        regs.h = BOOT_H;
        regs.l = BOOT_L;
        regs.pc = BOOT_PC;
        regs.sp = BOOT_SP;
        Self {
            regs,
            state: RunState::Running,
            ime_enable_delay: 0,
            history: History::new(),
        }
    }

    /// CPU in a neutral power-on state, intended to be paired with a boot ROM
    /// mapped at 0x0000. Boot ROMs re-initialize everything early; the part
    /// that matters is not starting from the post-boot state.
    pub fn new_power_on() -> Self {
        Self {
            regs: Registers::new(),
            state: RunState::Running,
            ime_enable_delay: 0,
            history: History::new(),
        }
    }

    /// Formatted CPU state string for debugging.
    pub fn debug_state(&self) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X}",
            self.regs.af(),
            self.regs.bc(),
            self.regs.de(),
            self.regs.hl(),
            self.regs.pc,
            self.regs.sp,
        )
    }

    #[inline(always)]
    fn fetch8(&mut self, bus: &mut Bus) -> Result<u8, CoreError> {
        let val = bus.read(self.regs.pc)?;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        bus.tick(1);
        Ok(val)
    }

    #[inline(always)]
    fn fetch16(&mut self, bus: &mut Bus) -> Result<u16, CoreError> {
        let lo = self.fetch8(bus)? as u16;
        let hi = self.fetch8(bus)? as u16;
        Ok((hi << 8) | lo)
    }

    #[inline(always)]
    fn read8(&mut self, bus: &mut Bus, addr: u16) -> Result<u8, CoreError> {
        let val = bus.read(addr)?;
        bus.tick(1);
        Ok(val)
    }

    #[inline(always)]
    fn write8(&mut self, bus: &mut Bus, addr: u16, val: u8) -> Result<(), CoreError> {
        bus.write(addr, val)?;
        bus.tick(1);
        Ok(())
    }

    fn push_stack(&mut self, bus: &mut Bus, val: u16) -> Result<(), CoreError> {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write8(bus, self.regs.sp, (val >> 8) as u8)?;
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write8(bus, self.regs.sp, val as u8)
    }

    fn pop_stack(&mut self, bus: &mut Bus) -> Result<u16, CoreError> {
        let lo = self.read8(bus, self.regs.sp)? as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read8(bus, self.regs.sp)? as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        Ok((hi << 8) | lo)
    }

    fn reg8(&self, r: Reg8) -> u8 {
        match r {
            Reg8::B => self.regs.b,
            Reg8::C => self.regs.c,
            Reg8::D => self.regs.d,
            Reg8::E => self.regs.e,
            Reg8::H => self.regs.h,
            Reg8::L => self.regs.l,
            Reg8::A => self.regs.a,
        }
    }

    fn set_reg8(&mut self, r: Reg8, val: u8) {
        match r {
            Reg8::B => self.regs.b = val,
            Reg8::C => self.regs.c = val,
            Reg8::D => self.regs.d = val,
            Reg8::E => self.regs.e = val,
            Reg8::H => self.regs.h = val,
            Reg8::L => self.regs.l = val,
            Reg8::A => self.regs.a = val,
        }
    }

    fn reg16(&self, r: Reg16) -> u16 {
        match r {
            Reg16::BC => self.regs.bc(),
            Reg16::DE => self.regs.de(),
            Reg16::HL => self.regs.hl(),
            Reg16::SP => self.regs.sp,
        }
    }

    fn set_reg16(&mut self, r: Reg16, val: u16) {
        match r {
            Reg16::BC => self.regs.set_bc(val),
            Reg16::DE => self.regs.set_de(val),
            Reg16::HL => self.regs.set_hl(val),
            Reg16::SP => self.regs.sp = val,
        }
    }

    fn read_operand(&mut self, bus: &mut Bus, operand: Operand) -> Result<u8, CoreError> {
        match operand {
            Operand::Reg(r) => Ok(self.reg8(r)),
            Operand::HlIndirect => {
                let addr = self.regs.hl();
                self.read8(bus, addr)
            }
            Operand::Immediate => self.fetch8(bus),
        }
    }

    fn write_operand(&mut self, bus: &mut Bus, operand: Operand, val: u8) -> Result<(), CoreError> {
        match operand {
            Operand::Reg(r) => {
                self.set_reg8(r, val);
                Ok(())
            }
            Operand::HlIndirect => {
                let addr = self.regs.hl();
                self.write8(bus, addr, val)
            }
            Operand::Immediate => unreachable!("immediates are never a destination"),
        }
    }

    /// Resolve an A<->memory addressing form, consuming immediates and
    /// applying HL post-increment/decrement.
    fn pointer_addr(&mut self, bus: &mut Bus, ptr: Pointer) -> Result<u16, CoreError> {
        match ptr {
            Pointer::Bc => Ok(self.regs.bc()),
            Pointer::De => Ok(self.regs.de()),
            Pointer::HlInc => {
                let addr = self.regs.hl();
                self.regs.set_hl(addr.wrapping_add(1));
                Ok(addr)
            }
            Pointer::HlDec => {
                let addr = self.regs.hl();
                self.regs.set_hl(addr.wrapping_sub(1));
                Ok(addr)
            }
            Pointer::Absolute => self.fetch16(bus),
            Pointer::High => Ok(0xFF00 | self.fetch8(bus)? as u16),
            Pointer::HighC => Ok(0xFF00 | self.regs.c as u16),
        }
    }

    fn cond_met(&self, cond: Option<Cond>) -> bool {
        let f = self.regs.f();
        match cond {
            None => true,
            Some(Cond::NZ) => f & FLAG_Z == 0,
            Some(Cond::Z) => f & FLAG_Z != 0,
            Some(Cond::NC) => f & FLAG_C == 0,
            Some(Cond::C) => f & FLAG_C != 0,
        }
    }

    /// 8-bit accumulator arithmetic/logic. Operands and the incoming carry
    /// are read before A or F change; ADC/SBC feed the prior carry into the
    /// same computation that overwrites it.
    fn alu(&mut self, alu: AluOp, val: u8) {
        let a = self.regs.a;
        match alu {
            AluOp::Add => {
                let (res, carry) = a.overflowing_add(val);
                self.regs.set_f(
                    if res == 0 { FLAG_Z } else { 0 }
                        | if (a & 0x0F) + (val & 0x0F) > 0x0F {
                            FLAG_H
                        } else {
                            0
                        }
                        | if carry { FLAG_C } else { 0 },
                );
                self.regs.a = res;
            }
            AluOp::Adc => {
                let carry_in = if self.regs.f() & FLAG_C != 0 { 1 } else { 0 };
                let (res1, carry1) = a.overflowing_add(val);
                let (res2, carry2) = res1.overflowing_add(carry_in);
                self.regs.set_f(
                    if res2 == 0 { FLAG_Z } else { 0 }
                        | if (a & 0x0F) + (val & 0x0F) + carry_in > 0x0F {
                            FLAG_H
                        } else {
                            0
                        }
                        | if carry1 || carry2 { FLAG_C } else { 0 },
                );
                self.regs.a = res2;
            }
            AluOp::Sub => {
                let (res, borrow) = a.overflowing_sub(val);
                self.regs.set_f(
                    FLAG_N
                        | if res == 0 { FLAG_Z } else { 0 }
                        | if (a & 0x0F) < (val & 0x0F) { FLAG_H } else { 0 }
                        | if borrow { FLAG_C } else { 0 },
                );
                self.regs.a = res;
            }
            AluOp::Sbc => {
                let carry_in = if self.regs.f() & FLAG_C != 0 { 1 } else { 0 };
                let (res1, borrow1) = a.overflowing_sub(val);
                let (res2, borrow2) = res1.overflowing_sub(carry_in);
                self.regs.set_f(
                    FLAG_N
                        | if res2 == 0 { FLAG_Z } else { 0 }
                        | if (a & 0x0F) < (val & 0x0F) + carry_in {
                            FLAG_H
                        } else {
                            0
                        }
                        | if borrow1 || borrow2 { FLAG_C } else { 0 },
                );
                self.regs.a = res2;
            }
            AluOp::And => {
                self.regs.a &= val;
                self.regs
                    .set_f(if self.regs.a == 0 { FLAG_Z } else { 0 } | FLAG_H);
            }
            AluOp::Xor => {
                self.regs.a ^= val;
                self.regs
                    .set_f(if self.regs.a == 0 { FLAG_Z } else { 0 });
            }
            AluOp::Or => {
                self.regs.a |= val;
                self.regs
                    .set_f(if self.regs.a == 0 { FLAG_Z } else { 0 });
            }
            AluOp::Cp => {
                // Flags only; A is never written.
                let res = a.wrapping_sub(val);
                self.regs.set_f(
                    FLAG_N
                        | if res == 0 { FLAG_Z } else { 0 }
                        | if (a & 0x0F) < (val & 0x0F) { FLAG_H } else { 0 }
                        | if a < val { FLAG_C } else { 0 },
                );
            }
        }
    }

    /// Execute one instruction (or halt poll, or interrupt dispatch). Any
    /// fatal error kills the engine before surfacing.
    pub fn step(&mut self, bus: &mut Bus) -> Result<(), CoreError> {
        let result = self.step_inner(bus);
        if result.is_err() {
            self.state = RunState::Killed;
        }
        result
    }

    fn step_inner(&mut self, bus: &mut Bus) -> Result<(), CoreError> {
        match self.state {
            RunState::Killed => return Ok(()),
            RunState::Halted => {
                // PC does not advance; polling IF&IE costs one machine cycle
                // per step.
                bus.tick(1);
                return self.service_interrupts(bus);
            }
            RunState::Running => {}
        }

        let enable_after = self.ime_enable_delay == 1;

        let start_pc = self.regs.pc;
        let opcode = self.fetch8(bus)?;
        let Some(instr) = opcodes::base(opcode) else {
            // Undo the fetch so the failure mutates no register.
            self.regs.pc = start_pc;
            return Err(self.decode_error(opcode, start_pc, bus));
        };

        if let Op::Prefix = instr.op {
            let cb_code = self.fetch8(bus)?;
            let cb_instr = opcodes::prefixed(cb_code);
            self.history.record(TraceEntry {
                pc: start_pc,
                opcode: cb_code,
                prefixed: true,
            });
            #[cfg(feature = "cpu-trace")]
            log::trace!("{start_pc:04X}  {:<12} {}", cb_instr.mnemonic, self.debug_state());
            let Op::Cb(cb) = cb_instr.op else {
                unreachable!("prefixed table only holds CB operations");
            };
            self.execute_cb(cb, bus)?;
        } else {
            self.history.record(TraceEntry {
                pc: start_pc,
                opcode,
                prefixed: false,
            });
            #[cfg(feature = "cpu-trace")]
            log::trace!("{start_pc:04X}  {:<12} {}", instr.mnemonic, self.debug_state());
            self.execute(instr.op, bus)?;
        }

        // EI takes effect only after the *next* instruction has fully
        // executed; DI during that window wins by zeroing the delay.
        if enable_after && self.ime_enable_delay > 0 {
            bus.ints.ime = true;
        }
        if self.ime_enable_delay > 0 {
            self.ime_enable_delay -= 1;
        }

        self.service_interrupts(bus)
    }

    /// Interrupt check, run once per step between instructions. A pending
    /// IF&IE bit always wakes a halted engine; dispatch additionally needs
    /// IME and costs 5 machine cycles.
    fn service_interrupts(&mut self, bus: &mut Bus) -> Result<(), CoreError> {
        if bus.ints.pending() == 0 {
            return Ok(());
        }
        if self.state == RunState::Halted {
            self.state = RunState::Running;
        }
        if !bus.ints.ime {
            return Ok(());
        }
        let Some(source) = bus.ints.highest_pending() else {
            return Ok(());
        };
        bus.ints.ime = false;
        bus.ints.acknowledge(source);
        bus.tick(2);
        self.push_stack(bus, self.regs.pc)?;
        self.regs.pc = source.vector();
        bus.tick(1);
        Ok(())
    }

    fn decode_error(&self, opcode: u8, pc: u16, bus: &Bus) -> CoreError {
        CoreError::Decode(Box::new(DecodeContext {
            opcode,
            pc,
            registers: self.regs.clone(),
            cycles: bus.clock.cycles(),
            history: self.history.snapshot(),
        }))
    }

    fn execute(&mut self, op: Op, bus: &mut Bus) -> Result<(), CoreError> {
        match op {
            Op::Nop => {}
            Op::Stop => {
                // One padding byte follows the opcode. Speed switching is a
                // color-hardware feature; here STOP resets the divider and
                // idles like HALT until a request appears.
                let _ = self.fetch8(bus)?;
                bus.reset_divider();
                self.state = RunState::Halted;
            }
            Op::Halt => {
                self.state = RunState::Halted;
            }
            Op::DisableInterrupts => {
                bus.ints.ime = false;
                self.ime_enable_delay = 0;
            }
            Op::EnableInterrupts => {
                self.ime_enable_delay = 2;
            }
            Op::Load { dst, src } => {
                let val = self.read_operand(bus, src)?;
                self.write_operand(bus, dst, val)?;
            }
            Op::LoadAFrom(ptr) => {
                let addr = self.pointer_addr(bus, ptr)?;
                self.regs.a = self.read8(bus, addr)?;
            }
            Op::StoreATo(ptr) => {
                let addr = self.pointer_addr(bus, ptr)?;
                let a = self.regs.a;
                self.write8(bus, addr, a)?;
            }
            Op::Load16(r) => {
                let val = self.fetch16(bus)?;
                self.set_reg16(r, val);
            }
            Op::StoreSp => {
                // 16-bit immediates and stores are little-endian in memory.
                let addr = self.fetch16(bus)?;
                let sp = self.regs.sp;
                self.write8(bus, addr, sp as u8)?;
                self.write8(bus, addr.wrapping_add(1), (sp >> 8) as u8)?;
            }
            Op::LoadSpHl => {
                self.regs.sp = self.regs.hl();
                bus.tick(1);
            }
            Op::LoadHlSpOffset => {
                let val = self.fetch8(bus)? as i8 as i16 as u16;
                let sp = self.regs.sp;
                self.regs.set_f(
                    if ((sp & 0x0F) + (val & 0x0F)) > 0x0F {
                        FLAG_H
                    } else {
                        0
                    } | if ((sp & 0xFF) + (val & 0xFF)) > 0xFF {
                        FLAG_C
                    } else {
                        0
                    },
                );
                self.regs.set_hl(sp.wrapping_add(val));
                bus.tick(1);
            }
            Op::AddSpOffset => {
                let val = self.fetch8(bus)? as i8 as i16 as u16;
                let sp = self.regs.sp;
                self.regs.set_f(
                    if ((sp & 0x0F) + (val & 0x0F)) > 0x0F {
                        FLAG_H
                    } else {
                        0
                    } | if ((sp & 0xFF) + (val & 0xFF)) > 0xFF {
                        FLAG_C
                    } else {
                        0
                    },
                );
                self.regs.sp = sp.wrapping_add(val);
                bus.tick(2);
            }
            Op::Inc(operand) => {
                let val = self.read_operand(bus, operand)?;
                let res = val.wrapping_add(1);
                self.regs.set_f(
                    (self.regs.f() & FLAG_C)
                        | if res == 0 { FLAG_Z } else { 0 }
                        | if (val & 0x0F) + 1 > 0x0F { FLAG_H } else { 0 },
                );
                self.write_operand(bus, operand, res)?;
            }
            Op::Dec(operand) => {
                let val = self.read_operand(bus, operand)?;
                let res = val.wrapping_sub(1);
                self.regs.set_f(
                    (self.regs.f() & FLAG_C)
                        | FLAG_N
                        | if res == 0 { FLAG_Z } else { 0 }
                        | if val & 0x0F == 0 { FLAG_H } else { 0 },
                );
                self.write_operand(bus, operand, res)?;
            }
            Op::Inc16(r) => {
                let val = self.reg16(r).wrapping_add(1);
                self.set_reg16(r, val);
                bus.tick(1);
            }
            Op::Dec16(r) => {
                let val = self.reg16(r).wrapping_sub(1);
                self.set_reg16(r, val);
                bus.tick(1);
            }
            Op::AddHl(r) => {
                let hl = self.regs.hl();
                let rr = self.reg16(r);
                let res = hl.wrapping_add(rr);
                self.regs.set_f(
                    (self.regs.f() & FLAG_Z)
                        | if ((hl & 0x0FFF) + (rr & 0x0FFF)) & 0x1000 != 0 {
                            FLAG_H
                        } else {
                            0
                        }
                        | if (hl as u32 + rr as u32) > 0xFFFF {
                            FLAG_C
                        } else {
                            0
                        },
                );
                self.regs.set_hl(res);
                bus.tick(1);
            }
            Op::Alu(alu, operand) => {
                let val = self.read_operand(bus, operand)?;
                self.alu(alu, val);
            }
            Op::RotateA(rot) => {
                let a = self.regs.a;
                let carry_in = self.regs.f() & FLAG_C != 0;
                let (res, carry) = match rot {
                    RotOp::Rlc => (a.rotate_left(1), a & 0x80 != 0),
                    RotOp::Rrc => (a.rotate_right(1), a & 0x01 != 0),
                    RotOp::Rl => ((a << 1) | carry_in as u8, a & 0x80 != 0),
                    RotOp::Rr => ((a >> 1) | ((carry_in as u8) << 7), a & 0x01 != 0),
                    _ => unreachable!("only rotate forms exist on the accumulator"),
                };
                self.regs.a = res;
                // Accumulator rotates always clear Z.
                self.regs.set_f(if carry { FLAG_C } else { 0 });
            }
            Op::Daa => {
                // Standard BCD correction driven by the N/H/C left behind by
                // the preceding arithmetic.
                let f = self.regs.f();
                let mut correction = 0u8;
                let mut carry = false;
                if f & FLAG_H != 0 || (f & FLAG_N == 0 && (self.regs.a & 0x0F) > 9) {
                    correction |= 0x06;
                }
                if f & FLAG_C != 0 || (f & FLAG_N == 0 && self.regs.a > 0x99) {
                    correction |= 0x60;
                    carry = true;
                }
                if f & FLAG_N == 0 {
                    self.regs.a = self.regs.a.wrapping_add(correction);
                } else {
                    self.regs.a = self.regs.a.wrapping_sub(correction);
                }
                self.regs.set_f(
                    if self.regs.a == 0 { FLAG_Z } else { 0 }
                        | (f & FLAG_N)
                        | if carry { FLAG_C } else { 0 },
                );
            }
            Op::Cpl => {
                self.regs.a ^= 0xFF;
                self.regs
                    .set_f((self.regs.f() & (FLAG_Z | FLAG_C)) | FLAG_N | FLAG_H);
            }
            Op::Scf => {
                self.regs.set_f((self.regs.f() & FLAG_Z) | FLAG_C);
            }
            Op::Ccf => {
                let f = self.regs.f();
                self.regs
                    .set_f((f & FLAG_Z) | if f & FLAG_C != 0 { 0 } else { FLAG_C });
            }
            Op::JumpRel(cond) => {
                let offset = self.fetch8(bus)? as i8;
                if self.cond_met(cond) {
                    self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
                    bus.tick(1);
                }
            }
            Op::Jump(cond) => {
                let addr = self.fetch16(bus)?;
                if self.cond_met(cond) {
                    self.regs.pc = addr;
                    bus.tick(1);
                }
            }
            Op::JumpHl => {
                self.regs.pc = self.regs.hl();
            }
            Op::Call(cond) => {
                let addr = self.fetch16(bus)?;
                if self.cond_met(cond) {
                    bus.tick(1);
                    let ret = self.regs.pc;
                    self.push_stack(bus, ret)?;
                    self.regs.pc = addr;
                }
            }
            Op::Ret(None) => {
                self.regs.pc = self.pop_stack(bus)?;
                bus.tick(1);
            }
            Op::Ret(cond @ Some(_)) => {
                bus.tick(1);
                if self.cond_met(cond) {
                    self.regs.pc = self.pop_stack(bus)?;
                    bus.tick(1);
                }
            }
            Op::RetI => {
                // Unlike EI there is no latency here.
                self.regs.pc = self.pop_stack(bus)?;
                bus.ints.ime = true;
                bus.tick(1);
            }
            Op::Rst(target) => {
                bus.tick(1);
                let ret = self.regs.pc;
                self.push_stack(bus, ret)?;
                self.regs.pc = target;
            }
            Op::Push(sr) => {
                let val = match sr {
                    StackReg::BC => self.regs.bc(),
                    StackReg::DE => self.regs.de(),
                    StackReg::HL => self.regs.hl(),
                    StackReg::AF => self.regs.af(),
                };
                bus.tick(1);
                self.push_stack(bus, val)?;
            }
            Op::Pop(sr) => {
                let val = self.pop_stack(bus)?;
                match sr {
                    StackReg::BC => self.regs.set_bc(val),
                    StackReg::DE => self.regs.set_de(val),
                    StackReg::HL => self.regs.set_hl(val),
                    StackReg::AF => self.regs.set_af(val),
                }
            }
            Op::Prefix | Op::Cb(_) => {
                unreachable!("prefix dispatch is handled by the fetch loop")
            }
        }
        Ok(())
    }

    fn execute_cb(&mut self, cb: CbOp, bus: &mut Bus) -> Result<(), CoreError> {
        match cb {
            CbOp::Rotate(rot, operand) => {
                let val = self.read_operand(bus, operand)?;
                let carry_in = self.regs.f() & FLAG_C != 0;
                let (res, carry) = match rot {
                    RotOp::Rlc => (val.rotate_left(1), val & 0x80 != 0),
                    RotOp::Rrc => (val.rotate_right(1), val & 0x01 != 0),
                    RotOp::Rl => ((val << 1) | carry_in as u8, val & 0x80 != 0),
                    RotOp::Rr => ((val >> 1) | ((carry_in as u8) << 7), val & 0x01 != 0),
                    RotOp::Sla => (val << 1, val & 0x80 != 0),
                    RotOp::Sra => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
                    RotOp::Swap => (val.rotate_left(4), false),
                    RotOp::Srl => (val >> 1, val & 0x01 != 0),
                };
                self.regs
                    .set_f(if res == 0 { FLAG_Z } else { 0 } | if carry { FLAG_C } else { 0 });
                self.write_operand(bus, operand, res)?;
            }
            CbOp::Bit(bit, operand) => {
                let val = self.read_operand(bus, operand)?;
                self.regs.set_f(
                    (self.regs.f() & FLAG_C)
                        | FLAG_H
                        | if val & (1 << bit) == 0 { FLAG_Z } else { 0 },
                );
            }
            CbOp::Res(bit, operand) => {
                let val = self.read_operand(bus, operand)?;
                self.write_operand(bus, operand, val & !(1 << bit))?;
            }
            CbOp::Set(bit, operand) => {
                let val = self.read_operand(bus, operand)?;
                self.write_operand(bus, operand, val | (1 << bit))?;
            }
        }
        Ok(())
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
