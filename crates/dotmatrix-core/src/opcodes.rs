//! Immutable opcode descriptor tables.
//!
//! Decode is a lookup into two fixed arrays built once at startup: 256 base
//! entries and 256 CB-prefixed entries, each an [`Instruction`] descriptor
//! carrying the opcode byte, mnemonic, encoded length and a tagged operation.
//! The eleven undefined base opcodes have no entry; hitting one is a fatal
//! decode error, never a silent skip.

use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg8 {
    B,
    C,
    D,
    E,
    H,
    L,
    A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg16 {
    BC,
    DE,
    HL,
    SP,
}

/// Register pairs addressable by PUSH/POP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackReg {
    BC,
    DE,
    HL,
    AF,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    NZ,
    Z,
    NC,
    C,
}

/// 8-bit operand of an ALU, INC/DEC or CB operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg8),
    HlIndirect,
    Immediate,
}

/// Addressing forms used by the loads between A and memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pointer {
    Bc,
    De,
    HlInc,
    HlDec,
    Absolute,
    High,
    HighC,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
}

/// CB-prefixed operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbOp {
    Rotate(RotOp, Operand),
    Bit(u8, Operand),
    Res(u8, Operand),
    Set(u8, Operand),
}

/// The tagged operation a descriptor dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Nop,
    Stop,
    Halt,
    DisableInterrupts,
    EnableInterrupts,
    Load { dst: Operand, src: Operand },
    LoadAFrom(Pointer),
    StoreATo(Pointer),
    Load16(Reg16),
    StoreSp,
    LoadSpHl,
    LoadHlSpOffset,
    AddSpOffset,
    Inc(Operand),
    Dec(Operand),
    Inc16(Reg16),
    Dec16(Reg16),
    AddHl(Reg16),
    Alu(AluOp, Operand),
    RotateA(RotOp),
    Daa,
    Cpl,
    Scf,
    Ccf,
    JumpRel(Option<Cond>),
    Jump(Option<Cond>),
    JumpHl,
    Call(Option<Cond>),
    Ret(Option<Cond>),
    RetI,
    Rst(u16),
    Push(StackReg),
    Pop(StackReg),
    Prefix,
    Cb(CbOp),
}

/// Immutable instruction descriptor.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: String,
    /// Encoded length in bytes, including any prefix and immediates.
    pub length: u8,
    pub op: Op,
}

static BASE: LazyLock<[Option<Instruction>; 256]> = LazyLock::new(base_table);
static PREFIXED: LazyLock<[Instruction; 256]> = LazyLock::new(prefixed_table);

/// Descriptor for a base opcode byte, if one is defined.
pub fn base(opcode: u8) -> Option<&'static Instruction> {
    BASE[opcode as usize].as_ref()
}

/// Descriptor for a CB-prefixed opcode byte. Every byte is defined.
pub fn prefixed(opcode: u8) -> &'static Instruction {
    &PREFIXED[opcode as usize]
}

/// Mnemonic lookup for disassembly and error reports.
pub fn mnemonic(opcode: u8, prefixed_set: bool) -> Option<String> {
    if prefixed_set {
        Some(prefixed(opcode).mnemonic.clone())
    } else {
        base(opcode).map(|i| i.mnemonic.clone())
    }
}

/// The canonical r8 operand order used by the regular opcode rows.
const OPERANDS: [(Operand, &str); 8] = [
    (Operand::Reg(Reg8::B), "B"),
    (Operand::Reg(Reg8::C), "C"),
    (Operand::Reg(Reg8::D), "D"),
    (Operand::Reg(Reg8::E), "E"),
    (Operand::Reg(Reg8::H), "H"),
    (Operand::Reg(Reg8::L), "L"),
    (Operand::HlIndirect, "(HL)"),
    (Operand::Reg(Reg8::A), "A"),
];

fn base_table() -> [Option<Instruction>; 256] {
    let mut table: [Option<Instruction>; 256] = [const { None }; 256];

    let mut set = |opcode: u8, mnemonic: &str, length: u8, op: Op| {
        table[opcode as usize] = Some(Instruction {
            opcode,
            mnemonic: mnemonic.to_string(),
            length,
            op,
        });
    };

    // 0x00-0x3F: the irregular quadrant.
    set(0x00, "NOP", 1, Op::Nop);
    set(0x01, "LD BC,d16", 3, Op::Load16(Reg16::BC));
    set(0x02, "LD (BC),A", 1, Op::StoreATo(Pointer::Bc));
    set(0x03, "INC BC", 1, Op::Inc16(Reg16::BC));
    set(0x07, "RLCA", 1, Op::RotateA(RotOp::Rlc));
    set(0x08, "LD (a16),SP", 3, Op::StoreSp);
    set(0x09, "ADD HL,BC", 1, Op::AddHl(Reg16::BC));
    set(0x0A, "LD A,(BC)", 1, Op::LoadAFrom(Pointer::Bc));
    set(0x0B, "DEC BC", 1, Op::Dec16(Reg16::BC));
    set(0x0F, "RRCA", 1, Op::RotateA(RotOp::Rrc));

    set(0x10, "STOP", 2, Op::Stop);
    set(0x11, "LD DE,d16", 3, Op::Load16(Reg16::DE));
    set(0x12, "LD (DE),A", 1, Op::StoreATo(Pointer::De));
    set(0x13, "INC DE", 1, Op::Inc16(Reg16::DE));
    set(0x17, "RLA", 1, Op::RotateA(RotOp::Rl));
    set(0x18, "JR r8", 2, Op::JumpRel(None));
    set(0x19, "ADD HL,DE", 1, Op::AddHl(Reg16::DE));
    set(0x1A, "LD A,(DE)", 1, Op::LoadAFrom(Pointer::De));
    set(0x1B, "DEC DE", 1, Op::Dec16(Reg16::DE));
    set(0x1F, "RRA", 1, Op::RotateA(RotOp::Rr));

    set(0x20, "JR NZ,r8", 2, Op::JumpRel(Some(Cond::NZ)));
    set(0x21, "LD HL,d16", 3, Op::Load16(Reg16::HL));
    set(0x22, "LD (HL+),A", 1, Op::StoreATo(Pointer::HlInc));
    set(0x23, "INC HL", 1, Op::Inc16(Reg16::HL));
    set(0x27, "DAA", 1, Op::Daa);
    set(0x28, "JR Z,r8", 2, Op::JumpRel(Some(Cond::Z)));
    set(0x29, "ADD HL,HL", 1, Op::AddHl(Reg16::HL));
    set(0x2A, "LD A,(HL+)", 1, Op::LoadAFrom(Pointer::HlInc));
    set(0x2B, "DEC HL", 1, Op::Dec16(Reg16::HL));
    set(0x2F, "CPL", 1, Op::Cpl);

    set(0x30, "JR NC,r8", 2, Op::JumpRel(Some(Cond::NC)));
    set(0x31, "LD SP,d16", 3, Op::Load16(Reg16::SP));
    set(0x32, "LD (HL-),A", 1, Op::StoreATo(Pointer::HlDec));
    set(0x33, "INC SP", 1, Op::Inc16(Reg16::SP));
    set(0x37, "SCF", 1, Op::Scf);
    set(0x38, "JR C,r8", 2, Op::JumpRel(Some(Cond::C)));
    set(0x39, "ADD HL,SP", 1, Op::AddHl(Reg16::SP));
    set(0x3A, "LD A,(HL-)", 1, Op::LoadAFrom(Pointer::HlDec));
    set(0x3B, "DEC SP", 1, Op::Dec16(Reg16::SP));
    set(0x3F, "CCF", 1, Op::Ccf);

    // INC r / DEC r / LD r,d8 columns.
    for (i, (operand, name)) in OPERANDS.iter().enumerate() {
        let row = (i as u8) << 3;
        set(0x04 | row, &format!("INC {name}"), 1, Op::Inc(*operand));
        set(0x05 | row, &format!("DEC {name}"), 1, Op::Dec(*operand));
        set(
            0x06 | row,
            &format!("LD {name},d8"),
            2,
            Op::Load {
                dst: *operand,
                src: Operand::Immediate,
            },
        );
    }

    // 0x40-0x7F: the LD r,r' block, with HALT in the (HL),(HL) slot.
    for code in 0x40..=0x7Fu8 {
        if code == 0x76 {
            set(0x76, "HALT", 1, Op::Halt);
            continue;
        }
        let (dst, dst_name) = OPERANDS[((code >> 3) & 0x07) as usize];
        let (src, src_name) = OPERANDS[(code & 0x07) as usize];
        set(
            code,
            &format!("LD {dst_name},{src_name}"),
            1,
            Op::Load { dst, src },
        );
    }

    // 0x80-0xBF: the ALU block.
    const ALU_ROWS: [(&str, AluOp); 8] = [
        ("ADD A,", AluOp::Add),
        ("ADC A,", AluOp::Adc),
        ("SUB ", AluOp::Sub),
        ("SBC A,", AluOp::Sbc),
        ("AND ", AluOp::And),
        ("XOR ", AluOp::Xor),
        ("OR ", AluOp::Or),
        ("CP ", AluOp::Cp),
    ];
    for code in 0x80..=0xBFu8 {
        let (prefix, alu) = ALU_ROWS[((code - 0x80) >> 3) as usize];
        let (operand, name) = OPERANDS[(code & 0x07) as usize];
        set(code, &format!("{prefix}{name}"), 1, Op::Alu(alu, operand));
    }

    // 0xC0-0xFF: control flow, stack ops and ALU immediates. The gaps
    // (0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB-0xED, 0xF4, 0xFC, 0xFD) stay
    // empty on purpose.
    set(0xC0, "RET NZ", 1, Op::Ret(Some(Cond::NZ)));
    set(0xC1, "POP BC", 1, Op::Pop(StackReg::BC));
    set(0xC2, "JP NZ,a16", 3, Op::Jump(Some(Cond::NZ)));
    set(0xC3, "JP a16", 3, Op::Jump(None));
    set(0xC4, "CALL NZ,a16", 3, Op::Call(Some(Cond::NZ)));
    set(0xC5, "PUSH BC", 1, Op::Push(StackReg::BC));
    set(0xC6, "ADD A,d8", 2, Op::Alu(AluOp::Add, Operand::Immediate));
    set(0xC7, "RST 00H", 1, Op::Rst(0x00));
    set(0xC8, "RET Z", 1, Op::Ret(Some(Cond::Z)));
    set(0xC9, "RET", 1, Op::Ret(None));
    set(0xCA, "JP Z,a16", 3, Op::Jump(Some(Cond::Z)));
    set(0xCB, "PREFIX CB", 1, Op::Prefix);
    set(0xCC, "CALL Z,a16", 3, Op::Call(Some(Cond::Z)));
    set(0xCD, "CALL a16", 3, Op::Call(None));
    set(0xCE, "ADC A,d8", 2, Op::Alu(AluOp::Adc, Operand::Immediate));
    set(0xCF, "RST 08H", 1, Op::Rst(0x08));

    set(0xD0, "RET NC", 1, Op::Ret(Some(Cond::NC)));
    set(0xD1, "POP DE", 1, Op::Pop(StackReg::DE));
    set(0xD2, "JP NC,a16", 3, Op::Jump(Some(Cond::NC)));
    set(0xD4, "CALL NC,a16", 3, Op::Call(Some(Cond::NC)));
    set(0xD5, "PUSH DE", 1, Op::Push(StackReg::DE));
    set(0xD6, "SUB d8", 2, Op::Alu(AluOp::Sub, Operand::Immediate));
    set(0xD7, "RST 10H", 1, Op::Rst(0x10));
    set(0xD8, "RET C", 1, Op::Ret(Some(Cond::C)));
    set(0xD9, "RETI", 1, Op::RetI);
    set(0xDA, "JP C,a16", 3, Op::Jump(Some(Cond::C)));
    set(0xDC, "CALL C,a16", 3, Op::Call(Some(Cond::C)));
    set(0xDE, "SBC A,d8", 2, Op::Alu(AluOp::Sbc, Operand::Immediate));
    set(0xDF, "RST 18H", 1, Op::Rst(0x18));

    set(0xE0, "LDH (a8),A", 2, Op::StoreATo(Pointer::High));
    set(0xE1, "POP HL", 1, Op::Pop(StackReg::HL));
    set(0xE2, "LD (C),A", 1, Op::StoreATo(Pointer::HighC));
    set(0xE5, "PUSH HL", 1, Op::Push(StackReg::HL));
    set(0xE6, "AND d8", 2, Op::Alu(AluOp::And, Operand::Immediate));
    set(0xE7, "RST 20H", 1, Op::Rst(0x20));
    set(0xE8, "ADD SP,r8", 2, Op::AddSpOffset);
    set(0xE9, "JP (HL)", 1, Op::JumpHl);
    set(0xEA, "LD (a16),A", 3, Op::StoreATo(Pointer::Absolute));
    set(0xEE, "XOR d8", 2, Op::Alu(AluOp::Xor, Operand::Immediate));
    set(0xEF, "RST 28H", 1, Op::Rst(0x28));

    set(0xF0, "LDH A,(a8)", 2, Op::LoadAFrom(Pointer::High));
    set(0xF1, "POP AF", 1, Op::Pop(StackReg::AF));
    set(0xF2, "LD A,(C)", 1, Op::LoadAFrom(Pointer::HighC));
    set(0xF3, "DI", 1, Op::DisableInterrupts);
    set(0xF5, "PUSH AF", 1, Op::Push(StackReg::AF));
    set(0xF6, "OR d8", 2, Op::Alu(AluOp::Or, Operand::Immediate));
    set(0xF7, "RST 30H", 1, Op::Rst(0x30));
    set(0xF8, "LD HL,SP+r8", 2, Op::LoadHlSpOffset);
    set(0xF9, "LD SP,HL", 1, Op::LoadSpHl);
    set(0xFA, "LD A,(a16)", 3, Op::LoadAFrom(Pointer::Absolute));
    set(0xFB, "EI", 1, Op::EnableInterrupts);
    set(0xFE, "CP d8", 2, Op::Alu(AluOp::Cp, Operand::Immediate));
    set(0xFF, "RST 38H", 1, Op::Rst(0x38));

    table
}

fn prefixed_table() -> [Instruction; 256] {
    const ROT_ROWS: [(&str, RotOp); 8] = [
        ("RLC", RotOp::Rlc),
        ("RRC", RotOp::Rrc),
        ("RL", RotOp::Rl),
        ("RR", RotOp::Rr),
        ("SLA", RotOp::Sla),
        ("SRA", RotOp::Sra),
        ("SWAP", RotOp::Swap),
        ("SRL", RotOp::Srl),
    ];

    std::array::from_fn(|i| {
        let opcode = i as u8;
        let (operand, name) = OPERANDS[(opcode & 0x07) as usize];
        let bit = (opcode >> 3) & 0x07;
        let (mnemonic, cb) = match opcode >> 6 {
            0 => {
                let (rot_name, rot) = ROT_ROWS[((opcode >> 3) & 0x07) as usize];
                (format!("{rot_name} {name}"), CbOp::Rotate(rot, operand))
            }
            1 => (format!("BIT {bit},{name}"), CbOp::Bit(bit, operand)),
            2 => (format!("RES {bit},{name}"), CbOp::Res(bit, operand)),
            _ => (format!("SET {bit},{name}"), CbOp::Set(bit, operand)),
        };
        Instruction {
            opcode,
            mnemonic,
            length: 2,
            op: Op::Cb(cb),
        }
    })
}
