//! Instruction representation

use std::fmt;

use crate::alu::ALUOp;
use crate::alu::BranchCond;

pub mod decode_helper;

/// Register number, 0..=31
pub type RegId = u8;

/// Hard-wired zero register
pub const ZERO: RegId = 0;
/// Syscall code register
pub const V0: RegId = 2;
/// First argument register
pub const A0: RegId = 4;
/// Return address register
pub const RA: RegId = 31;

/// Decoded instruction. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Position in the program image
    pub index: usize,
    /// Mnemonic as written
    pub mnemonic: Mnemonic,
    /// What the instruction does
    pub operation: Operation,
    /// Source text, used as the display label
    pub text: String,
}

impl Instruction {
    pub fn new(
        index: usize,
        mnemonic: Mnemonic,
        operation: Operation,
        text: impl Into<String>,
    ) -> Self {
        Self { index, mnemonic, operation, text: text.into() }
    }

    pub fn category(&self) -> Category {
        match self.operation {
            Operation::RAlu { .. } => Category::RAlu,
            Operation::IAlu { .. } => Category::IAlu,
            Operation::Load { .. } => Category::Load,
            Operation::Store { .. } => Category::Store,
            Operation::Branch { .. } => Category::Branch,
            Operation::Jump { .. } => Category::Jump,
            Operation::NoOp => Category::NoOp,
            Operation::SystemCall => Category::SystemCall,
        }
    }

    /// Register written back, if any.
    /// May be `ZERO`, in which case the write is discarded.
    pub fn dest(&self) -> Option<RegId> {
        match self.operation {
            Operation::RAlu { rd, .. } => Some(rd),
            Operation::IAlu { rt, .. } => Some(rt),
            Operation::Load { rt, .. } => Some(rt),
            Operation::Jump { link: true, .. } => Some(RA),
            _ => None,
        }
    }

    /// Registers read, in operand order (op1, op2)
    pub fn sources(&self) -> [Option<RegId>; 2] {
        match self.operation {
            Operation::RAlu { rs, rt, .. } => [Some(rs), Some(rt)],
            Operation::IAlu { rs, .. } => [Some(rs), None],
            Operation::Load { base, .. } => [Some(base), None],
            Operation::Store { rt, base, .. } => [Some(base), Some(rt)],
            Operation::Branch { rs, rt, .. } => [Some(rs), Some(rt)],
            Operation::Jump { target: JumpTarget::Register(rs), .. } => {
                [Some(rs), None]
            }
            Operation::SystemCall => [Some(V0), Some(A0)],
            Operation::Jump { .. } | Operation::NoOp => [None, None],
        }
    }

    /// Whether `reg` is read by this instruction.
    /// Register 0 never counts, it cannot carry a dependency.
    pub fn reads(&self, reg: RegId) -> bool {
        reg != ZERO && self.sources().contains(&Some(reg))
    }

    /// Branches and jumps open a delay-slot window
    pub fn is_control(&self) -> bool {
        matches!(self.category(), Category::Branch | Category::Jump)
    }

    pub fn is_load(&self) -> bool {
        self.category() == Category::Load
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.category(), Category::Load | Category::Store)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Instruction category
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    RAlu,
    IAlu,
    Load,
    Store,
    Branch,
    Jump,
    NoOp,
    SystemCall,
}

/// Per-category payload. Each variant carries only what it needs.
///
/// ALU forms compute `alu(op, R[rs], R[rt])` or `alu(op, R[rs], imm)`;
/// the decoder maps assembly operand order onto these fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    RAlu { op: ALUOp, rd: RegId, rs: RegId, rt: RegId },
    IAlu { op: ALUOp, rt: RegId, rs: RegId, imm: i32 },
    Load { rt: RegId, base: RegId, offset: i32 },
    Store { rt: RegId, base: RegId, offset: i32 },
    /// `target` is an absolute instruction index
    Branch { cond: BranchCond, rs: RegId, rt: RegId, target: usize },
    /// `link` writes the return index to `$ra`
    Jump { target: JumpTarget, link: bool },
    NoOp,
    SystemCall,
}

/// Where a jump goes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpTarget {
    /// Absolute instruction index
    Index(usize),
    /// Instruction index held in a register
    Register(RegId),
}

/// Modeled mnemonics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mnemonic {
    ADD,
    SUB,
    AND,
    OR,
    XOR,
    NOR,
    SLT,
    SLLV,
    SRLV,
    SLL,
    SRL,
    SRA,
    ADDI,
    SLTI,
    ANDI,
    ORI,
    LUI,
    LI,
    LA,
    MOVE,
    LW,
    SW,
    BEQ,
    BNE,
    J,
    JAL,
    JR,
    SYSCALL,
    NOP,
}

impl Mnemonic {
    pub fn parse(token: &str) -> Option<Self> {
        use Mnemonic::*;
        Some(match token.to_ascii_lowercase().as_str() {
            "add" => ADD,
            "sub" => SUB,
            "and" => AND,
            "or" => OR,
            "xor" => XOR,
            "nor" => NOR,
            "slt" => SLT,
            "sllv" => SLLV,
            "srlv" => SRLV,
            "sll" => SLL,
            "srl" => SRL,
            "sra" => SRA,
            "addi" => ADDI,
            "slti" => SLTI,
            "andi" => ANDI,
            "ori" => ORI,
            "lui" => LUI,
            "li" => LI,
            "la" => LA,
            "move" => MOVE,
            "lw" => LW,
            "sw" => SW,
            "beq" => BEQ,
            "bne" => BNE,
            "j" => J,
            "jal" => JAL,
            "jr" => JR,
            "syscall" => SYSCALL,
            "nop" => NOP,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        use Mnemonic::*;
        match self {
            ADD => "add",
            SUB => "sub",
            AND => "and",
            OR => "or",
            XOR => "xor",
            NOR => "nor",
            SLT => "slt",
            SLLV => "sllv",
            SRLV => "srlv",
            SLL => "sll",
            SRL => "srl",
            SRA => "sra",
            ADDI => "addi",
            SLTI => "slti",
            ANDI => "andi",
            ORI => "ori",
            LUI => "lui",
            LI => "li",
            LA => "la",
            MOVE => "move",
            LW => "lw",
            SW => "sw",
            BEQ => "beq",
            BNE => "bne",
            J => "j",
            JAL => "jal",
            JR => "jr",
            SYSCALL => "syscall",
            NOP => "nop",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
