//! ALU implementation

/// Performs an atomic ALU operation
/// Everything wraps at 32 bits
pub fn alu(op: ALUOp, op1: i32, op2: i32) -> i32 {
    match op {
        ALUOp::ADD => op1.wrapping_add(op2),
        ALUOp::SUB => op1.wrapping_sub(op2),
        ALUOp::AND => op1 & op2,
        ALUOp::OR => op1 | op2,
        ALUOp::XOR => op1 ^ op2,
        ALUOp::NOR => !(op1 | op2),
        ALUOp::SLT => (op1 < op2) as i32,
        // Shift amounts only use the low 5 bits
        ALUOp::SLL => op1.wrapping_shl(op2 as u32),
        ALUOp::SRL => ((op1 as u32).wrapping_shr(op2 as u32)) as i32,
        ALUOp::SRA => op1.wrapping_shr(op2 as u32),
        ALUOp::LUI => op2.wrapping_shl(16),
    }
}

/// Evaluates a branch condition
pub fn branch_taken(cond: BranchCond, op1: i32, op2: i32) -> bool {
    match cond {
        BranchCond::BEQ => op1 == op2,
        BranchCond::BNE => op1 != op2,
    }
}

/// Set of ALU operations needed for the modeled subset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ALUOp {
    // Arithmetic
    #[default]
    ADD,
    SUB,
    // Logical
    AND,
    OR,
    XOR,
    NOR,
    // Set
    SLT,
    // Shift
    SLL,
    SRL,
    SRA,
    // Upper immediate, op1 is ignored
    LUI,
}

/// Branch comparisons
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchCond {
    BEQ,
    BNE,
}
