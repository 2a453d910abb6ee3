//! Primitive implementation of the stages
//!
//! Both engines run instructions through these functions. The pipelined
//! engine spreads them across cycles and supplies forwarded operands; the
//! single-cycle engine calls them back to back.

use log::debug;
use log::warn;

use crate::alu::alu;
use crate::alu::branch_taken;
use crate::cpu::RegisterFile;
use crate::error::Advisory;
use crate::error::ExecutionError;
use crate::error::SimulatorResult;
use crate::instruction::Instruction;
use crate::instruction::JumpTarget;
use crate::instruction::Operation;
use crate::memory::StorageInterface;
use crate::system_call::syscall;
use crate::system_call::SystemCall;

/// Output of the EX stage
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Executed {
    /// ALU result, effective address or link index
    pub result: i32,
    /// Where control goes when a branch is taken or a jump executes
    pub target: Option<usize>,
    /// Exit system call
    pub exit: bool,
}

/// Records a non-fatal condition and reports it
pub fn advise(advisories: &mut Vec<Advisory>, advisory: Advisory) {
    warn!("{}", advisory);
    advisories.push(advisory);
}

/// ID: Register read
pub fn register_read(inst: &Instruction, gpr: &RegisterFile) -> (i32, i32) {
    let [rs, rt] = inst.sources();
    (gpr.read(rs.unwrap_or(0)), gpr.read(rt.unwrap_or(0)))
}

/// EX: Compute stuff.
/// `return_index` is what `jal` links into `$ra`.
pub fn execute(
    inst: &Instruction,
    op1: i32,
    op2: i32,
    return_index: usize,
    advisories: &mut Vec<Advisory>,
) -> SimulatorResult<Executed> {
    debug!("Executing: {}; op1: {:#010x}; op2: {:#010x}", inst, op1, op2);

    let mut executed = Executed::default();
    match inst.operation {
        Operation::RAlu { op, .. } => executed.result = alu(op, op1, op2),
        Operation::IAlu { op, imm, .. } => executed.result = alu(op, op1, imm),
        Operation::Load { offset, .. } | Operation::Store { offset, .. } => {
            executed.result = op1.wrapping_add(offset)
        }
        Operation::Branch { cond, target, .. } => {
            if branch_taken(cond, op1, op2) {
                executed.target = Some(target);
            }
        }
        Operation::Jump { target, link } => {
            executed.target = Some(match target {
                JumpTarget::Index(index) => index,
                JumpTarget::Register(_) => usize::try_from(op1).map_err(|_| {
                    ExecutionError::InvalidJumpTarget { index: inst.index, target: op1 }
                })?,
            });
            if link {
                executed.result = return_index as i32;
            }
        }
        Operation::SystemCall => {
            executed.exit = syscall(inst.index, op1, advisories) == SystemCall::Exit;
        }
        Operation::NoOp => {}
    }
    Ok(executed)
}

/// MEM: Access memory.
/// Returns the value headed for write back.
pub fn memory_access(
    inst: &Instruction,
    result: i32,
    store_value: i32,
    mem: &mut impl StorageInterface,
    advisories: &mut Vec<Advisory>,
) -> i32 {
    if !inst.is_memory() {
        return result;
    }

    let address = result as u32;
    if !mem.is_aligned(address) {
        advise(advisories, Advisory::MisalignedAccess { index: inst.index, address });
    }

    if inst.is_load() {
        let value = mem.load_word(address);
        debug!("Loaded {} from {:#010x}", value, address);
        value
    } else {
        debug!("Stored {} to {:#010x}", store_value, address);
        mem.store_word(address, store_value);
        result
    }
}

/// WB: Write stuff back to the selected register
pub fn write_back(inst: &Instruction, value: i32, gpr: &mut RegisterFile) {
    if let Some(rd) = inst.dest() {
        gpr.write(rd, value);
    }
}
