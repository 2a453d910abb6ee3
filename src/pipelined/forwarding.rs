//! Operand forwarding
//!
//! EX reads its operands after MEM and WB have been filled for the cycle,
//! so the two instructions directly ahead are visible. The younger one
//! wins; a load one stage ahead has no value yet, which is what the
//! load-use stall covers.

use crate::instruction::RegId;
use crate::instruction::ZERO;
use crate::pipelined::hazard::HazardPolicy;
use crate::pipelined::pipeline::PipelineState;
use crate::pipelined::pipeline::Slot;

fn produced(slot: &Slot, reg: RegId) -> Option<i32> {
    let f = slot.in_flight()?;
    if f.inst.dest() == Some(reg) {
        f.result
    } else {
        None
    }
}

/// Operand 1 or 2 for the instruction entering EX.
/// `captured` is what decode read from the register file.
pub fn resolve(
    policy: HazardPolicy,
    state: &PipelineState,
    reg: Option<RegId>,
    captured: i32,
) -> i32 {
    let Some(reg) = reg.filter(|r| *r != ZERO) else {
        return captured;
    };

    // EX -> EX
    if policy.forwards_from_memory_stage()
        && !state.memory.instruction().is_some_and(|i| i.is_load())
    {
        if let Some(value) = produced(&state.memory, reg) {
            return value;
        }
    }

    // MEM -> EX
    produced(&state.write_back, reg).unwrap_or(captured)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::alu::ALUOp;
    use crate::instruction::Instruction;
    use crate::instruction::Mnemonic;
    use crate::instruction::Operation;
    use crate::pipelined::pipeline::InFlight;

    fn producer(operation: Operation, result: i32) -> Slot {
        let inst = Rc::new(Instruction::new(0, Mnemonic::NOP, operation, ""));
        let mut f = InFlight::new(inst, false);
        f.result = Some(result);
        Slot::Busy(f)
    }

    fn addi(rt: RegId, result: i32) -> Slot {
        producer(Operation::IAlu { op: ALUOp::ADD, rt, rs: 0, imm: result }, result)
    }

    #[test]
    fn younger_producer_wins() {
        let state = PipelineState {
            memory: addi(8, 2),
            write_back: addi(8, 1),
            ..Default::default()
        };
        assert_eq!(resolve(HazardPolicy::ForwardStallOnLoad, &state, Some(8), 0), 2);
        assert_eq!(resolve(HazardPolicy::StallOnly, &state, Some(8), 0), 1);
    }

    #[test]
    fn load_one_stage_ahead_is_not_forwarded() {
        let state = PipelineState {
            memory: producer(Operation::Load { rt: 8, base: 0, offset: 0 }, 99),
            ..Default::default()
        };
        assert_eq!(resolve(HazardPolicy::ForwardStallOnLoad, &state, Some(8), 5), 5);
    }

    #[test]
    fn zero_and_unrelated_use_captured() {
        let state = PipelineState { memory: addi(0, 7), ..Default::default() };
        assert_eq!(resolve(HazardPolicy::ForwardStallOnLoad, &state, Some(0), 0), 0);
        assert_eq!(resolve(HazardPolicy::ForwardStallOnLoad, &state, Some(9), 4), 4);
        assert_eq!(resolve(HazardPolicy::ForwardStallOnLoad, &state, None, 3), 3);
    }
}
