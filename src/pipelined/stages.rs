//! 5 stages adapted for pipelined execution
//!
//! Each function fills one slot of `next_state` from `current_state`.
//! They run in WB, MEM, EX, ID, IF order so a stage sees what the stages
//! ahead of it produced this cycle.

use log::debug;

use super::delay_slot::DelaySlotController;
use super::forwarding;
use super::hazard;
use super::hazard::HazardDecision;
use super::pipeline::InFlight;
use super::pipeline::PipelineState;
use super::pipeline::Slot;
use crate::cpu::CPUState;
use crate::error::Advisory;
use crate::error::SimulatorResult;
use crate::instruction::Category;
use crate::memory::latency::LatencyProvider;
use crate::memory::StorageInterface;
use crate::program::Program;
use crate::stages_simple;

/// IF stage
pub fn instruction_fetch(
    cpu: &mut CPUState,
    program: &mut Program,
    delay_slot: &mut DelaySlotController,
    current_state: &PipelineState,
    next_state: &mut PipelineState,
) -> SimulatorResult<()> {
    if current_state.decode_stall.stalls() {
        // ID did not take the fetched instruction
        next_state.fetch = current_state.fetch.clone();
        return Ok(());
    }

    if delay_slot.take_bubble() {
        cpu.history.bubble_count += 1;
        next_state.fetch = Slot::Bubble;
        return Ok(());
    }

    if let Some(target) = delay_slot.redirect(cpu.pc, program.len()) {
        debug!("Jumping from {} to {}", cpu.pc, target);
        cpu.pc = target;
    }

    let pc = cpu.pc;
    let Some(inst) = program.fetch(pc)? else {
        next_state.fetch = Slot::Empty;
        return Ok(());
    };
    cpu.pc = pc + 1;
    cpu.history.fetch_count += 1;

    let in_slot = delay_slot.fetched(&inst);
    debug!("PC: {}; Instruction: {}", pc, inst);
    next_state.fetch = Slot::Busy(InFlight::new(inst, in_slot));
    Ok(())
}

/// ID stage.
/// Reads registers and checks the instruction against the one now in EX.
pub fn instruction_decode(
    cpu: &mut CPUState,
    current_state: &PipelineState,
    next_state: &mut PipelineState,
    draining: bool,
) {
    let incoming = if current_state.decode_stall.stalls() {
        &current_state.decode
    } else {
        &current_state.fetch
    };

    if draining {
        if incoming.in_flight().is_some() {
            cpu.history.squashed_count += 1;
        }
        next_state.decode = Slot::Empty;
        next_state.decode_stall = HazardDecision::Proceed;
        return;
    }

    let mut slot = incoming.clone();
    if let Some(f) = slot.in_flight_mut() {
        (f.op1, f.op2) = stages_simple::register_read(&f.inst, &cpu.gpr);
    }

    next_state.decode_stall = match slot.instruction() {
        Some(inst) => hazard::detect(
            cpu.policy.hazard,
            inst,
            next_state.execute.instruction(),
        ),
        None => HazardDecision::Proceed,
    };
    if next_state.decode_stall.stalls() {
        debug!("Stalling decode: {:?}", next_state.decode_stall);
    }
    next_state.decode = slot;
}

/// EX stage.
/// Returns true when an exit system call executed.
pub fn execute(
    cpu: &mut CPUState,
    delay_slot: &mut DelaySlotController,
    advisories: &mut Vec<Advisory>,
    current_state: &PipelineState,
    next_state: &mut PipelineState,
) -> SimulatorResult<bool> {
    if let HazardDecision::StallOneCycle { load_use } = current_state.decode_stall {
        debug!("Inserting bubble due to data hazard");
        cpu.history.hazard_stall_count += 1;
        cpu.history.bubble_count += 1;
        if load_use {
            cpu.history.load_stall_count += 1;
        }
        next_state.execute = Slot::Bubble;
        return Ok(false);
    }

    let mut slot = current_state.decode.clone();
    let mut exit = false;
    if let Some(f) = slot.in_flight_mut() {
        let [rs, rt] = f.inst.sources();
        let policy = cpu.policy.hazard;
        f.op1 = forwarding::resolve(policy, next_state, rs, f.op1);
        f.op2 = forwarding::resolve(policy, next_state, rt, f.op2);

        let return_index = delay_slot.policy().return_index(f.inst.index);
        let executed =
            stages_simple::execute(&f.inst, f.op1, f.op2, return_index, advisories)?;
        f.result = Some(executed.result);

        if f.inst.is_control() {
            cpu.history.control_count += 1;
        }
        if let Some(target) = executed.target {
            cpu.history.branch_taken_count += 1;
            delay_slot.resolve(target);
        }
        exit = executed.exit;
    }
    next_state.execute = slot;
    Ok(exit)
}

/// MEM stage, when the previous occupant has finished
pub fn memory_access(
    mem: &mut impl StorageInterface,
    latency: &mut dyn LatencyProvider,
    advisories: &mut Vec<Advisory>,
    current_state: &PipelineState,
    next_state: &mut PipelineState,
) {
    let mut slot = current_state.execute.clone();
    if let Some(f) = slot.in_flight_mut() {
        if f.inst.is_memory() {
            f.remaining = latency.next_latency(&f.inst);
            debug!("Memory access by {} takes {} cycle(s)", f.inst, f.remaining);
        }
        advance_memory(f, mem, advisories);
    }
    next_state.memory = slot;
}

/// MEM stage, when the occupant is still waiting on memory.
/// Everything behind MEM stays where it is.
pub fn memory_hold(
    cpu: &mut CPUState,
    mem: &mut impl StorageInterface,
    advisories: &mut Vec<Advisory>,
    current_state: &PipelineState,
    next_state: &mut PipelineState,
) {
    next_state.fetch = current_state.fetch.clone();
    next_state.decode = current_state.decode.clone();
    next_state.execute = current_state.execute.clone();
    next_state.decode_stall = current_state.decode_stall;
    next_state.write_back = Slot::Empty;

    let mut slot = current_state.memory.clone();
    if let Some(f) = slot.in_flight_mut() {
        cpu.history.mem_stall_count += 1;
        cpu.history.mem_wasted_count += 1;
        if f.inst.is_load() {
            cpu.history.load_stall_count += 1;
        }
        advance_memory(f, mem, advisories);
    }
    next_state.memory = slot;
}

/// One cycle of memory work. The access itself happens in the last cycle.
fn advance_memory(
    f: &mut InFlight,
    mem: &mut impl StorageInterface,
    advisories: &mut Vec<Advisory>,
) {
    if f.remaining > 1 {
        f.remaining -= 1;
        return;
    }
    let result = f.result.unwrap_or(0);
    f.result = Some(stages_simple::memory_access(&f.inst, result, f.op2, mem, advisories));
    f.remaining = 0;
    f.mem_done = true;
}

/// WB stage
pub fn write_back(
    cpu: &mut CPUState,
    current_state: &PipelineState,
    next_state: &mut PipelineState,
) {
    let slot = current_state.memory.clone();
    if let Some(f) = slot.in_flight() {
        stages_simple::write_back(&f.inst, f.result.unwrap_or(0), &mut cpu.gpr);
        cpu.update_inst_count(1);
        if f.delay_slot && f.inst.category() != Category::NoOp {
            cpu.history.delay_slot_filled_count += 1;
        }
        debug!("Retired: {}", f.inst);
    }
    next_state.write_back = slot;
}
