//! Single cycle implementation
//!
//! Runs one whole instruction per cycle with the same delayed-branch
//! behavior as the pipeline. Used as the reference for final state.

use log::debug;
use log::info;

use crate::cpu::CPUState;
use crate::error::Advisory;
use crate::error::ExecutionError;
use crate::error::SimulatorResult;
use crate::instruction::Category;
use crate::memory::StorageInterface;
use crate::program::Program;
use crate::stages_simple::*;

/// Runs `program` to completion, or to an exit system call
pub fn run(
    cpu: &mut CPUState,
    mem: &mut impl StorageInterface,
    program: &mut Program,
    advisories: &mut Vec<Advisory>,
) -> SimulatorResult<()> {
    let delay_slot = cpu.policy.delay_slot;
    // Delay slots still to run after the newest branch or jump
    let mut window_left: usize = 0;
    let mut pending: Option<usize> = None;

    loop {
        if let Some(target) = pending {
            if window_left == 0 || cpu.pc >= program.len() {
                debug!("Branching from {} to {}", cpu.pc, target);
                cpu.pc = target;
                pending = None;
                window_left = 0;
            }
        }

        let pc = cpu.pc;
        let Some(inst) = program.fetch(pc)? else {
            break;
        };

        if cpu.history.cycle_count >= cpu.policy.max_cycles {
            return Err(ExecutionError::ExecutionLimitReached(cpu.policy.max_cycles).into());
        }
        cpu.update_cycle_count(1);
        cpu.history.fetch_count += 1;
        cpu.pc = pc + 1;
        debug!("PC: {}; Instruction: {}", pc, inst);

        let in_slot = window_left > 0;
        if in_slot {
            window_left -= 1;
        }

        // ID
        let (op1, op2) = register_read(&inst, &cpu.gpr);
        // EX
        let executed =
            execute(&inst, op1, op2, delay_slot.return_index(pc), advisories)?;
        // MEM
        let wb_result = memory_access(&inst, executed.result, op2, mem, advisories);
        // WB
        write_back(&inst, wb_result, &mut cpu.gpr);
        cpu.update_inst_count(1);

        if in_slot && inst.category() != Category::NoOp {
            cpu.history.delay_slot_filled_count += 1;
        }
        if inst.is_control() {
            cpu.history.control_count += 1;
            window_left = delay_slot.architectural_slots();
        }
        if let Some(target) = executed.target {
            cpu.history.branch_taken_count += 1;
            pending = Some(target);
        }
        if executed.exit {
            info!("Exit system call at instruction {}", pc);
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CPUPolicy;
    use crate::memory::DataMemory;
    use crate::program::LabelTable;

    fn run_lines(lines: &[&str], labels: LabelTable) -> (CPUState, DataMemory) {
        let mut cpu = CPUState::make(CPUPolicy::default());
        let mut mem = DataMemory::seeded();
        let mut program = Program::from_lines(lines, labels);
        run(&mut cpu, &mut mem, &mut program, &mut Vec::new()).unwrap();
        (cpu, mem)
    }

    #[test]
    fn one_cycle_per_instruction() {
        let (cpu, _) = run_lines(
            &["addi $t0, $zero, 5", "addi $t1, $zero, 10", "add $t2, $t0, $t1"],
            LabelTable::default(),
        );
        assert_eq!(cpu.gpr.read(10), 15);
        assert_eq!(cpu.history.cycle_count, 3);
        assert_eq!(cpu.history.inst_count, 3);
    }

    #[test]
    fn delay_slot_runs_before_target() {
        let mut labels = LabelTable::default();
        labels.insert_text("skip", 3);
        let (cpu, _) = run_lines(
            &[
                "beq $zero, $zero, skip",
                "addi $t0, $zero, 1",
                "addi $t1, $zero, 1",
                "addi $t2, $zero, 1",
            ],
            labels,
        );
        assert_eq!(cpu.gpr.read(8), 1);
        assert_eq!(cpu.gpr.read(9), 0);
        assert_eq!(cpu.gpr.read(10), 1);
        assert_eq!(cpu.history.delay_slot_filled_count, 1);
    }

    #[test]
    fn load_store_and_exit() {
        let (cpu, mem) = run_lines(
            &[
                "lw $t0, 8($zero)",
                "sw $t0, 100($zero)",
                "li $v0, 10",
                "syscall",
                "addi $t1, $zero, 1",
            ],
            LabelTable::default(),
        );
        assert_eq!(mem.load_word(100), 2);
        assert_eq!(cpu.gpr.read(9), 0);
        assert_eq!(cpu.history.inst_count, 4);
    }
}
