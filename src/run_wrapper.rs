//! A simulator wrapper

use std::path::Path;

use crate::cpu::CPUHistory;
use crate::cpu::CPUPolicy;
use crate::cpu::CPUState;
use crate::cpu::Implementation;
use crate::cpu::RegisterFile;
use crate::error::Advisory;
use crate::error::SimulatorResult;
use crate::history::CycleLog;
use crate::loader;
use crate::memory::DataMemory;
use crate::pipelined;
use crate::program::Program;
use crate::single_cycle;

/// Everything a finished run produced
#[derive(Clone, Debug)]
pub struct RunReport {
    pub history: CPUHistory,
    pub registers: RegisterFile,
    pub memory: DataMemory,
    /// Empty for the single-cycle implementation
    pub log: CycleLog,
    pub advisories: Vec<Advisory>,
}

/// Run simulation on the given listing
pub fn run(path: &Path, policy: CPUPolicy) -> SimulatorResult<RunReport> {
    let mut program = loader::load_program(path)?;
    // Reject bad programs before the first cycle
    program.decode_all()?;
    run_program(program, policy)
}

/// Run simulation on an already loaded program
pub fn run_program(mut program: Program, policy: CPUPolicy) -> SimulatorResult<RunReport> {
    policy.validate()?;

    let report = match policy.implementation {
        Implementation::SingleCycle => {
            let mut cpu = CPUState::make(policy);
            let mut mem = DataMemory::seeded();
            let mut advisories = Vec::new();
            single_cycle::run(&mut cpu, &mut mem, &mut program, &mut advisories)?;
            RunReport {
                history: cpu.history,
                registers: cpu.gpr,
                memory: mem,
                log: CycleLog::default(),
                advisories,
            }
        }
        Implementation::Pipelined => {
            let simulator = pipelined::run(program, policy)?;
            let (cpu, memory, log, advisories) = simulator.into_parts();
            RunReport { history: cpu.history, registers: cpu.gpr, memory, log, advisories }
        }
    };

    if policy.history {
        print_history(&report, &policy);
    }

    Ok(report)
}

fn print_history(report: &RunReport, policy: &CPUPolicy) {
    let history = &report.history;
    eprintln!("[HISTORY] # cycles = {}", history.cycle_count);
    eprintln!("[HISTORY] # instructions = {}", history.inst_count);
    eprintln!(
        "[HISTORY] CPI = {:.2}, IPC = {:.2}",
        history.cpi(),
        history.ipc()
    );
    eprintln!(
        "[HISTORY] Stalls: memory = {}, load = {}, hazard = {}; bubbles = {}",
        history.mem_stall_count,
        history.load_stall_count,
        history.hazard_stall_count,
        history.bubble_count
    );
    eprintln!(
        "[HISTORY] Branches: executed = {}, taken = {}, delay-slot utilization = {:.1}%",
        history.control_count,
        history.branch_taken_count,
        history.delay_slot_utilization(policy.delay_slot.window)
    );
    if history.squashed_count > 0 {
        eprintln!("[HISTORY] Squashed by exit = {}", history.squashed_count);
    }
    eprintln!("[HISTORY] Advisories = {}", report.advisories.len());
}
