//! Pipelined implementation

use log::debug;
use log::info;

use crate::cpu::CPUHistory;
use crate::cpu::CPUPolicy;
use crate::cpu::CPUState;
use crate::cpu::RegisterFile;
use crate::error::Advisory;
use crate::error::ExecutionError;
use crate::error::SimulatorResult;
use crate::history::CycleLog;
use crate::history::CycleLogEntry;
use crate::memory::latency::LatencyProvider;
use crate::memory::DataMemory;
use crate::pipelined::delay_slot::DelaySlotController;
use crate::pipelined::pipeline::PipelineState;
use crate::pipelined::pipeline::Slot;
use crate::program::Program;

pub mod delay_slot;
pub mod forwarding;
pub mod hazard;
pub mod pipeline;
pub mod stages;

/// Engine state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// An exit system call executed; older instructions are finishing
    Draining,
    Halted,
}

/// Cycle-stepped 5-stage pipeline
pub struct Simulator {
    cpu: CPUState,
    mem: DataMemory,
    program: Program,
    latency: Box<dyn LatencyProvider>,
    delay_slot: DelaySlotController,
    current_state: PipelineState,
    run_state: RunState,
    log: CycleLog,
    advisories: Vec<Advisory>,
}

impl Simulator {
    /// A simulator over `program` with seeded data memory and the latency
    /// provider described by `policy`
    pub fn new(program: Program, policy: CPUPolicy) -> SimulatorResult<Self> {
        policy.validate()?;
        let run_state = if program.is_empty() {
            RunState::Halted
        } else {
            RunState::Running
        };
        Ok(Self {
            cpu: CPUState::make(policy),
            mem: DataMemory::seeded(),
            program,
            latency: policy.latency.provider(policy.seed),
            delay_slot: DelaySlotController::new(policy.delay_slot),
            current_state: PipelineState::default(),
            run_state,
            log: CycleLog::default(),
            advisories: Vec::new(),
        })
    }

    /// Replaces the latency provider, e.g. with a deterministic one
    pub fn with_latency(mut self, latency: impl LatencyProvider + 'static) -> Self {
        self.latency = Box::new(latency);
        self
    }

    pub fn with_memory(mut self, mem: DataMemory) -> Self {
        self.mem = mem;
        self
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.cpu.gpr
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.cpu.gpr
    }

    pub fn memory(&self) -> &DataMemory {
        &self.mem
    }

    pub fn history(&self) -> &CPUHistory {
        &self.cpu.history
    }

    pub fn log(&self) -> &CycleLog {
        &self.log
    }

    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn pipeline(&self) -> &PipelineState {
        &self.current_state
    }

    /// Next instruction index to fetch
    pub fn pc(&self) -> usize {
        self.cpu.pc
    }

    pub fn policy(&self) -> &CPUPolicy {
        &self.cpu.policy
    }

    /// Gives up the final machine state
    pub fn into_parts(self) -> (CPUState, DataMemory, CycleLog, Vec<Advisory>) {
        (self.cpu, self.mem, self.log, self.advisories)
    }

    /// Runs until halted
    pub fn run(&mut self) -> SimulatorResult<&CPUHistory> {
        while self.run_state != RunState::Halted {
            self.step()?;
        }
        Ok(&self.cpu.history)
    }

    /// Advances one clock cycle
    pub fn step(&mut self) -> SimulatorResult<RunState> {
        if self.run_state == RunState::Halted {
            return Ok(RunState::Halted);
        }
        if self.cpu.history.cycle_count >= self.cpu.policy.max_cycles {
            return Err(
                ExecutionError::ExecutionLimitReached(self.cpu.policy.max_cycles).into()
            );
        }

        self.cpu.update_cycle_count(1);
        debug!(
            "New cycle {}; PC: {}",
            self.cpu.history.cycle_count, self.cpu.pc
        );

        let current_state = &self.current_state;
        let mut next_state = PipelineState::default();

        if current_state.memory_busy() {
            stages::memory_hold(
                &mut self.cpu,
                &mut self.mem,
                &mut self.advisories,
                current_state,
                &mut next_state,
            );
        } else {
            stages::write_back(&mut self.cpu, current_state, &mut next_state);
            stages::memory_access(
                &mut self.mem,
                self.latency.as_mut(),
                &mut self.advisories,
                current_state,
                &mut next_state,
            );
            let exit = stages::execute(
                &mut self.cpu,
                &mut self.delay_slot,
                &mut self.advisories,
                current_state,
                &mut next_state,
            )?;
            if exit && self.run_state == RunState::Running {
                info!(
                    "Exit system call at cycle {}; draining",
                    self.cpu.history.cycle_count
                );
                self.run_state = RunState::Draining;
                self.delay_slot.cancel();
            }

            let draining = self.run_state == RunState::Draining;
            stages::instruction_decode(
                &mut self.cpu,
                current_state,
                &mut next_state,
                draining,
            );
            if draining {
                next_state.fetch = Slot::Empty;
            } else {
                stages::instruction_fetch(
                    &mut self.cpu,
                    &mut self.program,
                    &mut self.delay_slot,
                    current_state,
                    &mut next_state,
                )?;
            }
        }

        self.log.push(CycleLogEntry {
            cycle: self.cpu.history.cycle_count,
            stages: next_state.views(),
        });

        // WB committed this cycle
        next_state.write_back = Slot::Empty;
        self.current_state = next_state;

        if self.drained() {
            info!(
                "Halted after {} cycles, {} instructions retired",
                self.cpu.history.cycle_count, self.cpu.history.inst_count
            );
            self.run_state = RunState::Halted;
        }
        Ok(self.run_state)
    }

    fn drained(&self) -> bool {
        if self.current_state.in_flight() {
            return false;
        }
        match self.run_state {
            RunState::Draining => true,
            RunState::Running => {
                self.cpu.pc >= self.program.len() && self.delay_slot.pending().is_none()
            }
            RunState::Halted => true,
        }
    }
}

/// Runs `program` to completion under `policy`
pub fn run(program: Program, policy: CPUPolicy) -> SimulatorResult<Simulator> {
    let mut simulator = Simulator::new(program, policy)?;
    simulator.run()?;
    Ok(simulator)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::history::StageView;
    use crate::memory::latency::FixedLatency;
    use crate::program::LabelTable;

    fn simulator(lines: &[&str]) -> Simulator {
        let program = Program::from_lines(lines, LabelTable::default());
        Simulator::new(program, CPUPolicy::default())
            .unwrap()
            .with_latency(FixedLatency(1))
    }

    #[test]
    fn empty_program_is_already_halted() {
        let mut sim = simulator(&[]);
        assert_eq!(sim.run_state(), RunState::Halted);
        assert_eq!(sim.run().unwrap().cycle_count, 0);
    }

    #[test]
    fn single_instruction_takes_five_cycles() {
        let mut sim = simulator(&["addi $t0, $zero, 3"]);
        let history = *sim.run().unwrap();
        assert_eq!(history.cycle_count, 5);
        assert_eq!(history.inst_count, 1);
        assert_eq!(sim.registers().read(8), 3);
        assert_eq!(sim.log().len(), 5);
        assert_eq!(sim.log().retire_cycle(0), Some(5));
    }

    #[test]
    fn step_tracks_stage_occupancy() {
        let mut sim = simulator(&["nop", "nop"]);
        sim.step().unwrap();
        sim.step().unwrap();
        let entry = &sim.log().entries()[1];
        assert_eq!(entry.stages[0].index(), Some(1));
        assert_eq!(entry.stages[1].index(), Some(0));
        assert_eq!(entry.stages[2], StageView::Empty);
    }

    #[test]
    fn cycle_limit_aborts() {
        let program = Program::from_lines(&["j loop", "nop"], {
            let mut labels = LabelTable::default();
            labels.insert_text("loop", 0);
            labels
        });
        let policy = CPUPolicy { max_cycles: 50, ..Default::default() };
        let mut sim = Simulator::new(program, policy).unwrap();
        let err = sim.run().unwrap_err();
        assert!(matches!(
            err,
            crate::error::SimulatorError::ExecutionError(
                ExecutionError::ExecutionLimitReached(50)
            )
        ));
    }

    #[test]
    fn halted_simulator_stays_halted() {
        let mut sim = simulator(&["nop"]);
        sim.run().unwrap();
        let cycles = sim.history().cycle_count;
        assert_eq!(sim.step().unwrap(), RunState::Halted);
        assert_eq!(sim.history().cycle_count, cycles);
        assert!(sim.pipeline().is_empty());
    }
}
