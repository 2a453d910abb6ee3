//! CPU architectural state, policy and run history

use std::fmt;

use crate::error::SimulatorError;
use crate::error::SimulatorResult;
use crate::instruction::RegId;
use crate::memory::latency::MemoryLatency;
use crate::pipelined::delay_slot::DelaySlotPolicy;
use crate::pipelined::hazard::HazardPolicy;

/// CPU state
#[derive(Clone, Debug)]
pub struct CPUState {
    /// Program counter, as an instruction index
    pub pc: usize,
    /// General purpose registers
    pub gpr: RegisterFile,

    /// CPU policy
    pub policy: CPUPolicy,

    /// History of execution
    pub history: CPUHistory,
}

impl CPUState {
    pub fn make(policy: CPUPolicy) -> Self {
        Self {
            pc: 0,
            gpr: RegisterFile::new(),
            policy,
            history: CPUHistory::default(),
        }
    }

    /// Increments history cycle count
    pub fn update_cycle_count(&mut self, value: u64) {
        self.history.cycle_count += value;
    }

    /// Increments history instruction count
    pub fn update_inst_count(&mut self, value: u64) {
        self.history.inst_count += value;
    }
}

/// Register file simulation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Register {
    /// Current data in the register
    data: i32,
}

impl Register {
    pub fn new(data: i32) -> Self {
        Self { data }
    }

    /// Reads the register
    pub fn read(&self) -> i32 {
        self.data
    }

    /// Writes to register
    pub fn write(&mut self, value: i32) {
        self.data = value;
    }
}

/// 32 registers; `$zero` is hard-wired and ignores writes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [Register; 32],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, reg: RegId) -> i32 {
        self.regs[(reg & 31) as usize].read()
    }

    pub fn write(&mut self, reg: RegId, value: i32) {
        // You don't write to $zero
        if reg != 0 {
            self.regs[(reg & 31) as usize].write(value);
        }
    }

    pub fn initialize(&mut self, values: &[(RegId, i32)]) {
        for (reg, value) in values {
            self.write(*reg, *value);
        }
    }

    pub fn values(&self) -> [i32; 32] {
        self.regs.map(|r| r.read())
    }
}

/// Implementation enum
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Implementation {
    /// Sequential reference model, one instruction per cycle
    SingleCycle,
    #[default]
    Pipelined,
}

/// CPU policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CPUPolicy {
    pub verbose: bool,
    pub implementation: Implementation,
    pub history: bool,
    pub latency: MemoryLatency,
    pub hazard: HazardPolicy,
    pub delay_slot: DelaySlotPolicy,
    /// Seed for the random latency provider
    pub seed: Option<u64>,
    /// Runs longer than this abort with `ExecutionLimitReached`
    pub max_cycles: u64,
}

impl Default for CPUPolicy {
    fn default() -> Self {
        Self {
            verbose: false,
            implementation: Implementation::default(),
            history: false,
            latency: MemoryLatency::default(),
            hazard: HazardPolicy::default(),
            delay_slot: DelaySlotPolicy::default(),
            seed: None,
            max_cycles: 1_000_000,
        }
    }
}

impl CPUPolicy {
    pub fn validate(&self) -> SimulatorResult<()> {
        self.latency.validate().map_err(SimulatorError::ConfigError)?;
        if self.delay_slot.window == 0 {
            return Err(SimulatorError::ConfigError(
                "delay-slot window must be at least 1".to_string(),
            ));
        }
        if self.max_cycles == 0 {
            return Err(SimulatorError::ConfigError(
                "cycle limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// History module
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CPUHistory {
    /// Total cycles
    pub cycle_count: u64,
    /// Instructions retired in WB
    pub inst_count: u64,
    /// Real instructions fetched, bubbles excluded
    pub fetch_count: u64,
    /// Cycles MEM held its occupant past the first cycle
    pub mem_stall_count: u64,
    /// Load-caused stalls: MEM holds on loads plus load-use decode stalls
    pub load_stall_count: u64,
    /// Cycles decode held an instruction because of a data hazard
    pub hazard_stall_count: u64,
    /// Bubbles inserted by decode stalls and by bubble-filled delay slots
    pub bubble_count: u64,
    /// Taken branches and jumps
    pub branch_taken_count: u64,
    /// Branches and jumps executed, taken or not
    pub control_count: u64,
    /// Delay slots that carried a real, non-`nop` instruction
    pub delay_slot_filled_count: u64,
    /// Cycles in which no instruction could retire because MEM was busy
    pub mem_wasted_count: u64,
    /// Younger instructions discarded by an exit system call
    pub squashed_count: u64,
}

impl CPUHistory {
    /// Cycles per retired instruction
    pub fn cpi(&self) -> f64 {
        if self.inst_count == 0 {
            0.0
        } else {
            self.cycle_count as f64 / self.inst_count as f64
        }
    }

    pub fn ipc(&self) -> f64 {
        if self.cycle_count == 0 {
            0.0
        } else {
            self.inst_count as f64 / self.cycle_count as f64
        }
    }

    /// Share of delay slots doing useful work, in percent
    pub fn delay_slot_utilization(&self, window: usize) -> f64 {
        let slots = self.control_count * window as u64;
        if slots == 0 {
            0.0
        } else {
            self.delay_slot_filled_count as f64 * 100.0 / slots as f64
        }
    }
}

impl fmt::Display for CPUHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total clock cycles: {}", self.cycle_count)?;
        writeln!(f, "Total instructions executed: {}", self.inst_count)?;
        writeln!(f, "Total stalls due to memory: {}", self.mem_stall_count)?;
        writeln!(f, "Stalls due to loads: {}", self.load_stall_count)?;
        writeln!(f, "Data hazard stalls: {}", self.hazard_stall_count)?;
        writeln!(f, "Bubbles inserted: {}", self.bubble_count)?;
        writeln!(f, "Delayed branches taken: {}", self.branch_taken_count)?;
        writeln!(f, "Branch instructions: {}", self.control_count)?;
        writeln!(f, "Useful delay slots: {}", self.delay_slot_filled_count)?;
        writeln!(f, "Cycles wasted due to memory delays: {}", self.mem_wasted_count)?;
        writeln!(f, "Instructions squashed by exit: {}", self.squashed_count)?;
        write!(f, "CPI = {:.2}, IPC = {:.2}", self.cpi(), self.ipc())
    }
}
