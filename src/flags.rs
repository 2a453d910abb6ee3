use std::path::PathBuf;
use std::str::FromStr;

use crate::cpu::CPUPolicy;
use crate::cpu::Implementation;
use crate::memory::latency::MemoryLatency;
use crate::pipelined::delay_slot::DelaySlotMode;
use crate::pipelined::hazard::HazardPolicy;

xflags::xflags! {
    /// MIPS 5-stage pipeline simulator with delayed branches.
    cmd PipeSimArgs {
        /// Path to the program listing to simulate.
        required program: PathBuf

        /// Enables history module, printing cycle and stall counts after simulation.
        optional --history

        /// Specifies the simulator implementation.
        /// P: Pipelined (default)
        /// S: Naive single-cycle
        optional -i, --implementation backend: BackendArg

        /// Memory latency in cycles: N, or MIN..MAX for a uniform draw.
        /// Defaults to 2..3.
        optional -m, --memory-latency latency: MemoryLatency

        /// Specifies the data hazard policy.
        /// F: Forward, stall only on load-use (default)
        /// S: Stall on every dependency
        optional -z, --hazard policy: HazardPolicy

        /// Number of delay slots after each branch or jump (default 1).
        optional -d, --delay-slots window: usize

        /// Fill delay slots with bubbles instead of the following instructions.
        optional --bubble-slots

        /// Seed for random memory latencies.
        optional --seed seed: u64

        /// Abort after this many cycles (default 1000000).
        optional --max-cycles cycles: u64

        /// Writes the cycle log to this CSV file.
        optional -t, --trace path: PathBuf

        /// Enables verbose mode, printing detailed information during simulation.
        /// Largely used for debugging purposes.
        optional -v, --verbose
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BackendArg {
    Pipelined,
    SingleCycle,
}

impl FromStr for BackendArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "P" => Ok(BackendArg::Pipelined),
            "S" => Ok(BackendArg::SingleCycle),
            _ => Err(format!(
                "Invalid implementation: '{}'. Expected 'P' or 'S'.",
                s
            )),
        }
    }
}

impl From<BackendArg> for Implementation {
    fn from(val: BackendArg) -> Self {
        match val {
            BackendArg::Pipelined => Implementation::Pipelined,
            BackendArg::SingleCycle => Implementation::SingleCycle,
        }
    }
}

impl PipeSimArgs {
    /// Builds the CPU policy, starting from the defaults
    pub fn policy(&self) -> CPUPolicy {
        let mut policy = CPUPolicy {
            verbose: self.verbose,
            history: self.history,
            seed: self.seed,
            ..Default::default()
        };
        if let Some(backend) = self.implementation {
            policy.implementation = backend.into();
        }
        if let Some(latency) = self.memory_latency {
            policy.latency = latency;
        }
        if let Some(hazard) = self.hazard {
            policy.hazard = hazard;
        }
        if let Some(window) = self.delay_slots {
            policy.delay_slot.window = window;
        }
        if self.bubble_slots {
            policy.delay_slot.mode = DelaySlotMode::Bubbles;
        }
        if let Some(cycles) = self.max_cycles {
            policy.max_cycles = cycles;
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_policy() {
        let args = PipeSimArgs::from_vec(
            ["prog.s", "-m", "3", "-z", "S", "-d", "2", "--bubble-slots", "--seed", "9"]
                .into_iter()
                .map(Into::into)
                .collect(),
        )
        .unwrap();
        let policy = args.policy();
        assert_eq!(policy.latency, MemoryLatency::Fixed(3));
        assert_eq!(policy.hazard, HazardPolicy::StallOnly);
        assert_eq!(policy.delay_slot.window, 2);
        assert_eq!(policy.delay_slot.mode, DelaySlotMode::Bubbles);
        assert_eq!(policy.seed, Some(9));
        assert_eq!(policy.implementation, Implementation::Pipelined);
    }

    #[test]
    fn defaults_without_flags() {
        let args = PipeSimArgs::from_vec(vec!["prog.s".into()]).unwrap();
        assert_eq!(args.policy(), CPUPolicy::default());
        assert_eq!(args.trace, None);
    }
}
