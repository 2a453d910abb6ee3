//! Memory latency providers
//!
//! The MEM stage asks a provider how many cycles each load or store takes.
//! A latency of 1 completes in the cycle the access enters MEM; every extra
//! cycle holds the pipeline for one more cycle.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::instruction::Instruction;

/// Supplies the latency of one memory access, in cycles (at least 1)
pub trait LatencyProvider {
    fn next_latency(&mut self, inst: &Instruction) -> u32;
}

/// Every access takes the same number of cycles
#[derive(Clone, Copy, Debug)]
pub struct FixedLatency(pub u32);

impl LatencyProvider for FixedLatency {
    fn next_latency(&mut self, _: &Instruction) -> u32 {
        self.0.max(1)
    }
}

/// Uniformly random latency in `[min, max]`
#[derive(Clone, Debug)]
pub struct UniformLatency {
    min: u32,
    max: u32,
    rng: StdRng,
}

impl UniformLatency {
    /// Seeded for reproducible runs, or from OS entropy
    pub fn new(min: u32, max: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { min: min.max(1), max: max.max(min).max(1), rng }
    }
}

impl LatencyProvider for UniformLatency {
    fn next_latency(&mut self, _: &Instruction) -> u32 {
        self.rng.gen_range(self.min..=self.max)
    }
}

/// Replays a fixed list of latencies, then repeats the fallback
#[derive(Clone, Debug)]
pub struct ScriptedLatency {
    script: VecDeque<u32>,
    fallback: u32,
}

impl ScriptedLatency {
    pub fn new(script: impl IntoIterator<Item = u32>, fallback: u32) -> Self {
        Self { script: script.into_iter().collect(), fallback }
    }
}

impl LatencyProvider for ScriptedLatency {
    fn next_latency(&mut self, _: &Instruction) -> u32 {
        self.script.pop_front().unwrap_or(self.fallback).max(1)
    }
}

/// Latency configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryLatency {
    Fixed(u32),
    Uniform { min: u32, max: u32 },
}

impl Default for MemoryLatency {
    fn default() -> Self {
        MemoryLatency::Uniform { min: 2, max: 3 }
    }
}

impl MemoryLatency {
    pub fn provider(&self, seed: Option<u64>) -> Box<dyn LatencyProvider> {
        match *self {
            MemoryLatency::Fixed(n) => Box::new(FixedLatency(n)),
            MemoryLatency::Uniform { min, max } => {
                Box::new(UniformLatency::new(min, max, seed))
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            MemoryLatency::Fixed(0) => {
                Err("memory latency must be at least 1 cycle".to_string())
            }
            MemoryLatency::Uniform { min, .. } if min == 0 => {
                Err("memory latency must be at least 1 cycle".to_string())
            }
            MemoryLatency::Uniform { min, max } if min > max => Err(format!(
                "memory latency range {}..{} is empty",
                min, max
            )),
            _ => Ok(()),
        }
    }
}

/// Accepts `N` or `MIN..MAX` (inclusive)
impl FromStr for MemoryLatency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| format!("Invalid memory latency: '{}'", s))
        };
        let latency = match s.split_once("..") {
            Some((min, max)) => MemoryLatency::Uniform {
                min: parse(min)?,
                max: parse(max.trim_start_matches('='))?,
            },
            None => MemoryLatency::Fixed(parse(s)?),
        };
        latency.validate()?;
        Ok(latency)
    }
}

impl fmt::Display for MemoryLatency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryLatency::Fixed(n) => write!(f, "{}", n),
            MemoryLatency::Uniform { min, max } => write!(f, "{}..{}", min, max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Mnemonic, Operation};

    fn lw() -> Instruction {
        Instruction::new(0, Mnemonic::LW, Operation::Load { rt: 8, base: 4, offset: 0 }, "lw $t0, 0($a0)")
    }

    #[test]
    fn parses_fixed_and_range() {
        assert_eq!("3".parse(), Ok(MemoryLatency::Fixed(3)));
        assert_eq!("2..4".parse(), Ok(MemoryLatency::Uniform { min: 2, max: 4 }));
        assert_eq!("2..=4".parse(), Ok(MemoryLatency::Uniform { min: 2, max: 4 }));
        assert!("0".parse::<MemoryLatency>().is_err());
        assert!("4..2".parse::<MemoryLatency>().is_err());
        assert!("fast".parse::<MemoryLatency>().is_err());
    }

    #[test]
    fn seeded_uniform_stays_in_range_and_repeats() {
        let mut a = UniformLatency::new(2, 5, Some(7));
        let mut b = UniformLatency::new(2, 5, Some(7));
        for _ in 0..100 {
            let x = a.next_latency(&lw());
            assert!((2..=5).contains(&x));
            assert_eq!(x, b.next_latency(&lw()));
        }
    }

    #[test]
    fn scripted_then_fallback() {
        let mut p = ScriptedLatency::new([3, 0], 1);
        assert_eq!(p.next_latency(&lw()), 3);
        assert_eq!(p.next_latency(&lw()), 1);
        assert_eq!(p.next_latency(&lw()), 1);
    }
}
