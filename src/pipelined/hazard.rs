//! Data hazard detection

use std::fmt;
use std::str::FromStr;

use crate::instruction::Instruction;

/// How data hazards are resolved
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HazardPolicy {
    /// Forward ALU results; only a load feeding the next instruction stalls
    #[default]
    ForwardStallOnLoad,
    /// Any producer directly ahead stalls the consumer for one cycle
    StallOnly,
}

impl HazardPolicy {
    /// Whether EX may take a result from the instruction one stage ahead
    pub fn forwards_from_memory_stage(&self) -> bool {
        *self == HazardPolicy::ForwardStallOnLoad
    }
}

impl FromStr for HazardPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "F" | "FORWARD" => Ok(HazardPolicy::ForwardStallOnLoad),
            "S" | "STALL" => Ok(HazardPolicy::StallOnly),
            _ => Err(format!(
                "Invalid hazard policy: '{}'. Expected 'F' or 'S'.",
                s
            )),
        }
    }
}

impl fmt::Display for HazardPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HazardPolicy::ForwardStallOnLoad => f.write_str("forward"),
            HazardPolicy::StallOnly => f.write_str("stall"),
        }
    }
}

/// Outcome of checking the instruction in decode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HazardDecision {
    #[default]
    Proceed,
    /// Hold decode for a cycle and send a bubble to EX
    StallOneCycle { load_use: bool },
}

impl HazardDecision {
    pub fn stalls(&self) -> bool {
        matches!(self, HazardDecision::StallOneCycle { .. })
    }
}

/// Checks `candidate` (in ID) against `ahead`, the instruction that has
/// just entered EX. Anything further ahead is covered by forwarding or
/// has already written back.
pub fn detect(
    policy: HazardPolicy,
    candidate: &Instruction,
    ahead: Option<&Instruction>,
) -> HazardDecision {
    let Some(ahead) = ahead else {
        return HazardDecision::Proceed;
    };
    let Some(dest) = ahead.dest() else {
        return HazardDecision::Proceed;
    };
    if !candidate.reads(dest) {
        return HazardDecision::Proceed;
    }

    let load_use = ahead.is_load();
    match policy {
        HazardPolicy::ForwardStallOnLoad if !load_use => HazardDecision::Proceed,
        _ => HazardDecision::StallOneCycle { load_use },
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::alu::ALUOp;
    use crate::instruction::Mnemonic;
    use crate::instruction::Operation;

    fn add(rd: u8, rs: u8, rt: u8) -> Instruction {
        Instruction::new(1, Mnemonic::ADD, Operation::RAlu { op: ALUOp::ADD, rd, rs, rt }, "add")
    }

    fn lw(rt: u8) -> Instruction {
        Instruction::new(0, Mnemonic::LW, Operation::Load { rt, base: 4, offset: 0 }, "lw")
    }

    #[rstest]
    #[case(HazardPolicy::ForwardStallOnLoad, lw(8), HazardDecision::StallOneCycle { load_use: true })]
    #[case(HazardPolicy::StallOnly, lw(8), HazardDecision::StallOneCycle { load_use: true })]
    #[case(HazardPolicy::ForwardStallOnLoad, add(8, 1, 1), HazardDecision::Proceed)]
    #[case(HazardPolicy::StallOnly, add(8, 1, 1), HazardDecision::StallOneCycle { load_use: false })]
    fn producer_ahead(
        #[case] policy: HazardPolicy,
        #[case] ahead: Instruction,
        #[case] expected: HazardDecision,
    ) {
        assert_eq!(detect(policy, &add(9, 8, 8), Some(&ahead)), expected);
    }

    #[test]
    fn zero_register_never_stalls() {
        let decision = detect(HazardPolicy::StallOnly, &add(9, 0, 0), Some(&lw(0)));
        assert_eq!(decision, HazardDecision::Proceed);
    }

    #[test]
    fn unrelated_or_empty_proceeds() {
        assert!(!detect(HazardPolicy::StallOnly, &add(9, 1, 2), Some(&lw(8))).stalls());
        assert!(!detect(HazardPolicy::StallOnly, &add(9, 8, 8), None).stalls());
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("s".parse(), Ok(HazardPolicy::StallOnly));
        assert_eq!("forward".parse(), Ok(HazardPolicy::ForwardStallOnLoad));
        assert!("x".parse::<HazardPolicy>().is_err());
    }
}
