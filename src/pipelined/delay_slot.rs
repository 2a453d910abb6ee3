//! Delayed branch handling
//!
//! Branches and jumps resolve in EX. Fetch keeps going sequentially through
//! the delay window that follows a control instruction, then switches to the
//! captured target. The window is either filled with the instructions that
//! follow in program order, or with bubbles.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::instruction::Instruction;

/// What occupies the delay window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DelaySlotMode {
    /// Instructions after the branch run whether or not it is taken
    #[default]
    Architectural,
    /// Fetch inserts bubbles and nothing after the branch runs early
    Bubbles,
}

impl FromStr for DelaySlotMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" | "ARCHITECTURAL" => Ok(DelaySlotMode::Architectural),
            "B" | "BUBBLES" => Ok(DelaySlotMode::Bubbles),
            _ => Err(format!(
                "Invalid delay-slot mode: '{}'. Expected 'A' or 'B'.",
                s
            )),
        }
    }
}

impl fmt::Display for DelaySlotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelaySlotMode::Architectural => f.write_str("architectural"),
            DelaySlotMode::Bubbles => f.write_str("bubbles"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelaySlotPolicy {
    pub mode: DelaySlotMode,
    /// Slots after each branch or jump, at least 1
    pub window: usize,
}

impl Default for DelaySlotPolicy {
    fn default() -> Self {
        Self { mode: DelaySlotMode::Architectural, window: 1 }
    }
}

impl DelaySlotPolicy {
    /// Instructions that execute between a taken control transfer and its target
    pub fn architectural_slots(&self) -> usize {
        match self.mode {
            DelaySlotMode::Architectural => self.window,
            DelaySlotMode::Bubbles => 0,
        }
    }

    /// Index `jal` at `index` links into `$ra`: the first instruction
    /// past the slots that already ran
    pub fn return_index(&self, index: usize) -> usize {
        index + 1 + self.architectural_slots()
    }
}

/// Tracks the open delay window and the pending redirect
#[derive(Clone, Debug)]
pub struct DelaySlotController {
    policy: DelaySlotPolicy,
    /// Slots still to be fetched for the newest control instruction
    window_open: usize,
    /// Target of a resolved taken transfer, not yet applied
    pending: Option<usize>,
}

impl DelaySlotController {
    pub fn new(policy: DelaySlotPolicy) -> Self {
        Self { policy, window_open: 0, pending: None }
    }

    pub fn policy(&self) -> DelaySlotPolicy {
        self.policy
    }

    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    /// Bubble mode: consumes one slot of the open window, if any
    pub fn take_bubble(&mut self) -> bool {
        if self.policy.mode == DelaySlotMode::Bubbles && self.window_open > 0 {
            self.window_open -= 1;
            true
        } else {
            false
        }
    }

    /// EX resolved a taken branch or a jump
    pub fn resolve(&mut self, target: usize) {
        debug!("Delayed transfer to {} pending", target);
        self.pending = Some(target);
    }

    /// Where fetch should continue from. The pending target is applied once
    /// the window is used up, or right away when the window runs off the end
    /// of the program.
    pub fn redirect(&mut self, pc: usize, len: usize) -> Option<usize> {
        let target = self.pending?;
        if self.window_open > 0 && pc < len {
            return None;
        }
        self.pending = None;
        self.window_open = 0;
        Some(target)
    }

    /// Fetch produced `inst`. Returns whether it sits in a delay slot.
    pub fn fetched(&mut self, inst: &Instruction) -> bool {
        let in_slot = self.policy.mode == DelaySlotMode::Architectural
            && self.window_open > 0;
        if in_slot {
            self.window_open -= 1;
        }
        if inst.is_control() {
            self.window_open = self.policy.window;
        }
        in_slot
    }

    /// Drops the window and any pending redirect
    pub fn cancel(&mut self) {
        self.window_open = 0;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::JumpTarget;
    use crate::instruction::Mnemonic;
    use crate::instruction::Operation;

    fn j(target: usize) -> Instruction {
        Instruction::new(0, Mnemonic::J, Operation::Jump { target: JumpTarget::Index(target), link: false }, "j")
    }

    fn nop() -> Instruction {
        Instruction::new(1, Mnemonic::NOP, Operation::NoOp, "nop")
    }

    #[test]
    fn architectural_window_marks_slot_then_redirects() {
        let mut ds = DelaySlotController::new(DelaySlotPolicy::default());
        assert!(!ds.fetched(&j(7)));
        assert_eq!(ds.redirect(1, 10), None);
        assert!(ds.fetched(&nop()));
        ds.resolve(7);
        assert_eq!(ds.redirect(2, 10), Some(7));
        assert_eq!(ds.pending(), None);
    }

    #[test]
    fn wider_window_waits_for_every_slot() {
        let policy = DelaySlotPolicy { mode: DelaySlotMode::Architectural, window: 2 };
        let mut ds = DelaySlotController::new(policy);
        ds.fetched(&j(7));
        assert!(ds.fetched(&nop()));
        ds.resolve(7);
        assert_eq!(ds.redirect(2, 10), None);
        assert!(ds.fetched(&nop()));
        assert_eq!(ds.redirect(3, 10), Some(7));
    }

    #[test]
    fn redirect_applies_at_end_of_program() {
        let mut ds = DelaySlotController::new(DelaySlotPolicy::default());
        ds.fetched(&j(0));
        ds.resolve(0);
        assert_eq!(ds.redirect(1, 1), Some(0));
    }

    #[test]
    fn bubble_mode_fills_window() {
        let policy = DelaySlotPolicy { mode: DelaySlotMode::Bubbles, window: 2 };
        let mut ds = DelaySlotController::new(policy);
        ds.fetched(&j(7));
        assert!(ds.take_bubble());
        assert!(ds.take_bubble());
        assert!(!ds.take_bubble());
        assert!(!ds.fetched(&nop()));
    }

    #[test]
    fn return_index_skips_executed_slots() {
        assert_eq!(DelaySlotPolicy::default().return_index(4), 6);
        let bubbles = DelaySlotPolicy { mode: DelaySlotMode::Bubbles, window: 3 };
        assert_eq!(bubbles.return_index(4), 5);
    }
}
