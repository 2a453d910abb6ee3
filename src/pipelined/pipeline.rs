//! Pipeline state
use std::rc::Rc;

use crate::history::StageView;
use crate::instruction::Instruction;
use crate::pipelined::hazard::HazardDecision;

/// One dynamic instance of an instruction moving through the stages
#[derive(Clone, Debug)]
pub struct InFlight {
    /// Shared with the program image
    pub inst: Rc<Instruction>,

    /// Operand 1, read at decode
    pub op1: i32,
    /// Operand 2, read at decode
    pub op2: i32,

    /// EX result, replaced by the loaded value once a load completes
    pub result: Option<i32>,

    /// Memory cycles left, counting the current one
    pub remaining: u32,
    /// MEM finished with this instance
    pub mem_done: bool,

    /// Fetched in an architectural delay slot
    pub delay_slot: bool,
}

impl InFlight {
    pub fn new(inst: Rc<Instruction>, delay_slot: bool) -> Self {
        Self {
            inst,
            op1: 0,
            op2: 0,
            result: None,
            remaining: 0,
            mem_done: false,
            delay_slot,
        }
    }
}

/// Contents of one stage
#[derive(Clone, Debug, Default)]
pub enum Slot {
    #[default]
    Empty,
    Bubble,
    Busy(InFlight),
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub fn in_flight(&self) -> Option<&InFlight> {
        match self {
            Slot::Busy(f) => Some(f),
            _ => None,
        }
    }

    pub fn in_flight_mut(&mut self) -> Option<&mut InFlight> {
        match self {
            Slot::Busy(f) => Some(f),
            _ => None,
        }
    }

    pub fn instruction(&self) -> Option<&Instruction> {
        self.in_flight().map(|f| f.inst.as_ref())
    }

    fn view(&self, show_latency: bool) -> StageView {
        match self {
            Slot::Empty => StageView::Empty,
            Slot::Bubble => StageView::Bubble,
            Slot::Busy(f) => StageView::Busy {
                index: f.inst.index,
                label: f.inst.text.clone(),
                remaining: (show_latency && f.inst.is_memory() && !f.mem_done)
                    .then_some(f.remaining),
            },
        }
    }
}

/// Pipeline state = the five stage slots
#[derive(Clone, Debug, Default)]
pub struct PipelineState {
    pub fetch: Slot,
    pub decode: Slot,
    pub execute: Slot,
    pub memory: Slot,
    pub write_back: Slot,

    /// Hazard found by ID, applied in the following cycle
    pub decode_stall: HazardDecision,
}

impl PipelineState {
    /// MEM is still waiting on memory and holds everything behind it
    pub fn memory_busy(&self) -> bool {
        self.memory.in_flight().is_some_and(|f| !f.mem_done)
    }

    /// Anything, bubbles included, left in IF through MEM
    pub fn in_flight(&self) -> bool {
        !(self.fetch.is_empty()
            && self.decode.is_empty()
            && self.execute.is_empty()
            && self.memory.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        !self.in_flight() && self.write_back.is_empty()
    }

    /// Snapshot for the cycle log, in IF..WB order
    pub fn views(&self) -> [StageView; 5] {
        [
            self.fetch.view(false),
            self.decode.view(false),
            self.execute.view(false),
            self.memory.view(true),
            self.write_back.view(false),
        ]
    }
}
