//! Cycle log

use std::fmt;
use std::io;

use crate::error::SimulatorResult;

/// Stage names in pipeline order
pub const STAGE_NAMES: [&str; 5] = ["IF", "ID", "EX", "MEM", "WB"];

/// What a stage held at the end of a cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageView {
    Empty,
    Bubble,
    Busy {
        index: usize,
        label: String,
        /// Memory cycles still owed, shown for loads and stores in MEM
        remaining: Option<u32>,
    },
}

impl StageView {
    pub fn is_empty(&self) -> bool {
        *self == StageView::Empty
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            StageView::Busy { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for StageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageView::Empty => Ok(()),
            StageView::Bubble => f.write_str("bubble"),
            StageView::Busy { label, remaining: Some(n), .. } if *n > 0 => {
                write!(f, "{} ({})", label, n)
            }
            StageView::Busy { label, .. } => f.write_str(label),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleLogEntry {
    /// 1-based
    pub cycle: u64,
    /// IF, ID, EX, MEM, WB
    pub stages: [StageView; 5],
}

/// Append-only record of every cycle
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleLog {
    entries: Vec<CycleLogEntry>,
}

impl CycleLog {
    pub fn push(&mut self, entry: CycleLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[CycleLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cycle number at which instruction `index` first retired
    pub fn retire_cycle(&self, index: usize) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.stages[4].index() == Some(index))
            .map(|e| e.cycle)
    }

    /// Writes one CSV row per cycle: `Cycle,IF,ID,EX,MEM,WB`
    pub fn write_csv<W: io::Write>(&self, writer: W) -> SimulatorResult<()> {
        let mut writer = csv::Writer::from_writer(writer);
        let mut header = vec!["Cycle"];
        header.extend(STAGE_NAMES);
        writer.write_record(&header)?;
        for entry in &self.entries {
            let mut record = vec![entry.cycle.to_string()];
            record.extend(entry.stages.iter().map(|s| s.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}
