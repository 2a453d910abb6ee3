//! Program image: instruction lines plus the label table
//!
//! Lines are decoded lazily when the pipeline fetches them, and the
//! decoded record is cached so every later fetch of the same index shares it.
//! `decode_all` runs the same decoder up front for callers that want to
//! reject a bad program before the first cycle.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::SimulatorResult;
use crate::instruction::decode_helper;
use crate::instruction::Instruction;

/// Resolved labels, supplied by whoever assembled the listing
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelTable {
    text: HashMap<String, usize>,
    data: HashMap<String, u32>,
}

impl LabelTable {
    /// Labels an instruction index
    pub fn insert_text(&mut self, label: impl Into<String>, index: usize) {
        self.text.insert(label.into(), index);
    }

    /// Labels a data address
    pub fn insert_data(&mut self, label: impl Into<String>, address: u32) {
        self.data.insert(label.into(), address);
    }

    pub fn text(&self, label: &str) -> Option<usize> {
        self.text.get(label).copied()
    }

    pub fn data(&self, label: &str) -> Option<u32> {
        self.data.get(label).copied()
    }
}

#[derive(Clone, Debug)]
pub struct Program {
    lines: Vec<String>,
    labels: LabelTable,
    decoded: Vec<Option<Rc<Instruction>>>,
}

impl Program {
    /// Raw lines, decoded on fetch
    pub fn new(lines: Vec<String>, labels: LabelTable) -> Self {
        let decoded = vec![None; lines.len()];
        Self { lines, labels, decoded }
    }

    /// Convenience for tests and small tools
    pub fn from_lines<S: AsRef<str>>(lines: &[S], labels: LabelTable) -> Self {
        Self::new(lines.iter().map(|l| l.as_ref().to_string()).collect(), labels)
    }

    /// An already decoded sequence. Indices are renumbered to positions.
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        let lines = instructions.iter().map(|i| i.text.clone()).collect();
        let decoded = instructions
            .into_iter()
            .enumerate()
            .map(|(index, inst)| Some(Rc::new(Instruction { index, ..inst })))
            .collect();
        Self { lines, labels: LabelTable::default(), decoded }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Returns the decoded instruction at `index`, decoding it on first use.
    /// `None` past the end of the program.
    pub fn fetch(&mut self, index: usize) -> SimulatorResult<Option<Rc<Instruction>>> {
        let Some(slot) = self.decoded.get_mut(index) else {
            return Ok(None);
        };
        if let Some(inst) = slot {
            return Ok(Some(Rc::clone(inst)));
        }
        let inst = Rc::new(decode_helper::decode(&self.lines[index], index, &self.labels)?);
        *slot = Some(Rc::clone(&inst));
        Ok(Some(inst))
    }

    /// Decodes every line now, failing on the first bad one
    pub fn decode_all(&mut self) -> SimulatorResult<()> {
        for index in 0..self.len() {
            self.fetch(index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulatorError;

    #[test]
    fn fetch_decodes_once_and_shares() {
        let mut program = Program::from_lines(&["addi $t0, $zero, 1", "nop"], LabelTable::default());
        let a = program.fetch(0).unwrap().unwrap();
        let b = program.fetch(0).unwrap().unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert!(program.fetch(2).unwrap().is_none());
    }

    #[test]
    fn decode_all_reports_the_bad_line() {
        let mut program = Program::from_lines(&["nop", "frobnicate $t0"], LabelTable::default());
        let err = program.decode_all().unwrap_err();
        assert!(matches!(err, SimulatorError::Decode { index: 1, .. }));
    }

    #[test]
    fn pre_decoded_instructions_are_renumbered() {
        let mut source = Program::from_lines(&["nop", "nop"], LabelTable::default());
        let second = (*source.fetch(1).unwrap().unwrap()).clone();
        let mut program = Program::from_instructions(vec![second]);
        assert_eq!(program.len(), 1);
        assert_eq!(program.fetch(0).unwrap().unwrap().index, 0);
    }
}
