//! Memory structure

pub mod latency;

use std::collections::BTreeMap;

/// Word size in bytes; used only for alignment checks
pub const WORD_SIZE: u32 = 4;

/// Memory interface implementation.
/// Addresses name independent word slots; nothing is split into bytes.
pub trait StorageInterface {
    fn load_word(&self, address: u32) -> i32;
    fn store_word(&mut self, address: u32, value: i32);

    fn is_aligned(&self, address: u32) -> bool {
        address % WORD_SIZE == 0
    }
}

/// Sparse word-addressable data memory. Unwritten slots read as 0.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataMemory {
    words: BTreeMap<u32, i32>,
}

impl DataMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory pre-seeded with the test pattern `mem[a] = a / 4` for
    /// `a` in `0, 4, ..., 36`
    pub fn seeded() -> Self {
        let mut mem = Self::new();
        for address in (0..40).step_by(WORD_SIZE as usize) {
            mem.words.insert(address, (address / WORD_SIZE) as i32);
        }
        mem
    }

    pub fn initialize(&mut self, words: &[(u32, i32)]) {
        for (address, value) in words {
            self.words.insert(*address, *value);
        }
    }

    /// Every slot that has been written or seeded, in address order
    pub fn contents(&self) -> &BTreeMap<u32, i32> {
        &self.words
    }
}

impl StorageInterface for DataMemory {
    fn load_word(&self, address: u32) -> i32 {
        self.words.get(&address).copied().unwrap_or(0)
    }

    fn store_word(&mut self, address: u32, value: i32) {
        self.words.insert(address, value);
    }
}
