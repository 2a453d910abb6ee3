pub mod alu;
pub mod cpu;
pub mod flags;
pub mod history;
pub mod instruction;
pub mod loader;
pub mod memory;
pub mod program;
pub mod run_wrapper;
pub mod system_call;

pub mod stages_simple;

pub mod pipelined;
pub mod single_cycle;

pub mod error;
