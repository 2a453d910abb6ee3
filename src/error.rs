use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Failed to decode instruction {index} `{text}`: {kind}")]
    Decode {
        index: usize,
        text: String,
        #[source]
        kind: DecodeErrorKind,
    },

    #[error("Unresolved label '{label}' in instruction {index} `{text}`")]
    UnresolvedLabel { index: usize, text: String, label: String },

    #[error("CPU execution error: {0}")]
    ExecutionError(#[from] ExecutionError),

    #[error("Failed to load program '{0}': {1}")]
    LoadError(PathBuf, String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Why a line could not be turned into an instruction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),

    #[error("'{mnemonic}' expects {expected} operand(s), found {found}")]
    OperandCount {
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("malformed memory operand '{0}', expected offset(base)")]
    MemoryOperand(String),

    #[error("invalid immediate '{0}'")]
    Immediate(String),

    #[error("empty instruction")]
    Empty,
}

/// Errors raised while the program runs
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Execution limit reached: {0} cycles")]
    ExecutionLimitReached(u64),

    #[error("Jump target {target} out of range in instruction {index}")]
    InvalidJumpTarget { index: usize, target: i32 },
}

/// Non-fatal conditions. They are logged and recorded, and execution continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// A word access whose address is not a multiple of 4
    MisalignedAccess { index: usize, address: u32 },
    /// A `syscall` whose `$v0` code is not handled; treated as a no-op
    UnrecognizedSystemCall { index: usize, code: i32 },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::MisalignedAccess { index, address } => write!(
                f,
                "misaligned word access at {:#010x} by instruction {}",
                address, index
            ),
            Advisory::UnrecognizedSystemCall { index, code } => write!(
                f,
                "unrecognized system call code {} by instruction {}",
                code, index
            ),
        }
    }
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
