//! System call handler

use crate::error::Advisory;

/// `$v0` code that terminates the program
pub const EXIT: i32 = 10;

/// What a `syscall` asks the machine to do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemCall {
    Exit,
    /// Not handled; the instruction behaves as a no-op
    Unrecognized(i32),
}

/// Handles a system call.
/// `code` is the value of `$v0` seen by the instruction at `index`.
pub fn syscall(index: usize, code: i32, advisories: &mut Vec<Advisory>) -> SystemCall {
    match code {
        EXIT => SystemCall::Exit,
        _ => {
            crate::stages_simple::advise(
                advisories,
                Advisory::UnrecognizedSystemCall { index, code },
            );
            SystemCall::Unrecognized(code)
        }
    }
}
