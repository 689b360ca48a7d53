use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by every container and by instruction decoding.
pub type Result<T> = std::result::Result<T, Fault>;

/// A condition that halts the interpreter.
///
/// Faults are raised at the point of violation, before the faulting
/// instruction commits any change to the stacks, memory or instruction
/// pointer. They are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum Fault {
    /// Push onto a full operand stack.
    #[error("stack overflow")]
    StackOverflow,

    /// Pop or peek on an operand stack holding too few values.
    #[error("stack underflow")]
    StackUnderflow,

    /// CALL nested deeper than the call stack capacity.
    #[error("call stack overflow")]
    CallStackOverflow,

    /// RET with no active frame.
    #[error("call stack underflow")]
    CallStackUnderflow,

    #[error("division by zero")]
    DivisionByZero,

    /// LOAD/STORE outside `[0, size)`.
    #[error("invalid memory address {0}")]
    InvalidMemoryAddress(i32),

    /// JMP/JZ/JNZ/CALL target outside `[0, len]`.
    #[error("invalid jump target {0}")]
    InvalidJumpTarget(i32),

    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    /// A read of `width` bytes at `offset` would run past the end of the code.
    #[error("read of {width} byte(s) at offset {offset} runs past end of code")]
    OutOfBounds { offset: usize, width: usize },

    /// The PRINT sink rejected a write.
    #[error("output sink failed")]
    OutputFailed,
}

impl Fault {
    /// Short stable name, used in logs and the demo binary.
    pub fn kind(&self) -> &'static str {
        match self {
            Fault::StackOverflow => "StackOverflow",
            Fault::StackUnderflow => "StackUnderflow",
            Fault::CallStackOverflow => "CallStackOverflow",
            Fault::CallStackUnderflow => "CallStackUnderflow",
            Fault::DivisionByZero => "DivisionByZero",
            Fault::InvalidMemoryAddress(_) => "InvalidMemoryAddress",
            Fault::InvalidJumpTarget(_) => "InvalidJumpTarget",
            Fault::UnknownOpcode(_) => "UnknownOpcode",
            Fault::OutOfBounds { .. } => "OutOfBounds",
            Fault::OutputFailed => "OutputFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_offending_datum() {
        assert_eq!(
            Fault::InvalidMemoryAddress(-1).to_string(),
            "invalid memory address -1"
        );
        assert_eq!(Fault::UnknownOpcode(0xff).to_string(), "unknown opcode 0xff");
        assert_eq!(
            Fault::OutOfBounds { offset: 3, width: 4 }.to_string(),
            "read of 4 byte(s) at offset 3 runs past end of code"
        );
    }

    #[test]
    fn test_kind_ignores_payload() {
        assert_eq!(Fault::InvalidJumpTarget(7).kind(), "InvalidJumpTarget");
        assert_eq!(Fault::InvalidJumpTarget(-7).kind(), "InvalidJumpTarget");
    }
}
