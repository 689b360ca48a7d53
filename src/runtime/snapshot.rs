use serde::{Deserialize, Serialize};

use crate::runtime::call_stack::CallFrame;
use crate::runtime::interpreter::State;

/// A copy of the interpreter's state, taken with
/// [`Interpreter::snapshot`](crate::Interpreter::snapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub ip: usize,
    pub state: State,
    /// Operand stack, bottom to top.
    pub stack: Vec<i32>,
    /// Active call frames, outermost first.
    pub call_frames: Vec<CallFrame>,
    /// Memory from address 0 up to the highest address stored; cells past
    /// it, up to `memory_size`, are zero.
    pub memory: Vec<i32>,
    pub memory_size: usize,
}

impl Snapshot {
    /// Encode with postcard.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    /// Top of the operand stack, if any.
    pub fn top(&self) -> Option<i32> {
        self.stack.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{CodeBuffer, Opcode};
    use crate::runtime::fault::Fault;
    use crate::runtime::interpreter::{Interpreter, Outcome, VmConfig};

    fn small() -> VmConfig {
        VmConfig {
            memory_size: 4,
            ..VmConfig::default()
        }
    }

    #[test]
    fn test_captures_final_state() {
        let mut code = CodeBuffer::new();
        code.emit_i32(Opcode::Push, 12)
            .emit_i32(Opcode::Push, 3)
            .emit(Opcode::Store)
            .emit_i32(Opcode::Push, 5);
        let mut vm = Interpreter::with_output(&code, small(), Vec::new());
        vm.run();

        let snap = vm.snapshot();
        assert_eq!(snap.state, State::Halted(Outcome::Normal));
        assert_eq!(snap.ip, code.len());
        assert_eq!(snap.stack, [5]);
        assert_eq!(snap.top(), Some(5));
        assert_eq!(snap.memory, [0, 0, 0, 12]);
        assert_eq!(snap.memory_size, 4);
        assert!(snap.call_frames.is_empty());
    }

    #[test]
    fn test_postcard_encoding_preserves_fault_state() {
        let mut code = CodeBuffer::new();
        code.emit_i32(Opcode::Call, 6)
            .emit(Opcode::Stop)
            .emit_i32(Opcode::Push, 1)
            .emit_i32(Opcode::Push, 0)
            .emit(Opcode::Div);
        let mut vm = Interpreter::with_output(&code, small(), Vec::new());
        assert_eq!(vm.run(), Outcome::Fault(Fault::DivisionByZero));

        let snap = vm.snapshot();
        let bytes = snap.to_bytes().unwrap();
        let back = Snapshot::from_bytes(&bytes).unwrap();
        assert_eq!(back, snap);
        assert_eq!(back.call_frames[0].return_address, 5);
        assert_eq!(back.state, State::Halted(Outcome::Fault(Fault::DivisionByZero)));
    }

    #[test]
    fn test_garbage_does_not_decode() {
        assert!(Snapshot::from_bytes(&[0xff, 0xff, 0xff]).is_err());
    }
}
