//! A bounded bytecode interpreter over 32-bit signed integers.
//!
//! A host builds a [`CodeBuffer`], binds an [`Interpreter`] to it and calls
//! [`Interpreter::run`]. Execution stops at STOP, at the end of the code, or
//! at the first [`Fault`]; faults are returned as an [`Outcome`], never by
//! aborting the process.
//!
//! ```
//! use stackvm::{CodeBuffer, Interpreter, Opcode, Outcome, VmConfig};
//!
//! let mut code = CodeBuffer::new();
//! code.emit_i32(Opcode::Push, 5)
//!     .emit_i32(Opcode::Push, 4)
//!     .emit(Opcode::Add)
//!     .emit(Opcode::Stop);
//!
//! let mut vm = Interpreter::with_output(&code, VmConfig::default(), Vec::new());
//! assert_eq!(vm.run(), Outcome::Normal);
//! assert_eq!(vm.stack().as_slice(), &[9]);
//! ```

pub mod bytecode;
pub mod demos;
pub mod runtime;

pub use bytecode::{CodeBuffer, Instr, Opcode};
pub use runtime::{
    CallFrame, CallStack, Fault, Interpreter, MemorySegment, OperandStack, Outcome, Result,
    Snapshot, State, VmConfig,
};
