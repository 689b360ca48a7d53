pub mod call_stack;
pub mod fault;
pub mod interpreter;
pub mod memory;
pub mod snapshot;
pub mod stack;

pub use call_stack::{CallFrame, CallStack};
pub use fault::{Fault, Result};
pub use interpreter::{Interpreter, Outcome, State, VmConfig};
pub use memory::MemorySegment;
pub use snapshot::Snapshot;
pub use stack::OperandStack;
