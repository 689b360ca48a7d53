pub mod code;
pub mod disasm;
pub mod op;
pub mod verify;

pub use code::CodeBuffer;
pub use op::{Instr, Opcode};
