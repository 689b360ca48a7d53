use std::fmt;

use crate::bytecode::code::CodeBuffer;
use crate::runtime::fault::{Fault, Result};

// =============================================================================
// OPCODE - one byte per instruction
// =============================================================================

/// Instruction opcodes.
///
/// The byte values are part of the bytecode format: they start at 0 for
/// `Nop` and follow declaration order. Never renumber them.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop = 0,
    Push = 1,
    Pop = 2,
    Dup = 3,
    Swap = 4,

    // arithmetic
    Add = 5,
    Sub = 6,
    Mul = 7,
    Div = 8,

    // control flow
    Jmp = 9,
    Jz = 10,
    Jnz = 11,

    // calls
    Call = 12,
    Ret = 13,

    // memory
    Load = 14,
    Store = 15,

    // system
    Print = 16,
    Stop = 17,
}

impl Opcode {
    pub const ALL: [Opcode; 18] = [
        Opcode::Nop,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Dup,
        Opcode::Swap,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Jmp,
        Opcode::Jz,
        Opcode::Jnz,
        Opcode::Call,
        Opcode::Ret,
        Opcode::Load,
        Opcode::Store,
        Opcode::Print,
        Opcode::Stop,
    ];

    pub fn byte(self) -> u8 {
        self as u8
    }

    /// True for opcodes followed by a 4-byte little-endian immediate.
    pub fn has_immediate(self) -> bool {
        matches!(
            self,
            Opcode::Push | Opcode::Jmp | Opcode::Jz | Opcode::Jnz | Opcode::Call
        )
    }

    /// Encoded size of the whole instruction in bytes.
    pub fn width(self) -> usize {
        if self.has_immediate() {
            1 + CodeBuffer::IMMEDIATE_WIDTH
        } else {
            1
        }
    }

    /// True for opcodes whose immediate is a code offset.
    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Jz | Opcode::Jnz | Opcode::Call)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Dup => "DUP",
            Opcode::Swap => "SWAP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Jmp => "JMP",
            Opcode::Jz => "JZ",
            Opcode::Jnz => "JNZ",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Print => "PRINT",
            Opcode::Stop => "STOP",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = Fault;

    fn try_from(byte: u8) -> Result<Self> {
        Opcode::ALL
            .get(byte as usize)
            .copied()
            .ok_or(Fault::UnknownOpcode(byte))
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}

// =============================================================================
// INSTR - a decoded instruction with its immediate
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    Nop,
    Push(i32),
    Pop,
    Dup,
    Swap,

    Add,
    Sub,
    Mul,
    Div,

    /// Absolute jump to a code offset.
    Jmp(i32),
    /// Pop; jump if zero.
    Jz(i32),
    /// Pop; jump if non-zero.
    Jnz(i32),

    Call(i32),
    Ret,

    Load,
    Store,

    Print,
    Stop,
}

impl Instr {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instr::Nop => Opcode::Nop,
            Instr::Push(_) => Opcode::Push,
            Instr::Pop => Opcode::Pop,
            Instr::Dup => Opcode::Dup,
            Instr::Swap => Opcode::Swap,
            Instr::Add => Opcode::Add,
            Instr::Sub => Opcode::Sub,
            Instr::Mul => Opcode::Mul,
            Instr::Div => Opcode::Div,
            Instr::Jmp(_) => Opcode::Jmp,
            Instr::Jz(_) => Opcode::Jz,
            Instr::Jnz(_) => Opcode::Jnz,
            Instr::Call(_) => Opcode::Call,
            Instr::Ret => Opcode::Ret,
            Instr::Load => Opcode::Load,
            Instr::Store => Opcode::Store,
            Instr::Print => Opcode::Print,
            Instr::Stop => Opcode::Stop,
        }
    }

    pub fn immediate(&self) -> Option<i32> {
        match *self {
            Instr::Push(v) | Instr::Jmp(v) | Instr::Jz(v) | Instr::Jnz(v) | Instr::Call(v) => {
                Some(v)
            }
            _ => None,
        }
    }

    /// Branch target, for the jump and call forms.
    pub fn target(&self) -> Option<i32> {
        self.immediate().filter(|_| self.opcode().is_branch())
    }

    pub fn width(&self) -> usize {
        self.opcode().width()
    }

    /// Operand stack effect as (pops, pushes).
    pub fn stack_effect(&self) -> (usize, usize) {
        match self {
            Instr::Nop | Instr::Jmp(_) | Instr::Call(_) | Instr::Ret | Instr::Stop => (0, 0),
            Instr::Push(_) => (0, 1),
            Instr::Pop | Instr::Jz(_) | Instr::Jnz(_) | Instr::Print => (1, 0),
            Instr::Dup => (1, 2),
            Instr::Swap => (2, 2),
            Instr::Add | Instr::Sub | Instr::Mul | Instr::Div => (2, 1),
            Instr::Load => (1, 1),
            Instr::Store => (2, 0),
        }
    }

    /// Decode the instruction starting at `offset`.
    ///
    /// Never reads past the end of `code`: a truncated immediate is an
    /// [`Fault::OutOfBounds`].
    pub fn decode(code: &CodeBuffer, offset: usize) -> Result<Instr> {
        let op = Opcode::try_from(code.read_byte(offset)?)?;
        let imm = || code.read_i32(offset + 1);
        Ok(match op {
            Opcode::Nop => Instr::Nop,
            Opcode::Push => Instr::Push(imm()?),
            Opcode::Pop => Instr::Pop,
            Opcode::Dup => Instr::Dup,
            Opcode::Swap => Instr::Swap,
            Opcode::Add => Instr::Add,
            Opcode::Sub => Instr::Sub,
            Opcode::Mul => Instr::Mul,
            Opcode::Div => Instr::Div,
            Opcode::Jmp => Instr::Jmp(imm()?),
            Opcode::Jz => Instr::Jz(imm()?),
            Opcode::Jnz => Instr::Jnz(imm()?),
            Opcode::Call => Instr::Call(imm()?),
            Opcode::Ret => Instr::Ret,
            Opcode::Load => Instr::Load,
            Opcode::Store => Instr::Store,
            Opcode::Print => Instr::Print,
            Opcode::Stop => Instr::Stop,
        })
    }

    /// Append this instruction to `code`.
    pub fn encode(&self, code: &mut CodeBuffer) {
        match self.immediate() {
            Some(v) => {
                code.emit_i32(self.opcode(), v);
            }
            None => {
                code.emit(self.opcode());
            }
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.immediate() {
            Some(v) => write!(f, "{:<8}{}", self.opcode().mnemonic(), v),
            None => f.write_str(self.opcode().mnemonic()),
        }
    }
}
