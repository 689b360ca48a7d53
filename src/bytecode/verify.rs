use thiserror::Error;

use crate::bytecode::disasm::{Entry, disassemble};
use crate::bytecode::{CodeBuffer, Instr, Opcode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("unknown opcode {byte:#04x} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("{opcode} at offset {offset} is missing its immediate")]
    Truncated { offset: usize, opcode: Opcode },

    #[error("{opcode} at offset {offset} targets {target}, which is not an instruction boundary")]
    BadTarget {
        offset: usize,
        opcode: Opcode,
        target: i32,
    },

    #[error("{opcode} at offset {offset} needs {needed} value(s) but the stack holds {depth}")]
    StackUnderflow {
        offset: usize,
        opcode: Opcode,
        needed: usize,
        depth: usize,
    },
}

/// Structural check of a whole code buffer.
///
/// Reports the first unknown opcode, truncated immediate, or branch target
/// that does not land on an instruction boundary (the code length itself is
/// a valid target). Then walks the entry block, from offset 0 up to the first
/// control transfer, and checks it never pops an empty stack.
///
/// The interpreter does not require this to pass; it re-checks everything
/// at run time.
pub fn check_code(code: &CodeBuffer) -> Result<(), VerifyError> {
    let listing = disassemble(code);

    let mut boundaries = Vec::with_capacity(listing.entries.len());
    for entry in &listing.entries {
        match *entry {
            Entry::Instr { offset, .. } => boundaries.push(offset),
            Entry::Unknown { offset, byte } => {
                return Err(VerifyError::UnknownOpcode { offset, byte });
            }
            Entry::Truncated { offset, opcode } => {
                return Err(VerifyError::Truncated { offset, opcode });
            }
        }
    }

    for entry in &listing.entries {
        let Entry::Instr { offset, instr } = *entry else {
            continue;
        };
        if let Some(target) = instr.target() {
            let lands = usize::try_from(target).is_ok_and(|t| {
                t == code.len() || boundaries.binary_search(&t).is_ok()
            });
            if !lands {
                return Err(VerifyError::BadTarget {
                    offset,
                    opcode: instr.opcode(),
                    target,
                });
            }
        }
    }

    check_entry_block(&listing.entries)
}

/// Track stack depth through straight-line code starting at offset 0.
fn check_entry_block(entries: &[Entry]) -> Result<(), VerifyError> {
    let mut depth = 0usize;

    for entry in entries {
        let Entry::Instr { offset, instr } = *entry else {
            break;
        };
        let (pops, pushes) = instr.stack_effect();
        if depth < pops {
            return Err(VerifyError::StackUnderflow {
                offset,
                opcode: instr.opcode(),
                needed: pops,
                depth,
            });
        }
        depth = depth - pops + pushes;

        if ends_block(&instr) {
            break;
        }
    }

    Ok(())
}

fn ends_block(instr: &Instr) -> bool {
    instr.opcode().is_branch() || matches!(instr, Instr::Ret | Instr::Stop)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(instrs: &[Instr]) -> CodeBuffer {
        let mut code = CodeBuffer::new();
        for instr in instrs {
            instr.encode(&mut code);
        }
        code
    }

    #[test]
    fn test_accepts_well_formed_code() {
        let code = code_of(&[
            Instr::Push(0),
            Instr::Jz(16),
            Instr::Push(111),
            Instr::Stop,
            Instr::Push(222),
            Instr::Stop,
        ]);
        assert_eq!(check_code(&code), Ok(()));
        assert_eq!(check_code(&CodeBuffer::new()), Ok(()));
    }

    #[test]
    fn test_jump_to_end_is_fine() {
        assert_eq!(check_code(&code_of(&[Instr::Jmp(5)])), Ok(()));
    }

    #[test]
    fn test_rejects_unknown_opcode() {
        let code = CodeBuffer::from(vec![Opcode::Nop.byte(), 0x40]);
        assert_eq!(
            check_code(&code),
            Err(VerifyError::UnknownOpcode {
                offset: 1,
                byte: 0x40
            })
        );
    }

    #[test]
    fn test_rejects_truncated_immediate() {
        let code = CodeBuffer::from(vec![Opcode::Call.byte(), 0, 0]);
        assert_eq!(
            check_code(&code),
            Err(VerifyError::Truncated {
                offset: 0,
                opcode: Opcode::Call
            })
        );
    }

    #[test]
    fn test_rejects_target_inside_instruction() {
        let code = code_of(&[Instr::Push(1), Instr::Jnz(3)]);
        let err = check_code(&code).unwrap_err();
        assert_eq!(
            err,
            VerifyError::BadTarget {
                offset: 5,
                opcode: Opcode::Jnz,
                target: 3
            }
        );
        assert_eq!(
            err.to_string(),
            "JNZ at offset 5 targets 3, which is not an instruction boundary"
        );
    }

    #[test]
    fn test_rejects_entry_block_underflow() {
        let code = code_of(&[Instr::Push(1), Instr::Add]);
        assert_eq!(
            check_code(&code),
            Err(VerifyError::StackUnderflow {
                offset: 5,
                opcode: Opcode::Add,
                needed: 2,
                depth: 1
            })
        );
    }

    #[test]
    fn test_stops_tracking_at_first_branch() {
        // POP at offset 6 is only reached through the CALL
        let code = code_of(&[Instr::Call(6), Instr::Stop, Instr::Pop, Instr::Ret]);
        assert_eq!(check_code(&code), Ok(()));
    }
}
