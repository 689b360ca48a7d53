use std::collections::BTreeSet;
use std::fmt;

use crate::bytecode::{CodeBuffer, Instr, Opcode};
use crate::runtime::fault::Fault;

/// One decoded position in a code buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Instr { offset: usize, instr: Instr },
    /// A byte that is not an opcode. Listing resumes at the next byte.
    Unknown { offset: usize, byte: u8 },
    /// An opcode whose immediate runs past the end of the code.
    Truncated { offset: usize, opcode: Opcode },
}

impl Entry {
    pub fn offset(&self) -> usize {
        match self {
            Entry::Instr { offset, .. }
            | Entry::Unknown { offset, .. }
            | Entry::Truncated { offset, .. } => *offset,
        }
    }
}

/// Disassembly of a whole code buffer.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub entries: Vec<Entry>,
    /// Offsets named by a JMP/JZ/JNZ/CALL somewhere in the code.
    pub jump_targets: BTreeSet<usize>,
}

/// Decode `code` front to back. Never fails: malformed bytes become
/// [`Entry::Unknown`] or [`Entry::Truncated`].
pub fn disassemble(code: &CodeBuffer) -> Listing {
    let mut listing = Listing::default();
    let mut offset = 0;

    while offset < code.len() {
        match Instr::decode(code, offset) {
            Ok(instr) => {
                if let Some(target) = instr.target().and_then(|t| usize::try_from(t).ok()) {
                    listing.jump_targets.insert(target);
                }
                listing.entries.push(Entry::Instr { offset, instr });
                offset += instr.width();
            }
            Err(Fault::UnknownOpcode(byte)) => {
                listing.entries.push(Entry::Unknown { offset, byte });
                offset += 1;
            }
            Err(_) => {
                // only an immediate can be cut short once the opcode decoded
                if let Ok(opcode) = code.read_byte(offset).and_then(Opcode::try_from) {
                    listing.entries.push(Entry::Truncated { offset, opcode });
                }
                break;
            }
        }
    }

    listing
}

/// Print disassembly of a code buffer to stdout
pub fn print_code(code: &CodeBuffer) {
    println!("════════════════════════════════════════");
    println!(" {} bytes", code.len());
    println!("════════════════════════════════════════");
    print!("{}", disassemble(code));
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let offset = entry.offset();
            let marker = if self.jump_targets.contains(&offset) {
                "► "
            } else {
                "  "
            };
            write!(f, "{:04} {}", offset, marker)?;

            match entry {
                Entry::Instr { instr, .. } => match instr.target() {
                    Some(t) if usize::try_from(t).map_or(true, |t| !self.is_mapped(t)) => {
                        writeln!(f, "{:<8}{:<8}; bad target", instr.opcode(), t)?
                    }
                    _ => writeln!(f, "{}", instr)?,
                },
                Entry::Unknown { byte, .. } => writeln!(f, ".byte   {:#04x}", byte)?,
                Entry::Truncated { opcode, .. } => writeln!(f, "{:<8}; truncated", opcode)?,
            }
        }

        if self.jump_targets.contains(&self.end()) {
            writeln!(f, "{:04} ► <end>", self.end())?;
        }
        Ok(())
    }
}

impl Listing {
    /// Offset one past the last decoded entry.
    fn end(&self) -> usize {
        match self.entries.last() {
            Some(Entry::Instr { offset, instr }) => offset + instr.width(),
            Some(Entry::Unknown { offset, .. }) => offset + 1,
            Some(Entry::Truncated { offset, .. }) => *offset,
            None => 0,
        }
    }

    /// True if `offset` starts an entry or is the end of code.
    fn is_mapped(&self, offset: usize) -> bool {
        offset == self.end()
            || self
                .entries
                .binary_search_by_key(&offset, Entry::offset)
                .is_ok()
    }
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
    fn test_lists_offsets_and_targets() {
        let code = code_of(&[Instr::Push(0), Instr::Jz(11), Instr::Nop, Instr::Print]);
        let listing = disassemble(&code);
        let offsets: Vec<_> = listing.entries.iter().map(Entry::offset).collect();
        assert_eq!(offsets, [0, 5, 10, 11]);
        assert!(listing.jump_targets.contains(&11));

        let text = listing.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "0000   PUSH    0");
        assert_eq!(lines[1], "0005   JZ      11");
        assert_eq!(lines[3], "0011 ► PRINT");
    }

    #[test]
    fn test_unknown_bytes_and_truncation() {
        let code = CodeBuffer::from(vec![0xee, Opcode::Stop.byte(), Opcode::Push.byte(), 1]);
        let listing = disassemble(&code);
        assert_eq!(
            listing.entries,
            [
                Entry::Unknown {
                    offset: 0,
                    byte: 0xee
                },
                Entry::Instr {
                    offset: 1,
                    instr: Instr::Stop
                },
                Entry::Truncated {
                    offset: 2,
                    opcode: Opcode::Push
                },
            ]
        );
        let text = listing.to_string();
        assert!(text.contains(".byte   0xee"));
        assert!(text.contains("PUSH    ; truncated"));
    }

    #[test]
    fn test_flags_targets_inside_an_instruction() {
        let code = code_of(&[Instr::Jmp(2), Instr::Jmp(-1)]);
        let text = disassemble(&code).to_string();
        assert!(text.contains("JMP     2       ; bad target"));
        assert!(text.contains("JMP     -1      ; bad target"));
    }

    #[test]
    fn test_marks_jump_to_end() {
        let code = code_of(&[Instr::Jmp(5)]);
        assert!(disassemble(&code).to_string().ends_with("0005 ► <end>\n"));
    }
}
