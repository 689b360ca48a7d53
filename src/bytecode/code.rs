use crate::bytecode::op::Opcode;
use crate::runtime::fault::{Fault, Result};

const MIN_CAPACITY: usize = 16;

/// A bytecode program: opcode bytes interleaved with little-endian `i32`
/// immediates.
///
/// Built once by the host, then borrowed read-only by the interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBuffer {
    bytes: Vec<u8>,
}

impl CodeBuffer {
    /// Size in bytes of an encoded immediate.
    pub const IMMEDIATE_WIDTH: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Double the backing storage when `extra` more bytes would not fit.
    fn grow_for(&mut self, extra: usize) {
        let needed = self.bytes.len() + extra;
        if needed <= self.bytes.capacity() {
            return;
        }
        let mut capacity = self.bytes.capacity().max(MIN_CAPACITY);
        while capacity < needed {
            capacity *= 2;
        }
        self.bytes.reserve_exact(capacity - self.bytes.len());
    }

    pub fn append_byte(&mut self, byte: u8) {
        self.grow_for(1);
        self.bytes.push(byte);
    }

    pub fn append_i32(&mut self, value: i32) {
        self.grow_for(Self::IMMEDIATE_WIDTH);
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append an instruction without an immediate.
    pub fn emit(&mut self, op: Opcode) -> &mut Self {
        self.append_byte(op.byte());
        self
    }

    /// Append an instruction followed by its immediate.
    pub fn emit_i32(&mut self, op: Opcode, value: i32) -> &mut Self {
        self.append_byte(op.byte());
        self.append_i32(value);
        self
    }

    /// Overwrite the immediate at `offset`, e.g. to back-patch a forward jump.
    pub fn patch_i32(&mut self, offset: usize, value: i32) -> Result<()> {
        let slot = self.slice(offset, Self::IMMEDIATE_WIDTH)?;
        let end = offset + slot.len();
        self.bytes[offset..end].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn slice(&self, offset: usize, width: usize) -> Result<&[u8]> {
        offset
            .checked_add(width)
            .and_then(|end| self.bytes.get(offset..end))
            .ok_or(Fault::OutOfBounds { offset, width })
    }

    pub fn read_byte(&self, offset: usize) -> Result<u8> {
        self.slice(offset, 1).map(|b| b[0])
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        let raw = self.slice(offset, Self::IMMEDIATE_WIDTH)?;
        let mut le = [0u8; Self::IMMEDIATE_WIDTH];
        le.copy_from_slice(raw);
        Ok(i32::from_le_bytes(le))
    }
}

impl From<Vec<u8>> for CodeBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&[u8]> for CodeBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }
}
