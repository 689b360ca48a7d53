use crate::runtime::fault::{Fault, Result};

/// Default number of memory cells.
pub const DEFAULT_MEMORY_SIZE: usize = 256;

/// Flat, zero-initialised array of `i32` cells addressed by LOAD/STORE.
///
/// Addresses are signed; anything negative or `>= len` is rejected rather
/// than wrapped. Backing storage only covers cells up to the highest address
/// stored so far; every cell past it reads as zero.
#[derive(Debug, Clone)]
pub struct MemorySegment {
    cells: Vec<i32>,
    size: usize,
}

impl Default for MemorySegment {
    fn default() -> Self {
        Self::with_size(DEFAULT_MEMORY_SIZE)
    }
}

impl MemorySegment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(size: usize) -> Self {
        Self {
            cells: Vec::new(),
            size,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Map a signed address onto a cell index.
    pub fn index(&self, addr: i32) -> Result<usize> {
        usize::try_from(addr)
            .ok()
            .filter(|&i| i < self.size)
            .ok_or(Fault::InvalidMemoryAddress(addr))
    }

    pub fn load(&self, addr: i32) -> Result<i32> {
        let i = self.index(addr)?;
        Ok(self.cells.get(i).copied().unwrap_or(0))
    }

    pub fn store(&mut self, addr: i32, value: i32) -> Result<()> {
        let i = self.index(addr)?;
        if i >= self.cells.len() {
            self.cells.resize(i + 1, 0);
        }
        self.cells[i] = value;
        Ok(())
    }

    /// Zero every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Cells from address 0 up to the highest address stored; the rest are zero.
    pub fn as_slice(&self) -> &[i32] {
        &self.cells
    }
}
