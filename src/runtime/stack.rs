//! Operand stack.
//!
//! A bounded LIFO of `i32` values. Every arithmetic and data-movement
//! instruction goes through it. Pushing past capacity or popping an empty
//! stack is reported as a [`Fault`] and leaves the stack untouched.

use crate::runtime::fault::{Fault, Result};

/// Default operand stack capacity.
pub const DEFAULT_STACK_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandStack {
    items: Vec<i32>,
    capacity: usize,
}

impl Default for OperandStack {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_STACK_CAPACITY)
    }
}

impl OperandStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stack that holds at most `capacity` values. Storage grows
    /// on demand; nothing is allocated up front.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when one more push would overflow.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn push(&mut self, value: i32) -> Result<()> {
        if self.is_full() {
            return Err(Fault::StackOverflow);
        }
        self.items.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<i32> {
        self.items.pop().ok_or(Fault::StackUnderflow)
    }

    /// Top of stack, without removing it.
    pub fn peek(&self) -> Result<i32> {
        self.items.last().copied().ok_or(Fault::StackUnderflow)
    }

    /// Value `depth` slots below the top (0 = top), without removing it.
    pub fn peek_at(&self, depth: usize) -> Result<i32> {
        let len = self.items.len();
        if depth >= len {
            return Err(Fault::StackUnderflow);
        }
        Ok(self.items[len - 1 - depth])
    }

    /// Fail with underflow unless at least `n` values are present.
    pub fn require(&self, n: usize) -> Result<()> {
        if self.items.len() < n {
            return Err(Fault::StackUnderflow);
        }
        Ok(())
    }

    pub fn dup(&mut self) -> Result<()> {
        let top = self.peek()?;
        self.push(top)
    }

    /// Exchange the top two values.
    pub fn swap(&mut self) -> Result<()> {
        self.require(2)?;
        let len = self.items.len();
        self.items.swap(len - 1, len - 2);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// All values, bottom to top.
    pub fn as_slice(&self) -> &[i32] {
        &self.items
    }
}
