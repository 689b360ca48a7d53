use serde::{Deserialize, Serialize};

use crate::runtime::fault::{Fault, Result};

/// Default call stack capacity.
pub const DEFAULT_CALL_STACK_CAPACITY: usize = 256;

/// Saved state for one active CALL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    /// Offset of the instruction following the CALL and its operand.
    pub return_address: usize,
    /// Operand stack size at the time of the call. Carried, not interpreted.
    pub frame_marker: usize,
}

/// Bounded stack of [`CallFrame`]s for CALL/RET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    capacity: usize,
}

impl Default for CallStack {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CALL_STACK_CAPACITY)
    }
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::new(),
            capacity,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push_frame(&mut self, return_address: usize, frame_marker: usize) -> Result<()> {
        if self.frames.len() >= self.capacity {
            return Err(Fault::CallStackOverflow);
        }
        self.frames.push(CallFrame {
            return_address,
            frame_marker,
        });
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Result<CallFrame> {
        self.frames.pop().ok_or(Fault::CallStackUnderflow)
    }

    /// Innermost active frame.
    pub fn top(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Active frames, outermost first.
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_come_back_in_lifo_order() {
        let mut calls = CallStack::new();
        calls.push_frame(10, 0).unwrap();
        calls.push_frame(20, 3).unwrap();
        assert_eq!(calls.depth(), 2);
        assert_eq!(
            calls.pop_frame(),
            Ok(CallFrame {
                return_address: 20,
                frame_marker: 3
            })
        );
        assert_eq!(calls.pop_frame().map(|f| f.return_address), Ok(10));
        assert!(calls.is_empty());
    }

    #[test]
    fn test_overflow_at_capacity() {
        let mut calls = CallStack::with_capacity(2);
        calls.push_frame(1, 0).unwrap();
        calls.push_frame(2, 0).unwrap();
        assert_eq!(calls.push_frame(3, 0), Err(Fault::CallStackOverflow));
        assert_eq!(calls.depth(), 2);
        assert_eq!(calls.top().map(|f| f.return_address), Some(2));
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut calls = CallStack::with_capacity(usize::MAX);
        calls.push_frame(4, 1).unwrap();
        assert_eq!(calls.depth(), 1);
    }

    #[test]
    fn test_underflow_when_empty() {
        let mut calls = CallStack::new();
        assert_eq!(calls.capacity(), DEFAULT_CALL_STACK_CAPACITY);
        assert_eq!(calls.pop_frame(), Err(Fault::CallStackUnderflow));
    }
}
