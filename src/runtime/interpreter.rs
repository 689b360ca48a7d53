use std::io::{self, Stdout, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::bytecode::{CodeBuffer, Instr};
use crate::runtime::call_stack::{CallStack, DEFAULT_CALL_STACK_CAPACITY};
use crate::runtime::fault::{Fault, Result};
use crate::runtime::memory::{DEFAULT_MEMORY_SIZE, MemorySegment};
use crate::runtime::snapshot::Snapshot;
use crate::runtime::stack::{DEFAULT_STACK_CAPACITY, OperandStack};

/// Construction-time resource bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    pub stack_capacity: usize,
    pub call_stack_capacity: usize,
    pub memory_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            call_stack_capacity: DEFAULT_CALL_STACK_CAPACITY,
            memory_size: DEFAULT_MEMORY_SIZE,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// STOP, or the instruction pointer reached the end of the code.
    Normal,
    Fault(Fault),
}

impl Outcome {
    pub fn is_normal(&self) -> bool {
        matches!(self, Outcome::Normal)
    }

    pub fn fault(&self) -> Option<Fault> {
        match self {
            Outcome::Normal => None,
            Outcome::Fault(fault) => Some(*fault),
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            Outcome::Normal => Ok(()),
            Outcome::Fault(fault) => Err(fault),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Ready,
    Running,
    /// Terminal until [`Interpreter::reset`].
    Halted(Outcome),
}

enum Flow {
    Continue(usize),
    Halt,
}

/// Fetch-decode-execute loop over a borrowed [`CodeBuffer`].
///
/// PRINT writes one decimal line per value to `W` (stdout by default).
pub struct Interpreter<'code, W: Write = Stdout> {
    code: &'code CodeBuffer,
    stack: OperandStack,
    calls: CallStack,
    memory: MemorySegment,
    ip: usize,
    state: State,
    config: VmConfig,
    out: W,
}

impl<'code> Interpreter<'code, Stdout> {
    pub fn new(code: &'code CodeBuffer) -> Self {
        Self::with_config(code, VmConfig::default())
    }

    pub fn with_config(code: &'code CodeBuffer, config: VmConfig) -> Self {
        Self::with_output(code, config, io::stdout())
    }
}

impl<'code, W: Write> Interpreter<'code, W> {
    pub fn with_output(code: &'code CodeBuffer, config: VmConfig, out: W) -> Self {
        Self {
            code,
            stack: OperandStack::with_capacity(config.stack_capacity),
            calls: CallStack::with_capacity(config.call_stack_capacity),
            memory: MemorySegment::with_size(config.memory_size),
            ip: 0,
            state: State::Ready,
            config,
            out,
        }
    }

    pub fn code(&self) -> &CodeBuffer {
        self.code
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.calls
    }

    pub fn memory(&self) -> &MemorySegment {
        &self.memory
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// The terminal outcome, once halted.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            State::Halted(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            ip: self.ip,
            state: self.state,
            stack: self.stack.as_slice().to_vec(),
            call_frames: self.calls.frames().to_vec(),
            memory: self.memory.as_slice().to_vec(),
            memory_size: self.memory.len(),
        }
    }

    /// Reinitialise all containers and the instruction pointer.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.calls.clear();
        self.memory.clear();
        self.ip = 0;
        self.state = State::Ready;
    }

    /// Run until STOP, end of code, or a fault.
    ///
    /// A halted interpreter executes nothing and returns its stored
    /// outcome; call [`reset`](Self::reset) to run again.
    pub fn run(&mut self) -> Outcome {
        if let State::Halted(outcome) = self.state {
            warn!(?outcome, "run() on a halted interpreter without reset");
            return outcome;
        }
        loop {
            if let Some(outcome) = self.step() {
                return outcome;
            }
        }
    }

    /// Execute a single instruction. Returns the outcome once halted.
    pub fn step(&mut self) -> Option<Outcome> {
        match self.state {
            State::Halted(outcome) => return Some(outcome),
            State::Ready => {
                debug!(len = self.code.len(), "run start");
                self.ip = 0;
                self.state = State::Running;
            }
            State::Running => {}
        }

        let outcome = match self.exec_one() {
            Ok(Flow::Continue(next)) => {
                self.ip = next;
                return None;
            }
            Ok(Flow::Halt) => Outcome::Normal,
            Err(fault) => {
                warn!(ip = self.ip, %fault, "fault");
                Outcome::Fault(fault)
            }
        };

        self.state = State::Halted(outcome);
        debug!(ip = self.ip, ?outcome, depth = self.stack.len(), "halted");
        Some(outcome)
    }

    // Execution

    /// Nothing is mutated before every check for the instruction has passed,
    /// so a fault leaves all state (including `ip`) as it was.
    fn exec_one(&mut self) -> Result<Flow> {
        let pc = self.ip;
        if pc >= self.code.len() {
            return Ok(Flow::Halt);
        }

        let instr = Instr::decode(self.code, pc)?;
        let next = pc + instr.width();
        trace!(ip = pc, %instr, depth = self.stack.len());

        match instr {
            Instr::Nop => {}
            Instr::Push(v) => self.stack.push(v)?,
            Instr::Pop => {
                self.stack.pop()?;
            }
            Instr::Dup => self.stack.dup()?,
            Instr::Swap => self.stack.swap()?,

            // Arithmetic
            Instr::Add => self.binary(|a, b| Ok(a.wrapping_add(b)))?,
            Instr::Sub => self.binary(|a, b| Ok(a.wrapping_sub(b)))?,
            Instr::Mul => self.binary(|a, b| Ok(a.wrapping_mul(b)))?,
            Instr::Div => self.binary(|a, b| {
                if b == 0 {
                    return Err(Fault::DivisionByZero);
                }
                Ok(a.wrapping_div(b))
            })?,

            // Control flow
            Instr::Jmp(target) => return Ok(Flow::Continue(self.jump_target(target)?)),
            Instr::Jz(target) => return self.branch(target, next, |v| v == 0),
            Instr::Jnz(target) => return self.branch(target, next, |v| v != 0),

            Instr::Call(target) => {
                let target = self.jump_target(target)?;
                self.calls.push_frame(next, self.stack.len())?;
                return Ok(Flow::Continue(target));
            }
            Instr::Ret => {
                let frame = self.calls.pop_frame()?;
                return Ok(Flow::Continue(frame.return_address));
            }

            // Memory
            Instr::Load => {
                let addr = self.stack.peek()?;
                let value = self.memory.load(addr)?;
                self.stack.pop()?;
                self.stack.push(value)?;
            }
            Instr::Store => {
                self.stack.require(2)?;
                let addr = self.stack.peek_at(0)?;
                let value = self.stack.peek_at(1)?;
                self.memory.store(addr, value)?;
                self.stack.pop()?;
                self.stack.pop()?;
            }

            // System
            Instr::Print => {
                let value = self.stack.peek()?;
                writeln!(self.out, "{}", value).map_err(|e| {
                    warn!(error = %e, "PRINT write failed");
                    Fault::OutputFailed
                })?;
                self.stack.pop()?;
            }
            Instr::Stop => {
                self.ip = next;
                return Ok(Flow::Halt);
            }
        }

        Ok(Flow::Continue(next))
    }

    /// Pop `b` then `a` and push `op(a, b)`, checking everything first.
    fn binary(&mut self, op: impl FnOnce(i32, i32) -> Result<i32>) -> Result<()> {
        self.stack.require(2)?;
        let b = self.stack.peek_at(0)?;
        let a = self.stack.peek_at(1)?;
        let result = op(a, b)?;
        self.stack.pop()?;
        self.stack.pop()?;
        self.stack.push(result)
    }

    fn branch(&mut self, target: i32, next: usize, taken: fn(i32) -> bool) -> Result<Flow> {
        let cond = self.stack.peek()?;
        let target = self.jump_target(target)?;
        self.stack.pop()?;
        Ok(Flow::Continue(if taken(cond) { target } else { next }))
    }

    /// Targets may equal the code length: jumping there halts normally.
    fn jump_target(&self, target: i32) -> Result<usize> {
        usize::try_from(target)
            .ok()
            .filter(|&t| t <= self.code.len())
            .ok_or(Fault::InvalidJumpTarget(target))
    }
}
