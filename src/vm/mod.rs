use tracing::{debug, trace};

use crate::chunk::{Chunk, OpCode};
use crate::compiler::{self, CompileErrors};
use crate::config::Config;
use crate::disassembler;
use crate::value::Value;

/// Capacity of the operand stack.
pub const STACK_MAX: usize = 256;

// ── Errors ───────────────────────────────────────────────────────────

/// What went wrong while executing a chunk. The last four variants can only
/// come from hand-built or corrupt bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("Stack underflow.")]
    StackUnderflow,
    #[error("Unknown opcode {0}.")]
    UnknownOpcode(u8),
    #[error("Constant index {0} is out of range.")]
    ConstantOutOfRange(u8),
    #[error("Unexpected end of bytecode.")]
    UnexpectedEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{fault}\n[line {line}] in script")]
pub struct RuntimeError {
    pub fault: Fault,
    /// Source line of the instruction that faulted.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpretError {
    #[error("{0}")]
    Compile(#[from] CompileErrors),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

/// Coarse outcome of an interpret call, for hosts that only need to tell the
/// two error classes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

impl InterpretError {
    pub fn result(&self) -> InterpretResult {
        match self {
            InterpretError::Compile(_) => InterpretResult::CompileError,
            InterpretError::Runtime(_) => InterpretResult::RuntimeError,
        }
    }
}

impl<T> From<&Result<T, InterpretError>> for InterpretResult {
    fn from(outcome: &Result<T, InterpretError>) -> Self {
        match outcome {
            Ok(_) => InterpretResult::Ok,
            Err(e) => e.result(),
        }
    }
}

type Exec<T> = Result<T, Fault>;

// ── VM ───────────────────────────────────────────────────────────────

/// Stack machine. The chunk is borrowed only for the duration of one run;
/// the stack belongs to the VM and is emptied before every run and after
/// every fault.
pub struct Vm {
    stack: [Value; STACK_MAX],
    stack_top: usize,
    config: Config,
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Vm::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Vm {
            stack: [Value::Nil; STACK_MAX],
            stack_top: 0,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Live portion of the operand stack, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack[..self.stack_top]
    }

    /// Compiles `source` and, only if that succeeded, runs the result.
    pub fn interpret(&mut self, source: &str) -> Result<Value, InterpretError> {
        let mut chunk = Chunk::new();
        compiler::compile_with(source, &mut chunk, &self.config)?;
        Ok(self.run(&chunk)?)
    }

    /// Executes `chunk` until `Return` and yields the value it returned.
    pub fn run(&mut self, chunk: &Chunk) -> Result<Value, RuntimeError> {
        self.reset_stack();
        let mut ip = 0;
        match self.execute(chunk, &mut ip) {
            Ok(value) => Ok(value),
            Err(fault) => {
                let line = ip.checked_sub(1).and_then(|i| chunk.line(i)).unwrap_or(0);
                self.reset_stack();
                debug!(%fault, line, "runtime error");
                Err(RuntimeError { fault, line })
            }
        }
    }

    fn execute(&mut self, chunk: &Chunk, ip: &mut usize) -> Exec<Value> {
        loop {
            if self.config.trace_execution {
                self.trace_instruction(chunk, *ip);
            }

            let byte = read_byte(chunk, ip)?;
            let op = OpCode::try_from(byte).map_err(|_| Fault::UnknownOpcode(byte))?;

            match op {
                OpCode::Constant => {
                    let index = read_byte(chunk, ip)?;
                    let value = chunk.constant(index).ok_or(Fault::ConstantOutOfRange(index))?;
                    self.push(value)?;
                }
                OpCode::Nil => self.push(Value::Nil)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,

                OpCode::Equal => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(Value::Bool(a == b))?;
                }
                OpCode::Greater => self.binary_op(|a, b| Value::Bool(a > b))?,
                OpCode::Less => self.binary_op(|a, b| Value::Bool(a < b))?,

                // IEEE-754 throughout: division by zero yields an infinity or NaN.
                OpCode::Add => self.binary_op(|a, b| Value::Number(a + b))?,
                OpCode::Subtract => self.binary_op(|a, b| Value::Number(a - b))?,
                OpCode::Multiply => self.binary_op(|a, b| Value::Number(a * b))?,
                OpCode::Divide => self.binary_op(|a, b| Value::Number(a / b))?,

                OpCode::Not => {
                    let value = self.pop()?;
                    self.push(Value::Bool(value.is_falsey()))?;
                }
                OpCode::Negate => {
                    let n = self.peek(0)?.as_number().ok_or(Fault::OperandMustBeNumber)?;
                    self.pop()?;
                    self.push(Value::Number(-n))?;
                }

                OpCode::Return => return self.pop(),
            }
        }
    }

    fn binary_op(&mut self, op: impl FnOnce(f64, f64) -> Value) -> Exec<()> {
        let (Some(b), Some(a)) = (self.peek(0)?.as_number(), self.peek(1)?.as_number()) else {
            return Err(Fault::OperandsMustBeNumbers);
        };
        self.stack_top -= 2;
        self.push(op(a, b))
    }

    fn push(&mut self, value: Value) -> Exec<()> {
        if self.stack_top == STACK_MAX {
            return Err(Fault::StackOverflow);
        }
        self.stack[self.stack_top] = value;
        self.stack_top += 1;
        Ok(())
    }

    fn pop(&mut self) -> Exec<Value> {
        if self.stack_top == 0 {
            return Err(Fault::StackUnderflow);
        }
        self.stack_top -= 1;
        Ok(self.stack[self.stack_top])
    }

    fn peek(&self, distance: usize) -> Exec<Value> {
        if distance >= self.stack_top {
            return Err(Fault::StackUnderflow);
        }
        Ok(self.stack[self.stack_top - 1 - distance])
    }

    fn reset_stack(&mut self) {
        self.stack_top = 0;
    }

    fn trace_instruction(&self, chunk: &Chunk, ip: usize) {
        let stack: String = self.stack().iter().map(|v| format!("[ {} ]", v)).collect();
        let (instruction, _) = disassembler::disassemble_instruction(chunk, ip);
        trace!(stack = %stack, "{}", instruction);
    }
}

fn read_byte(chunk: &Chunk, ip: &mut usize) -> Exec<u8> {
    let byte = *chunk.code().get(*ip).ok_or(Fault::UnexpectedEnd)?;
    *ip += 1;
    Ok(byte)
}
