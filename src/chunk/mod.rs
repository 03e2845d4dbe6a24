use crate::value::Value;

/// Size of the single-byte constant index space.
pub const MAX_CONSTANTS: usize = 256;

// ── Instruction set ─────────────────────────────────────────────────
//
// One opcode per byte. `Constant` is followed by a single operand byte
// holding a constant-pool index; every other opcode stands alone.

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Constant = 0,
    Nil = 1,
    True = 2,
    False = 3,
    Equal = 4,
    Greater = 5,
    Less = 6,
    Add = 7,
    Subtract = 8,
    Multiply = 9,
    Divide = 10,
    Not = 11,
    Negate = 12,
    Return = 13,
}

impl OpCode {
    /// Upper-cased name used in disassembly listings.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::Nil => "NIL",
            OpCode::True => "TRUE",
            OpCode::False => "FALSE",
            OpCode::Equal => "EQUAL",
            OpCode::Greater => "GREATER",
            OpCode::Less => "LESS",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUBTRACT",
            OpCode::Multiply => "MULTIPLY",
            OpCode::Divide => "DIVIDE",
            OpCode::Not => "NOT",
            OpCode::Negate => "NEGATE",
            OpCode::Return => "RETURN",
        }
    }

    /// Number of operand bytes that trail the opcode.
    pub fn operand_len(self) -> usize {
        match self {
            OpCode::Constant => 1,
            _ => 0,
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for OpCode {
    type Error = ChunkError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        let op = match byte {
            0 => OpCode::Constant,
            1 => OpCode::Nil,
            2 => OpCode::True,
            3 => OpCode::False,
            4 => OpCode::Equal,
            5 => OpCode::Greater,
            6 => OpCode::Less,
            7 => OpCode::Add,
            8 => OpCode::Subtract,
            9 => OpCode::Multiply,
            10 => OpCode::Divide,
            11 => OpCode::Not,
            12 => OpCode::Negate,
            13 => OpCode::Return,
            _ => return Err(ChunkError::UnknownOpcode(byte)),
        };
        Ok(op)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChunkError {
    #[error("Too many constants in one chunk.")]
    ConstantPoolFull,
    #[error("Unknown opcode {0}")]
    UnknownOpcode(u8),
}

// ── Chunk ────────────────────────────────────────────────────────────

/// Compiled bytecode for one compilation unit: the instruction bytes, the
/// source line of every byte, and the constant pool.
///
/// Append-only. `code` and `lines` always have the same length and the pool
/// never holds more than [`MAX_CONSTANTS`] values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    code: Vec<u8>,
    lines: Vec<usize>,
    constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Chunk::default()
    }

    pub fn write(&mut self, byte: u8, line: usize) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: usize) {
        self.write(op.into(), line);
    }

    /// Appends `value` to the constant pool and returns its index.
    pub fn add_constant(&mut self, value: Value) -> Result<u8, ChunkError> {
        let index = u8::try_from(self.constants.len()).map_err(|_| ChunkError::ConstantPoolFull)?;
        self.constants.push(value);
        Ok(index)
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn line(&self, offset: usize) -> Option<usize> {
        self.lines.get(offset).copied()
    }

    pub fn constant(&self, index: u8) -> Option<Value> {
        self.constants.get(index as usize).copied()
    }
}
