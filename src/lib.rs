//! Keto: a single-pass compiler and stack virtual machine for a small
//! expression language of numbers, booleans and `nil`.
//!
//! Source text is scanned on demand, compiled by a Pratt parser straight into
//! a [`Chunk`] of bytecode, and executed by the [`Vm`].
//!
//! ```
//! use keto::{Value, Vm};
//!
//! let mut vm = Vm::new();
//! assert_eq!(vm.interpret("-2 + 3 * 4").unwrap(), Value::Number(10.0));
//! ```

pub mod chunk;
pub mod compiler;
pub mod config;
pub mod diagnostic;
pub mod disassembler;
pub mod lexer;
pub mod value;
pub mod vm;

pub use chunk::{Chunk, ChunkError, OpCode};
pub use compiler::{CompileError, CompileErrors, compile, compile_source, compile_with};
pub use config::Config;
pub use value::Value;
pub use vm::{Fault, InterpretError, InterpretResult, RuntimeError, Vm};
