use tracing::debug;

use crate::chunk::{Chunk, OpCode};
use crate::config::Config;
use crate::disassembler;
use crate::lexer::{Scanner, Token, TokenKind};
use crate::value::Value;

mod rules;

/// Deepest chain of nested sub-expressions the compiler will descend into.
pub const MAX_NESTING: usize = 1024;

pub use rules::{ParseFn, ParseRule, Precedence, rule};

// ── Errors ───────────────────────────────────────────────────────────

/// Where in the source a compile error was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    AtEnd,
    At(String),
    /// Reported by the scanner; the message already says what went wrong.
    Lexical,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::AtEnd => write!(f, " at end"),
            Location::At(lexeme) => write!(f, " at '{}'", lexeme),
            Location::Lexical => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[line {line:>4}] Error{location}: {message}")]
pub struct CompileError {
    pub line: usize,
    pub location: Location,
    pub message: String,
}

/// The errors reported by one compilation, in source order. Errors swallowed
/// by panic mode are not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileErrors(pub Vec<CompileError>);

impl CompileErrors {
    pub fn iter(&self) -> std::slice::Iter<'_, CompileError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

// ── Entry points ─────────────────────────────────────────────────────

/// Compiles `source` into `chunk`. Succeeds iff no error was reported; the
/// chunk always ends in a `Return` either way.
pub fn compile(source: &str, chunk: &mut Chunk) -> Result<(), CompileErrors> {
    Compiler::new(source, chunk).compile()
}

pub fn compile_with(source: &str, chunk: &mut Chunk, config: &Config) -> Result<(), CompileErrors> {
    Compiler::with_config(source, chunk, config).compile()
}

/// Compiles into a fresh chunk and hands back both the chunk and the outcome.
pub fn compile_source(source: &str) -> (Chunk, Result<(), CompileErrors>) {
    let mut chunk = Chunk::new();
    let result = compile(source, &mut chunk);
    (chunk, result)
}

// ── Compiler ─────────────────────────────────────────────────────────

struct Parser<'src> {
    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,
}

/// Single-pass Pratt compiler: tokens are pulled from the scanner on demand
/// and bytecode is written into the chunk as each parselet finishes. There is
/// no syntax tree.
///
/// Single use; `compile` consumes it.
pub struct Compiler<'src, 'c> {
    scanner: Scanner<'src>,
    parser: Parser<'src>,
    chunk: &'c mut Chunk,
    errors: Vec<CompileError>,
    depth: usize,
    print_code: bool,
}

impl<'src, 'c> Compiler<'src, 'c> {
    pub fn new(source: &'src str, chunk: &'c mut Chunk) -> Self {
        Self::with_config(source, chunk, &Config::default())
    }

    pub fn with_config(source: &'src str, chunk: &'c mut Chunk, config: &Config) -> Self {
        let start = Token::new(TokenKind::Eof, "", 1);
        Compiler {
            scanner: Scanner::new(source),
            parser: Parser {
                previous: start,
                current: start,
                had_error: false,
                panic_mode: false,
            },
            chunk,
            errors: Vec::new(),
            depth: 0,
            print_code: config.print_code,
        }
    }

    pub fn compile(mut self) -> Result<(), CompileErrors> {
        self.advance();
        self.expression();
        self.consume(TokenKind::Eof, "Expect end of expression.");
        self.end_compiler();

        debug!(
            bytes = self.chunk.len(),
            constants = self.chunk.constants().len(),
            errors = self.errors.len(),
            "compiled chunk"
        );

        if self.parser.had_error {
            Err(CompileErrors(self.errors))
        } else {
            Ok(())
        }
    }

    // ---- Token cursor ----

    fn advance(&mut self) {
        self.parser.previous = self.parser.current;
        loop {
            self.parser.current = self.scanner.scan_token();
            if self.parser.current.kind != TokenKind::Error {
                break;
            }
            let message = self.parser.current.lexeme;
            self.error_at_current(message);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.parser.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    // ---- Emission ----

    fn emit_byte(&mut self, byte: u8) {
        self.chunk.write(byte, self.parser.previous.line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op.into());
    }

    fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op(OpCode::Constant);
        self.emit_byte(index);
    }

    // A full pool is reported but compilation carries on with index 0 so
    // later errors in the same source still surface.
    fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk.add_constant(value) {
            Ok(index) => index,
            Err(e) => {
                self.error(&e.to_string());
                0
            }
        }
    }

    fn end_compiler(&mut self) {
        self.emit_op(OpCode::Return);
        if self.print_code && !self.parser.had_error {
            debug!("\n{}", disassembler::disassemble_chunk(self.chunk, "code"));
        }
    }

    // ---- Error reporting ----

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.parser.panic_mode {
            return;
        }
        self.parser.panic_mode = true;

        let location = match token.kind {
            TokenKind::Eof => Location::AtEnd,
            TokenKind::Error => Location::Lexical,
            _ => Location::At(token.lexeme.to_string()),
        };
        let error = CompileError {
            line: token.line,
            location,
            message: message.to_string(),
        };
        debug!(%error, "compile error");
        self.errors.push(error);
        self.parser.had_error = true;
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.parser.current, message);
    }

    fn error(&mut self, message: &str) {
        self.error_at(self.parser.previous, message);
    }

    // ---- Expressions ----

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        // Parselets recurse through here, so this bounds the native stack.
        if self.depth == MAX_NESTING {
            self.error_at_current("Expression nested too deeply.");
            return;
        }
        self.depth += 1;

        self.advance();
        match rule(self.parser.previous.kind).prefix {
            Some(prefix) => {
                self.apply(prefix);
                while precedence <= rule(self.parser.current.kind).precedence {
                    self.advance();
                    if let Some(infix) = rule(self.parser.previous.kind).infix {
                        self.apply(infix);
                    }
                }
            }
            None => self.error("Expect expression."),
        }

        self.depth -= 1;
    }

    fn apply(&mut self, parselet: ParseFn) {
        match parselet {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Number => self.number(),
            ParseFn::Literal => self.literal(),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn number(&mut self) {
        match self.parser.previous.lexeme.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Number(n)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn literal(&mut self) {
        match self.parser.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            _ => {}
        }
    }

    fn unary(&mut self) {
        let operator = self.parser.previous.kind;

        // Operand first, then the operator that consumes it.
        self.parse_precedence(Precedence::Unary);

        match operator {
            TokenKind::Bang => self.emit_op(OpCode::Not),
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            _ => {}
        }
    }

    fn binary(&mut self) {
        let operator = self.parser.previous.kind;
        self.parse_precedence(rule(operator).precedence.next());

        // No dedicated opcodes for the negated comparisons.
        match operator {
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::MAX_CONSTANTS;

    const C: u8 = OpCode::Constant as u8;
    const RET: u8 = OpCode::Return as u8;

    fn compiled(source: &str) -> Chunk {
        let (chunk, result) = compile_source(source);
        assert!(result.is_ok(), "unexpected errors: {:?}", result);
        chunk
    }

    fn errors(source: &str) -> Vec<CompileError> {
        let (_, result) = compile_source(source);
        result.expect_err("expected compile errors").0
    }

    #[test]
    fn compile_single_number() {
        let chunk = compiled("1.5");
        assert_eq!(chunk.code(), &[C, 0, RET]);
        assert_eq!(chunk.constants(), &[Value::Number(1.5)]);
    }

    #[test]
    fn compile_literals_without_constants() {
        assert_eq!(compiled("true").code(), &[OpCode::True as u8, RET]);
        assert_eq!(compiled("false").code(), &[OpCode::False as u8, RET]);
        assert_eq!(compiled("nil").code(), &[OpCode::Nil as u8, RET]);
        assert!(compiled("nil").constants().is_empty());
    }

    #[test]
    fn compile_precedence() {
        let chunk = compiled("-2 + 3 * 4");
        assert_eq!(
            chunk.code(),
            &[
                C, 0, OpCode::Negate as u8,
                C, 1, C, 2, OpCode::Multiply as u8,
                OpCode::Add as u8, RET
            ]
        );
    }

    #[test]
    fn compile_left_associative() {
        let chunk = compiled("1 - 2 - 3");
        let sub = OpCode::Subtract as u8;
        assert_eq!(chunk.code(), &[C, 0, C, 1, sub, C, 2, sub, RET]);
    }

    #[test]
    fn compile_grouping() {
        let chunk = compiled("(1 + 2) / 3");
        assert_eq!(
            chunk.code(),
            &[C, 0, C, 1, OpCode::Add as u8, C, 2, OpCode::Divide as u8, RET]
        );
    }

    #[test]
    fn compile_negated_comparisons() {
        let not = OpCode::Not as u8;
        assert_eq!(compiled("3 <= 3").code(), &[C, 0, C, 1, OpCode::Greater as u8, not, RET]);
        assert_eq!(compiled("3 >= 3").code(), &[C, 0, C, 1, OpCode::Less as u8, not, RET]);
        assert_eq!(compiled("3 != 3").code(), &[C, 0, C, 1, OpCode::Equal as u8, not, RET]);
        assert_eq!(compiled("3 == 3").code(), &[C, 0, C, 1, OpCode::Equal as u8, RET]);
    }

    #[test]
    fn compile_unary_not() {
        let chunk = compiled("!!true");
        let not = OpCode::Not as u8;
        assert_eq!(chunk.code(), &[OpCode::True as u8, not, not, RET]);
    }

    #[test]
    fn lines_follow_tokens() {
        let chunk = compiled("1 +\n2");
        assert_eq!(chunk.lines(), &[1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn missing_operand_reports_at_end() {
        let errs = errors("1 +");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].location, Location::AtEnd);
        assert_eq!(errs[0].message, "Expect expression.");
        assert_eq!(errs[0].to_string(), "[line    1] Error at end: Expect expression.");
    }

    #[test]
    fn unclosed_grouping() {
        let errs = errors("(1 + 2");
        assert_eq!(errs[0].message, "Expect ')' after expression.");
        assert_eq!(errs[0].location, Location::AtEnd);
    }

    #[test]
    fn trailing_tokens() {
        let errs = errors("1 2");
        assert_eq!(errs[0].message, "Expect end of expression.");
        assert_eq!(errs[0].location, Location::At("2".to_string()));
    }

    #[test]
    fn strings_and_identifiers_are_not_expressions() {
        assert_eq!(errors("\"hi\"")[0].to_string(), "[line    1] Error at '\"hi\"': Expect expression.");
        assert_eq!(errors("x")[0].location, Location::At("x".to_string()));
    }

    #[test]
    fn lexical_errors_have_no_location() {
        let errs = errors("1 + @");
        assert_eq!(errs[0].location, Location::Lexical);
        assert_eq!(errs[0].to_string(), "[line    1] Error: Unexpected character.");
    }

    #[test]
    fn panic_mode_suppresses_cascades() {
        let errs = errors("@ @ )");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "Unexpected character.");
    }

    #[test]
    fn return_is_emitted_on_error() {
        let (chunk, result) = compile_source("1 +");
        assert!(result.is_err());
        assert_eq!(chunk.code().last(), Some(&RET));
    }

    #[test]
    fn constant_overflow_substitutes_zero_and_continues() {
        let source = (0..=MAX_CONSTANTS).map(|i| i.to_string()).collect::<Vec<_>>().join(" + ");
        let (chunk, result) = compile_source(&source);
        let errs = result.expect_err("pool should overflow").0;
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "Too many constants in one chunk.");
        assert_eq!(errs[0].location, Location::At("256".to_string()));
        assert_eq!(chunk.constants().len(), MAX_CONSTANTS);
        // CONSTANT 0, ADD, RETURN
        let tail = &chunk.code()[chunk.len() - 4..];
        assert_eq!(tail, &[C, 0, OpCode::Add as u8, RET]);
    }

    #[test]
    fn nesting_up_to_the_limit_compiles() {
        let depth = MAX_NESTING - 1;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(compiled(&source).code(), &[C, 0, RET]);
    }

    #[test]
    fn deep_grouping_is_a_compile_error() {
        let source = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
        let errs = errors(&source);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "Expression nested too deeply.");
        assert_eq!(errs[0].location, Location::At("(".to_string()));
    }

    #[test]
    fn deep_unary_chain_is_a_compile_error() {
        let source = format!("{}1", "-".repeat(50_000));
        let (chunk, result) = compile_source(&source);
        let errs = result.expect_err("nesting should be rejected").0;
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "Expression nested too deeply.");
        assert_eq!(chunk.code().last(), Some(&RET));
    }

    #[test]
    fn errors_display_one_per_line() {
        let errs = CompileErrors(vec![
            CompileError { line: 1, location: Location::AtEnd, message: "a".into() },
            CompileError { line: 12, location: Location::Lexical, message: "b".into() },
        ]);
        assert_eq!(errs.to_string(), "[line    1] Error at end: a\n[line   12] Error: b");
    }
}
