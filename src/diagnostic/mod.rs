pub mod ansi;
pub mod json;

use crate::compiler::{CompileError, Location};
use crate::vm::{InterpretError, RuntimeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
        }
    }
}

/// Which half of the pipeline raised the diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Compile,
    Runtime,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Compile => "compile",
            Phase::Runtime => "runtime",
        }
    }
}

/// Renderer-neutral view of a compile or runtime error.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub phase: Phase,
    pub message: String,
    pub line: Option<usize>,
    /// `at end`, `at '+'` and the like. None for lexical and runtime errors.
    pub location: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(phase: Phase, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            phase,
            message: message.into(),
            line: None,
            location: None,
            source: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// One diagnostic per reported error, in report order.
    pub fn from_interpret_error(e: &InterpretError) -> Vec<Diagnostic> {
        match e {
            InterpretError::Compile(errors) => errors.iter().map(Diagnostic::from).collect(),
            InterpretError::Runtime(error) => vec![Diagnostic::from(error)],
        }
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(e: &CompileError) -> Self {
        let d = Diagnostic::error(Phase::Compile, &e.message).with_line(e.line);
        match &e.location {
            Location::Lexical => d,
            location => d.with_location(location.to_string().trim_start()),
        }
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(e: &RuntimeError) -> Self {
        Diagnostic::error(Phase::Runtime, e.fault.to_string()).with_line(e.line)
    }
}

/// Text of the 1-based `line` in `source`, without its line terminator.
pub(crate) fn line_text(source: &str, line: usize) -> Option<&str> {
    let text = source.split('\n').nth(line.checked_sub(1)?)?;
    Some(text.trim_end_matches('\r'))
}
