//! Error types for the motif compiler.

use std::fmt;

use super::token::Token;

/// An error raised while parsing or evaluating a program.
///
/// Line and column point at the offending token. Compiler-internal invariant
/// violations use `0:0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub reason: String,
    pub line: usize,
    pub col: usize,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ParseError,
    RuntimeError,
    /// The value could not be expressed in the requested output format.
    RenderError,
}

impl CompileError {
    pub fn parse(reason: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            reason: reason.into(),
            line,
            col,
            kind: ErrorKind::ParseError,
        }
    }

    pub fn runtime(reason: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            reason: reason.into(),
            line,
            col,
            kind: ErrorKind::RuntimeError,
        }
    }

    /// Renderers work on values, not tokens, so these carry no position.
    pub fn render(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            line: 0,
            col: 0,
            kind: ErrorKind::RenderError,
        }
    }

    /// Parse error positioned at `token`.
    pub fn parse_at(reason: impl Into<String>, token: &Token) -> Self {
        Self::parse(reason, token.line, token.col)
    }

    /// Runtime error positioned at `token`.
    pub fn runtime_at(reason: impl Into<String>, token: &Token) -> Self {
        Self::runtime(reason, token.line, token.col)
    }

    /// A broken compiler invariant. These are bugs, not user mistakes.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::parse(
            format!(
                "compiler bug: {}. Please file an issue with the program that triggered it",
                reason.into()
            ),
            0,
            0,
        )
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}] {:?}: {}",
            self.line, self.col, self.kind, self.reason
        )
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position_and_kind() {
        let err = CompileError::parse("`x` has not been declared", 3, 7);
        assert_eq!(
            err.to_string(),
            "[3:7] ParseError: `x` has not been declared"
        );
    }

    #[test]
    fn internal_errors_point_nowhere() {
        let err = CompileError::internal("empty token stream");
        assert_eq!((err.line, err.col), (0, 0));
        assert!(err.reason.contains("file an issue"));
        assert_eq!(err.kind, ErrorKind::ParseError);
    }

    #[test]
    fn render_errors_have_no_position() {
        let err = CompileError::render("cannot render a number");
        assert_eq!(err.kind, ErrorKind::RenderError);
        assert_eq!(err.to_string(), "[0:0] RenderError: cannot render a number");
    }

    #[test]
    fn runtime_kind() {
        let err = CompileError::runtime("division by zero", 1, 1);
        assert_eq!(err.kind, ErrorKind::RuntimeError);
    }
}
