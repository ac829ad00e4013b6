//! Names every program starts with.

use super::ast::Parameter;
use super::token::{Token, TokenKind};
use super::types::Type;

/// Built-in functions, implemented natively by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `rand(): number`, uniform in `0..=99`, seeded per run.
    Rand,
}

impl Builtin {
    pub const ALL: [Builtin; 1] = [Builtin::Rand];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Rand => "rand",
        }
    }

    pub fn parameters(self) -> Vec<Parameter> {
        match self {
            Builtin::Rand => Vec::new(),
        }
    }

    pub fn return_type(self) -> Type {
        match self {
            Builtin::Rand => Type::Number,
        }
    }
}

/// Built-in variables: `seed` holds the seed of the current run.
pub const BUILTIN_VARIABLES: [(&str, Type); 1] = [("seed", Type::Number)];

/// Synthetic declaration site for built-in names.
pub fn builtin_token(name: &str) -> Token {
    Token::new(TokenKind::Name, name, 0, 0)
}
