//! The motif language: source → tokens → typed syntax tree.

pub mod ast;
pub mod builtins;
pub mod error;
pub mod expression;
pub mod lexer;
pub mod namespace;
pub mod note;
pub mod operators;
pub mod parser;
pub mod property;
pub mod token;
pub mod types;

pub use ast::*;
pub use error::{CompileError, ErrorKind};
pub use token::{Token, TokenKind};
pub use types::Type;

use crate::config::Config;
use crate::render::{renderer_for, Renderer};
use crate::runtime::{evaluate, RuntimeValue};

/// The motif compiler.
///
/// Source text goes through the lexer, the parsers and the evaluator, and
/// the value `main` returns is handed to a renderer.
pub struct Compiler;

impl Compiler {
    pub fn tokenize(source: &str) -> Vec<Token> {
        lexer::tokenize(source)
    }

    /// Parse and type-check source into top-level steps.
    pub fn parse(source: &str) -> Result<Steps, CompileError> {
        let tokens = lexer::tokenize(source);
        parser::make_syntax_tree(&tokens)
    }

    /// Parse and run source, returning the value of `main`.
    pub fn evaluate(source: &str, seed: u64) -> Result<RuntimeValue, CompileError> {
        let steps = Self::parse(source)?;
        evaluate(&steps, seed)
    }

    /// Run source and render the result in the configured format.
    pub fn compile(source: &str, config: &Config) -> Result<String, CompileError> {
        let value = Self::evaluate(source, config.seed)?;
        renderer_for(config.format, config.title.clone()).render(&value)
    }
}
