//! Token types for the motif lexer.

use std::fmt;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            col,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Literal kinds that the expression parser lifts directly into values.
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::NumericLiteral
                | TokenKind::RhythmLiteral
                | TokenKind::PitchLiteral
                | TokenKind::PitchRhythmLiteral
                | TokenKind::ScaleDegreeLiteral
                | TokenKind::ScaleDegreeRhythmLiteral
                | TokenKind::BooleanLiteral
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` ({}) at {}:{}",
            self.text, self.kind, self.line, self.col
        )
    }
}

/// The kind of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    StatementTerminator, // ;
    TypeAscription,      // :
    Assignment,          // =
    Dot,

    Operator,

    // Literals
    NumericLiteral,
    PitchLiteral,
    RhythmLiteral,
    PitchRhythmLiteral,
    ScaleDegreeLiteral,
    ScaleDegreeRhythmLiteral,
    BooleanLiteral,

    // Keywords
    FunctionDeclaration, // fn
    LoopKeyword,         // for, in
    TypeKeyword,
    ReturnKeyword,
    If,
    Then,
    Else,

    Name,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::LeftParen => "left paren",
            TokenKind::RightParen => "right paren",
            TokenKind::LeftBracket => "left bracket",
            TokenKind::RightBracket => "right bracket",
            TokenKind::LeftBrace => "left brace",
            TokenKind::RightBrace => "right brace",
            TokenKind::Comma => "comma",
            TokenKind::StatementTerminator => "statement terminator",
            TokenKind::TypeAscription => "type ascription",
            TokenKind::Assignment => "assignment",
            TokenKind::Dot => "property access",
            TokenKind::Operator => "operator",
            TokenKind::NumericLiteral => "numeric literal",
            TokenKind::PitchLiteral => "pitch literal",
            TokenKind::RhythmLiteral => "rhythm literal",
            TokenKind::PitchRhythmLiteral => "pitch-rhythm literal",
            TokenKind::ScaleDegreeLiteral => "scale-degree literal",
            TokenKind::ScaleDegreeRhythmLiteral => "scale-degree-rhythm literal",
            TokenKind::BooleanLiteral => "boolean literal",
            TokenKind::FunctionDeclaration => "function declaration",
            TokenKind::LoopKeyword => "loop keyword",
            TokenKind::TypeKeyword => "type keyword",
            TokenKind::ReturnKeyword => "return keyword",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::Name => "name",
        };
        f.write_str(name)
    }
}
