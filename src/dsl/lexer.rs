//! Lexer for the motif language.
//!
//! Tokenizing runs in two passes. The first splits source text into raw
//! symbols, dropping whitespace and `--` comments. The second classifies each
//! symbol, looking one symbol back so that two-word literals such as
//! `c#4 quarter` or `iv dotted half` become a single token.

use super::note::{is_pitch, is_rhythm, is_scale_degree};
use super::token::{Token, TokenKind};

const PUNCTUATION: &[char] = &[
    '(', ')', '{', '}', '[', ']', '<', '>', ':', ';', '+', '=', '/', ',', '%', '*', '.', '!',
];

const OPERATORS: &[&str] = &["+", "-", "*", "/", "%", "<", ">"];
const TYPE_KEYWORDS: &[&str] = &[
    "number",
    "degree",
    "rhythm",
    "pitch",
    "pitch_rhythm",
    "degree_rhythm",
    "boolean",
    "list",
];
const LOOP_KEYWORDS: &[&str] = &["for", "in"];

/// Words that may continue with `-` into a rhythm name.
const HYPHENATED_PREFIXES: &[&str] = &["thirty", "sixty", "dotted thirty", "dotted sixty"];

/// Tokenize source text. Never fails: unknown symbols become names.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

/// A raw symbol with the position of its first character.
#[derive(Debug, Clone, PartialEq)]
struct Symbol {
    text: String,
    line: usize,
    col: usize,
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    buffer: String,
    buffer_line: usize,
    buffer_col: usize,
    pending_dash: Option<(usize, usize)>,
    in_comment: bool,
    symbols: Vec<Symbol>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            buffer: String::new(),
            buffer_line: 1,
            buffer_col: 1,
            pending_dash: None,
            in_comment: false,
            symbols: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        self.split_symbols();
        let tokens = classify(&self.symbols);
        log::trace!(
            "tokenized {} symbols into {} tokens",
            self.symbols.len(),
            tokens.len()
        );
        tokens
    }

    fn split_symbols(&mut self) {
        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];
            self.split_char(ch);
            self.pos += 1;
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.emit_pending_dash();
        self.flush();
    }

    fn split_char(&mut self, ch: char) {
        if self.in_comment {
            if ch == '\n' {
                self.in_comment = false;
            }
            return;
        }

        if self.pending_dash.is_some() {
            if ch == '-' {
                self.pending_dash = None;
                self.in_comment = true;
                return;
            }
            self.emit_pending_dash();
        }

        if ch == '-' {
            let next_is_letter = self
                .chars
                .get(self.pos + 1)
                .is_some_and(|c| c.is_ascii_alphabetic());
            if next_is_letter && HYPHENATED_PREFIXES.contains(&self.buffer.as_str()) {
                self.buffer.push(ch);
                return;
            }
            self.flush();
            self.pending_dash = Some((self.line, self.col));
            return;
        }

        if ch.is_whitespace() {
            // `dotted` swallows the following space to pair with the next word.
            if ch == ' ' || ch == '\t' {
                if self.buffer == "dotted" {
                    self.buffer.push(' ');
                    return;
                }
                if self.buffer == "dotted " {
                    return;
                }
            }
            self.flush();
            return;
        }

        if PUNCTUATION.contains(&ch) {
            self.flush();
            self.symbols.push(Symbol {
                text: ch.to_string(),
                line: self.line,
                col: self.col,
            });
            return;
        }

        if self.buffer.is_empty() {
            self.buffer_line = self.line;
            self.buffer_col = self.col;
        }
        self.buffer.push(ch);
    }

    fn emit_pending_dash(&mut self) {
        if let Some((line, col)) = self.pending_dash.take() {
            self.symbols.push(Symbol {
                text: "-".to_string(),
                line,
                col,
            });
        }
    }

    fn flush(&mut self) {
        let text = self.buffer.trim_end();
        if !text.is_empty() {
            self.symbols.push(Symbol {
                text: text.to_string(),
                line: self.buffer_line,
                col: self.buffer_col,
            });
        }
        self.buffer.clear();
    }
}

fn classify(symbols: &[Symbol]) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::with_capacity(symbols.len());
    // Text of the previous symbol, after any fusion.
    let mut prev: Option<String> = None;

    for symbol in symbols {
        let text = symbol.text.as_str();

        if let Some(fused) = fuse_comparison(prev.as_deref(), text) {
            if let Some(previous) = tokens.pop() {
                tokens.push(Token::new(
                    TokenKind::Operator,
                    fused,
                    previous.line,
                    previous.col,
                ));
                prev = Some(fused.to_string());
                continue;
            }
        }

        if is_rhythm(text) {
            let fused_kind = match prev.as_deref() {
                Some(p) if is_scale_degree(p) => Some(TokenKind::ScaleDegreeRhythmLiteral),
                Some(p) if is_pitch(p) => Some(TokenKind::PitchRhythmLiteral),
                _ => None,
            };
            if let Some(kind) = fused_kind {
                if let Some(previous) = tokens.pop() {
                    let fused = format!("{} {}", previous.text, text);
                    prev = Some(fused.clone());
                    tokens.push(Token::new(kind, fused, previous.line, previous.col));
                    continue;
                }
            }
        }

        let kind = classify_symbol(text);
        tokens.push(Token::new(kind, text, symbol.line, symbol.col));
        prev = Some(text.to_string());
    }

    tokens
}

/// `= =`, `! =`, `< =` and `> =` collapse into one operator.
fn fuse_comparison(prev: Option<&str>, current: &str) -> Option<&'static str> {
    if current != "=" {
        return None;
    }
    match prev? {
        "=" => Some("=="),
        "!" => Some("!="),
        "<" => Some("<="),
        ">" => Some(">="),
        _ => None,
    }
}

fn classify_symbol(text: &str) -> TokenKind {
    if text.chars().all(|c| c.is_ascii_digit()) {
        return TokenKind::NumericLiteral;
    }
    if OPERATORS.contains(&text) {
        return TokenKind::Operator;
    }

    match text {
        "(" => return TokenKind::LeftParen,
        ")" => return TokenKind::RightParen,
        "[" => return TokenKind::LeftBracket,
        "]" => return TokenKind::RightBracket,
        "{" => return TokenKind::LeftBrace,
        "}" => return TokenKind::RightBrace,
        "," => return TokenKind::Comma,
        ";" => return TokenKind::StatementTerminator,
        ":" => return TokenKind::TypeAscription,
        "=" => return TokenKind::Assignment,
        "." => return TokenKind::Dot,
        "fn" => return TokenKind::FunctionDeclaration,
        "return" => return TokenKind::ReturnKeyword,
        "if" => return TokenKind::If,
        "then" => return TokenKind::Then,
        "else" => return TokenKind::Else,
        "true" | "false" => return TokenKind::BooleanLiteral,
        _ => {}
    }

    if LOOP_KEYWORDS.contains(&text) {
        TokenKind::LoopKeyword
    } else if TYPE_KEYWORDS.contains(&text) {
        TokenKind::TypeKeyword
    } else if is_scale_degree(text) {
        TokenKind::ScaleDegreeLiteral
    } else if is_pitch(text) {
        TokenKind::PitchLiteral
    } else if is_rhythm(text) {
        TokenKind::RhythmLiteral
    } else {
        if text.starts_with("dotted ") {
            log::warn!("`{text}` is not a rhythm this compiler implements; treating it as a name");
        }
        TokenKind::Name
    }
}
