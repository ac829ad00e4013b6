//! Binary operators: precedence and typing rules.

use std::fmt;

use super::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Subtract),
            "*" => Some(BinaryOp::Multiply),
            "/" => Some(BinaryOp::Divide),
            "%" => Some(BinaryOp::Modulo),
            "==" => Some(BinaryOp::Equal),
            "!=" => Some(BinaryOp::NotEqual),
            "<" => Some(BinaryOp::Less),
            ">" => Some(BinaryOp::Greater),
            "<=" => Some(BinaryOp::LessEqual),
            ">=" => Some(BinaryOp::GreaterEqual),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
        }
    }

    /// Binding strength. Comparisons share the bottom level with `(`.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Subtract => 1,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 2,
            _ => 0,
        }
    }

    /// Type of `left <op> right`, or `None` if the operator does not apply.
    pub fn result_type(self, left: &Type, right: &Type) -> Option<Type> {
        use Type::*;

        match self {
            BinaryOp::Add => match (left, right) {
                (Number, Number) => Some(Number),
                (Pitch | PitchRhythm | Degree | DegreeRhythm, Number) => Some(left.clone()),
                (Pitch, Rhythm) => Some(PitchRhythm),
                (Degree, Rhythm) => Some(DegreeRhythm),
                (l, r) if l.is_list() && r.is_list() => l.unify(r),
                _ => None,
            },
            BinaryOp::Subtract => match (left, right) {
                (Number, Number) => Some(Number),
                (Pitch, Pitch) => Some(Number),
                (Pitch | PitchRhythm | Degree | DegreeRhythm, Number) => Some(left.clone()),
                _ => None,
            },
            BinaryOp::Multiply => match (left, right) {
                (Number, Number) => Some(Number),
                (l, Number) if l.is_list() => Some(l.clone()),
                _ => None,
            },
            BinaryOp::Divide | BinaryOp::Modulo => match (left, right) {
                (Number, Number) => Some(Number),
                _ => None,
            },
            BinaryOp::Equal | BinaryOp::NotEqual => left.unify(right).map(|_| Boolean),
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEqual | BinaryOp::GreaterEqual => {
                match (left, right) {
                    (Number, Number) | (Pitch, Pitch) | (Degree, Degree) => Some(Boolean),
                    _ => None,
                }
            }
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
