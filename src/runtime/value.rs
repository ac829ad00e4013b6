//! Runtime values.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::dsl::error::CompileError;
use crate::dsl::note::{Pitch, Rhythm, ScaleDegree};
use crate::dsl::token::Token;
use crate::dsl::types::Type;

/// A value with its type and render properties.
///
/// List elements are full `RuntimeValue`s so each keeps its own properties
/// and can be replaced through an index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeValue {
    pub return_type: Type,
    pub return_value: Value,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(i64),
    Boolean(bool),
    Pitch(Pitch),
    Rhythm(Rhythm),
    PitchRhythm { pitch: Pitch, rhythm: Rhythm },
    Degree(ScaleDegree),
    DegreeRhythm { degree: ScaleDegree, rhythm: Rhythm },
    List(Vec<RuntimeValue>),
}

impl RuntimeValue {
    pub fn new(return_type: Type, return_value: Value) -> Self {
        Self {
            return_type,
            return_value,
            properties: BTreeMap::new(),
        }
    }

    pub fn number(n: i64) -> Self {
        Self::new(Type::Number, Value::Number(n))
    }

    /// Stamp `ty` onto this value and, for lists, onto every element.
    pub fn set_type(&mut self, ty: &Type) {
        self.return_type = ty.clone();
        if let (Type::List(inner), Value::List(items)) = (ty, &mut self.return_value) {
            for item in items {
                item.set_type(inner);
            }
        }
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn index(&self, index: i64, at: &Token) -> Result<&RuntimeValue, CompileError> {
        let items = self.items(at)?;
        let i = checked_index(index, items.len(), at)?;
        Ok(&items[i])
    }

    pub fn index_mut(&mut self, index: i64, at: &Token) -> Result<&mut RuntimeValue, CompileError> {
        let ty = self.return_type.clone();
        match &mut self.return_value {
            Value::List(items) => {
                let i = checked_index(index, items.len(), at)?;
                Ok(&mut items[i])
            }
            _ => Err(CompileError::internal(format!(
                "indexed a value of type {ty} at {}:{}",
                at.line, at.col
            ))),
        }
    }

    fn items(&self, at: &Token) -> Result<&[RuntimeValue], CompileError> {
        match &self.return_value {
            Value::List(items) => Ok(items),
            _ => Err(CompileError::internal(format!(
                "indexed a value of type {} at {}:{}",
                self.return_type, at.line, at.col
            ))),
        }
    }
}

fn checked_index(index: i64, len: usize, at: &Token) -> Result<usize, CompileError> {
    let i = usize::try_from(index).map_err(|_| {
        CompileError::runtime_at(format!("list indexes cannot be negative, got {index}"), at)
    })?;
    if i >= len {
        return Err(CompileError::runtime_at(
            format!("index {index} is out of bounds for a list of length {len}"),
            at,
        ));
    }
    Ok(i)
}

impl Value {
    /// Equality as the `==` operator sees it: pitches compare by pitch
    /// number, so `c#4 == db4`.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Pitch(a), Value::Pitch(b)) => a.pitch_number == b.pitch_number,
            (
                Value::PitchRhythm {
                    pitch: a,
                    rhythm: ra,
                },
                Value::PitchRhythm {
                    pitch: b,
                    rhythm: rb,
                },
            ) => a.pitch_number == b.pitch_number && ra == rb,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|(x, y)| x.return_value.equals(&y.return_value))
            }
            _ => self == other,
        }
    }

    /// Ordering for `< > <= >=`. `None` for values without an order.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Some(a.cmp(b)),
            (Value::Pitch(a), Value::Pitch(b)) => Some(a.pitch_number.cmp(&b.pitch_number)),
            (Value::Degree(a), Value::Degree(b)) => {
                let shift = |d: &ScaleDegree| d.accidental.map_or(0, |acc| acc.shift());
                Some((a.degree, shift(a)).cmp(&(b.degree, shift(b))))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Pitch(p) => f.write_str(&p.name()),
            Value::Rhythm(r) => f.write_str(&r.name()),
            Value::PitchRhythm { pitch, rhythm } => write!(f, "{} {}", pitch.name(), rhythm.name()),
            Value::Degree(d) => f.write_str(&d.name()),
            Value::DegreeRhythm { degree, rhythm } => {
                write!(f, "{} {}", degree.name(), rhythm.name())
            }
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item.return_value)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.return_value, self.return_type)
    }
}
