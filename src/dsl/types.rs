//! Static types of motif values.
//!
//! Display names are part of the language surface: error messages and
//! renderers rely on `"list "` being repeated once per nesting level.

use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Number,
    Degree,
    Rhythm,
    Pitch,
    PitchRhythm,
    DegreeRhythm,
    Boolean,
    List(Box<Type>),
    /// The type of `[]`: a list whose element type is not known yet.
    EmptyList,
}

impl Type {
    pub fn list_of(inner: Type) -> Self {
        Type::List(Box::new(inner))
    }

    /// Type for a single type keyword other than `list`.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "number" => Some(Type::Number),
            "degree" => Some(Type::Degree),
            "rhythm" => Some(Type::Rhythm),
            "pitch" => Some(Type::Pitch),
            "pitch_rhythm" => Some(Type::PitchRhythm),
            "degree_rhythm" => Some(Type::DegreeRhythm),
            "boolean" => Some(Type::Boolean),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Type::List(_) | Type::EmptyList)
    }

    /// Element type of a list, `None` for scalars and `[]`.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::List(inner) => Some(inner),
            _ => None,
        }
    }

    /// Strip `depth` list levels, as indexing `depth` times does.
    pub fn index(&self, depth: usize) -> Option<&Type> {
        let mut current = self;
        for _ in 0..depth {
            current = current.element()?;
        }
        Some(current)
    }

    /// Whether a value of type `other` may be stored where `self` is declared.
    pub fn accepts(&self, other: &Type) -> bool {
        match (self, other) {
            _ if self == other => true,
            (Type::List(_), Type::EmptyList) => true,
            (Type::List(mine), Type::List(theirs)) => mine.accepts(theirs),
            _ => false,
        }
    }

    /// The more specific of two compatible types.
    pub fn unify(&self, other: &Type) -> Option<Type> {
        if self.accepts(other) {
            Some(self.clone())
        } else if other.accepts(self) {
            Some(other.clone())
        } else {
            None
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Number => f.write_str("number"),
            Type::Degree => f.write_str("degree"),
            Type::Rhythm => f.write_str("rhythm"),
            Type::Pitch => f.write_str("pitch"),
            Type::PitchRhythm => f.write_str("pitch_rhythm"),
            Type::DegreeRhythm => f.write_str("degree_rhythm"),
            Type::Boolean => f.write_str("boolean"),
            Type::List(inner) => write!(f, "list {inner}"),
            Type::EmptyList => f.write_str("list"),
        }
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
