//! Operator semantics on runtime values.

use crate::dsl::error::CompileError;
use crate::dsl::note::Pitch;
use crate::dsl::operators::BinaryOp;
use crate::dsl::token::Token;
use crate::dsl::types::Type;

use super::value::{RuntimeValue, Value};

/// Longest list `*` may build.
pub const MAX_LIST_LEN: usize = 1_000_000;

/// Apply `op` to two evaluated operands. `ty` is the type the parser
/// inferred for the operation.
pub fn apply(
    op: BinaryOp,
    token: &Token,
    left: RuntimeValue,
    right: RuntimeValue,
    ty: &Type,
) -> Result<RuntimeValue, CompileError> {
    let value = match op {
        BinaryOp::Equal => Value::Boolean(left.return_value.equals(&right.return_value)),
        BinaryOp::NotEqual => Value::Boolean(!left.return_value.equals(&right.return_value)),
        BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEqual | BinaryOp::GreaterEqual => {
            let ordering = left
                .return_value
                .compare(&right.return_value)
                .ok_or_else(|| mismatch(op, token, &left, &right))?;
            Value::Boolean(match op {
                BinaryOp::Less => ordering.is_lt(),
                BinaryOp::Greater => ordering.is_gt(),
                BinaryOp::LessEqual => ordering.is_le(),
                _ => ordering.is_ge(),
            })
        }
        BinaryOp::Add => add(token, &left, &right)?,
        BinaryOp::Subtract => subtract(token, &left, &right)?,
        BinaryOp::Multiply => multiply(token, &left, &right)?,
        BinaryOp::Divide | BinaryOp::Modulo => match (&left.return_value, &right.return_value) {
            (Value::Number(a), Value::Number(b)) => Value::Number(divide(op, token, *a, *b)?),
            _ => return Err(mismatch(op, token, &left, &right)),
        },
    };

    let mut result = RuntimeValue::new(ty.clone(), value);
    if !matches!(ty, Type::Number | Type::Boolean) {
        result.properties = left.properties;
    }
    result.set_type(ty);
    Ok(result)
}

fn add(token: &Token, left: &RuntimeValue, right: &RuntimeValue) -> Result<Value, CompileError> {
    let overflow = || CompileError::runtime_at("arithmetic overflow in `+`", token);

    Ok(match (&left.return_value, &right.return_value) {
        (Value::Number(a), Value::Number(b)) => {
            Value::Number(a.checked_add(*b).ok_or_else(overflow)?)
        }
        (Value::List(a), Value::List(b)) => Value::List(a.iter().chain(b).cloned().collect()),
        (Value::Pitch(p), Value::Rhythm(r)) => Value::PitchRhythm {
            pitch: *p,
            rhythm: *r,
        },
        (Value::Degree(d), Value::Rhythm(r)) => Value::DegreeRhythm {
            degree: *d,
            rhythm: *r,
        },
        (_, Value::Number(n)) => transpose(token, &left.return_value, *n)
            .ok_or_else(|| mismatch(BinaryOp::Add, token, left, right))??,
        _ => return Err(mismatch(BinaryOp::Add, token, left, right)),
    })
}

fn subtract(
    token: &Token,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<Value, CompileError> {
    let overflow = || CompileError::runtime_at("arithmetic overflow in `-`", token);

    Ok(match (&left.return_value, &right.return_value) {
        (Value::Number(a), Value::Number(b)) => {
            Value::Number(a.checked_sub(*b).ok_or_else(overflow)?)
        }
        (Value::Pitch(a), Value::Pitch(b)) => {
            Value::Number(i64::from(a.pitch_number) - i64::from(b.pitch_number))
        }
        (_, Value::Number(n)) => {
            let n = n.checked_neg().ok_or_else(overflow)?;
            transpose(token, &left.return_value, n)
                .ok_or_else(|| mismatch(BinaryOp::Subtract, token, left, right))??
        }
        _ => return Err(mismatch(BinaryOp::Subtract, token, left, right)),
    })
}

fn multiply(
    token: &Token,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<Value, CompileError> {
    match (&left.return_value, &right.return_value) {
        (Value::Number(a), Value::Number(b)) => a
            .checked_mul(*b)
            .map(Value::Number)
            .ok_or_else(|| CompileError::runtime_at("arithmetic overflow in `*`", token)),
        (Value::List(items), Value::Number(n)) => repeat(token, items, *n).map(Value::List),
        _ => Err(mismatch(BinaryOp::Multiply, token, left, right)),
    }
}

/// `list * n`: the list repeated `n` times.
fn repeat(token: &Token, items: &[RuntimeValue], n: i64) -> Result<Vec<RuntimeValue>, CompileError> {
    let count = usize::try_from(n).map_err(|_| {
        CompileError::runtime_at(format!("cannot repeat a list {n} times"), token)
    })?;
    let len = items
        .len()
        .checked_mul(count)
        .filter(|len| *len <= MAX_LIST_LEN)
        .ok_or_else(|| {
            CompileError::runtime_at(
                format!(
                    "repeating a list of {} elements {count} times exceeds the limit of {MAX_LIST_LEN} elements",
                    items.len()
                ),
                token,
            )
        })?;
    Ok(items.iter().cycle().take(len).cloned().collect())
}

/// Truncating division or Euclidean remainder.
fn divide(op: BinaryOp, token: &Token, a: i64, b: i64) -> Result<i64, CompileError> {
    if b == 0 {
        let what = if op == BinaryOp::Divide {
            "division"
        } else {
            "modulo"
        };
        return Err(CompileError::runtime_at(format!("{what} by zero"), token));
    }
    let result = if op == BinaryOp::Divide {
        a.checked_div(b)
    } else {
        a.checked_rem_euclid(b)
    };
    result.ok_or_else(|| CompileError::runtime_at(format!("arithmetic overflow in `{op}`"), token))
}

/// Move a pitch or degree by `n`. `None` if `value` cannot be transposed.
fn transpose(token: &Token, value: &Value, n: i64) -> Option<Result<Value, CompileError>> {
    let out_of_range = |pitch: &Pitch| {
        CompileError::runtime_at(
            format!(
                "transposing {} by {n} semitones leaves the range of octaves 0 to 9",
                pitch.name()
            ),
            token,
        )
    };

    Some(match value {
        Value::Pitch(p) => p
            .transpose(n)
            .map(Value::Pitch)
            .ok_or_else(|| out_of_range(p)),
        Value::PitchRhythm { pitch, rhythm } => pitch
            .transpose(n)
            .map(|pitch| Value::PitchRhythm {
                pitch,
                rhythm: *rhythm,
            })
            .ok_or_else(|| out_of_range(pitch)),
        Value::Degree(d) => Ok(Value::Degree(d.transpose(n))),
        Value::DegreeRhythm { degree, rhythm } => Ok(Value::DegreeRhythm {
            degree: degree.transpose(n),
            rhythm: *rhythm,
        }),
        _ => return None,
    })
}

/// Operand combinations the parser should have rejected.
fn mismatch(op: BinaryOp, token: &Token, left: &RuntimeValue, right: &RuntimeValue) -> CompileError {
    CompileError::internal(format!(
        "operator `{op}` at {}:{} reached the evaluator with {} and {}",
        token.line, token.col, left.return_type, right.return_type
    ))
}
