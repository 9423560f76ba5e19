//! Explicit conversions between value tags.
//!
//! Integer narrowing saturates at the target width, float to integer truncates
//! toward zero (NaN becomes 0), and pairings with no sensible meaning (an array
//! as a boolean, a map as a number) are rejected instead of guessed.

use crate::{Value, ValueError, ValueTag};

#[derive(Clone, Copy)]
enum Number {
    Int(i128),
    Float(f64),
}

impl Value {
    /// Converts `self` into a new value tagged `target`.
    pub fn cast(&self, target: ValueTag) -> Result<Value, ValueError> {
        let from = self.tag();
        if from == target {
            return Ok(self.clone());
        }

        let mismatch = || ValueError::TypeMismatch { from, to: target };

        match target {
            tag if tag.is_numeric() => {
                let number = match self {
                    Value::Str(text) => parse_number(text, tag)?,
                    other => other.as_number().ok_or_else(mismatch)?,
                };
                Ok(number_to(tag, number))
            }
            ValueTag::Bool => match self {
                Value::Str(text) => parse_bool(text),
                other => other
                    .as_number()
                    .map(|number| match number {
                        Number::Int(n) => Value::Bool(n != 0),
                        Number::Float(f) => Value::Bool(f != 0.0 && !f.is_nan()),
                    })
                    .ok_or_else(mismatch),
            },
            ValueTag::Str => match self {
                Value::Buffer(bytes) => String::from_utf8(bytes.clone())
                    .map(Value::Str)
                    .map_err(|err| ValueError::Utf8(err.to_string())),
                Value::Bool(b) => Ok(Value::Str(b.to_string())),
                other if other.tag().is_numeric() => Ok(Value::Str(other.to_string())),
                _ => Err(mismatch()),
            },
            ValueTag::Buffer => match self {
                Value::Str(text) => Ok(Value::Buffer(text.as_bytes().to_vec())),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        }
    }

    fn as_number(&self) -> Option<Number> {
        let number = match self {
            Value::Bool(b) => Number::Int(i128::from(*b)),
            Value::I8(n) => Number::Int(i128::from(*n)),
            Value::I16(n) => Number::Int(i128::from(*n)),
            Value::I32(n) => Number::Int(i128::from(*n)),
            Value::I64(n) => Number::Int(i128::from(*n)),
            Value::U8(n) => Number::Int(i128::from(*n)),
            Value::U16(n) => Number::Int(i128::from(*n)),
            Value::U32(n) => Number::Int(i128::from(*n)),
            Value::U64(n) => Number::Int(i128::from(*n)),
            Value::F32(n) => Number::Float(f64::from(*n)),
            Value::F64(n) => Number::Float(*n),
            _ => return None,
        };
        Some(number)
    }
}

fn parse_number(text: &str, target: ValueTag) -> Result<Number, ValueError> {
    let trimmed = text.trim();
    if target.is_integer()
        && let Ok(n) = trimmed.parse::<i128>()
    {
        return Ok(Number::Int(n));
    }
    trimmed
        .parse::<f64>()
        .map(Number::Float)
        .map_err(|_| ValueError::Parse {
            input: text.to_string(),
            to: target,
        })
}

fn parse_bool(text: &str) -> Result<Value, ValueError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(Value::Bool(true)),
        "false" | "0" => Ok(Value::Bool(false)),
        _ => Err(ValueError::Parse {
            input: text.to_string(),
            to: ValueTag::Bool,
        }),
    }
}

macro_rules! saturate {
    ($n:expr, $ty:ty) => {
        $n.clamp(i128::from(<$ty>::MIN), i128::from(<$ty>::MAX)) as $ty
    };
}

fn number_to(target: ValueTag, number: Number) -> Value {
    let int = match number {
        Number::Int(n) => n,
        // `as` on floats truncates toward zero, saturates, and maps NaN to 0.
        Number::Float(f) => f as i128,
    };
    let float = match number {
        Number::Int(n) => n as f64,
        Number::Float(f) => f,
    };

    match target {
        ValueTag::I8 => Value::I8(saturate!(int, i8)),
        ValueTag::I16 => Value::I16(saturate!(int, i16)),
        ValueTag::I32 => Value::I32(saturate!(int, i32)),
        ValueTag::I64 => Value::I64(saturate!(int, i64)),
        ValueTag::U8 => Value::U8(saturate!(int, u8)),
        ValueTag::U16 => Value::U16(saturate!(int, u16)),
        ValueTag::U32 => Value::U32(saturate!(int, u32)),
        ValueTag::U64 => Value::U64(saturate!(int, u64)),
        ValueTag::F32 => Value::F32(float as f32),
        ValueTag::F64 => Value::F64(float),
        _ => unreachable!("number_to called with non-numeric tag {target}"),
    }
}
