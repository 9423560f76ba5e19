use serde_json::{Map as JsonMap, Number as JsonNumber, Value as Json};

use crate::{Value, ValueError, ValueMap, ValueTag};

impl Value {
    /// Converts plain JSON into a value, picking the narrowest of i32/i64/u64/f64
    /// for numbers. Objects become maps with string keys.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map_or(Value::I64(i), Value::I32)
                } else if let Some(u) = n.as_u64() {
                    Value::U64(u)
                } else {
                    Value::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            Json::Object(fields) => Value::Map(
                fields
                    .iter()
                    .map(|(key, value)| (Value::Str(key.clone()), Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Renders the value as plain JSON for display and tooling.
    ///
    /// Buffers become arrays of bytes, maps with only string keys become
    /// objects and any other map becomes an array of `[key, value]` pairs.
    pub fn to_json(&self) -> Result<Json, ValueError> {
        let json = match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::I8(n) => Json::from(*n),
            Value::I16(n) => Json::from(*n),
            Value::I32(n) => Json::from(*n),
            Value::I64(n) => Json::from(*n),
            Value::U8(n) => Json::from(*n),
            Value::U16(n) => Json::from(*n),
            Value::U32(n) => Json::from(*n),
            Value::U64(n) => Json::from(*n),
            Value::F32(n) => float_to_json(f64::from(*n), ValueTag::F32)?,
            Value::F64(n) => float_to_json(*n, ValueTag::F64)?,
            Value::Str(s) => Json::String(s.clone()),
            Value::Buffer(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            Value::Array(items) => Json::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(map) => map_to_json(map)?,
            Value::Function(_) => return Err(ValueError::Unserializable(ValueTag::Function)),
        };
        Ok(json)
    }
}

fn float_to_json(n: f64, tag: ValueTag) -> Result<Json, ValueError> {
    JsonNumber::from_f64(n)
        .map(Json::Number)
        .ok_or(ValueError::Unserializable(tag))
}

fn map_to_json(map: &ValueMap) -> Result<Json, ValueError> {
    if map.keys().all(|key| key.as_str().is_some()) {
        let mut object = JsonMap::with_capacity(map.len());
        for (key, value) in map.iter() {
            if let Some(key) = key.as_str() {
                object.insert(key.to_owned(), value.to_json()?);
            }
        }
        return Ok(Json::Object(object));
    }

    map.iter()
        .map(|(key, value)| {
            Ok::<_, ValueError>(Json::Array(vec![key.to_json()?, value.to_json()?]))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Json::Array)
}
