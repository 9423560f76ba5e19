//! Pieces of the tagged serde form that the derive cannot express.
//!
//! JSON has no literal for NaN or the infinities, so non-finite floats travel
//! as the string tokens `"nan"`, `"inf"` and `"-inf"`. Function values have no
//! wire form at all.

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{self, Serializer};

use crate::{FunctionRef, Value, ValueError, ValueTag};

const NAN: &str = "nan";
const INF: &str = "inf";
const NEG_INF: &str = "-inf";

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum FloatRepr {
    Number(f64),
    Token(String),
}

fn token_for(value: f64) -> &'static str {
    if value.is_nan() {
        NAN
    } else if value.is_sign_negative() {
        NEG_INF
    } else {
        INF
    }
}

fn parse_repr<E: de::Error>(repr: FloatRepr) -> Result<f64, E> {
    match repr {
        FloatRepr::Number(n) => Ok(n),
        FloatRepr::Token(token) => match token.to_ascii_lowercase().as_str() {
            NAN => Ok(f64::NAN),
            INF | "infinity" | "+inf" => Ok(f64::INFINITY),
            NEG_INF | "-infinity" => Ok(f64::NEG_INFINITY),
            _ => Err(E::invalid_value(
                de::Unexpected::Str(&token),
                &"a number, \"nan\", \"inf\" or \"-inf\"",
            )),
        },
    }
}

pub(crate) mod f64_token {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_str(token_for(*value))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        parse_repr(FloatRepr::deserialize(deserializer)?)
    }
}

pub(crate) mod f32_token {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f32(*value)
        } else {
            serializer.serialize_str(token_for(f64::from(*value)))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        // Narrowing keeps NaN and the infinities.
        parse_repr(FloatRepr::deserialize(deserializer)?).map(|n| n as f32)
    }
}

pub(crate) fn reject_function<S: Serializer>(
    _function: &FunctionRef,
    _serializer: S,
) -> Result<S::Ok, S::Error> {
    Err(ser::Error::custom(ValueError::Unserializable(ValueTag::Function)))
}

impl Value {
    /// Fails when `self`, or anything nested in it, has no wire form.
    pub fn check_wire(&self) -> Result<(), ValueError> {
        match self {
            Value::Function(_) => Err(ValueError::Unserializable(ValueTag::Function)),
            Value::Array(items) => items.iter().try_for_each(Value::check_wire),
            Value::Map(map) => map
                .iter()
                .try_for_each(|(key, value)| key.check_wire().and_then(|()| value.check_wire())),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Arc;

    use crate::{Callable, ValueMap};

    use super::*;

    #[derive(Debug)]
    struct Named;

    impl Callable for Named {
        fn name(&self) -> &str {
            "named"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn function_value() -> Value {
        Value::Function(FunctionRef::new(Arc::new(Named)))
    }

    #[test]
    fn non_finite_floats_survive_the_wire() {
        for value in [
            Value::F64(f64::INFINITY),
            Value::F64(f64::NEG_INFINITY),
            Value::F32(f32::INFINITY),
            Value::F32(f32::NEG_INFINITY),
        ] {
            let json = serde_json::to_string(&value).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(back, value, "{json}");
        }

        let json = serde_json::to_string(&Value::F64(f64::NAN)).unwrap();
        assert_eq!(json, r#"{"type":"f64","value":"nan"}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Value::F64(n) if n.is_nan()));

        let back: Value = serde_json::from_str(r#"{"type":"f32","value":"NaN"}"#).unwrap();
        assert!(matches!(back, Value::F32(n) if n.is_nan()));
    }

    #[test]
    fn finite_floats_stay_numbers() {
        let json = serde_json::to_string(&Value::F64(2.5)).unwrap();
        assert_eq!(json, r#"{"type":"f64","value":2.5}"#);
        let back: Value = serde_json::from_str(r#"{"type":"f64","value":3}"#).unwrap();
        assert_eq!(back, Value::F64(3.0));
        assert!(serde_json::from_str::<Value>(r#"{"type":"f64","value":"lots"}"#).is_err());
    }

    #[test]
    fn functions_have_no_wire_form() {
        let err = serde_json::to_string(&function_value()).unwrap_err();
        assert!(err.to_string().contains("function values cannot be serialized"));

        let nested = Value::Array(vec![Value::I32(1), function_value()]);
        assert_eq!(
            nested.check_wire(),
            Err(ValueError::Unserializable(ValueTag::Function))
        );

        let map: ValueMap = [(Value::from("cb"), function_value())].into_iter().collect();
        assert!(Value::Map(map).check_wire().is_err());
        assert_eq!(Value::from("plain").check_wire(), Ok(()));
    }
}
