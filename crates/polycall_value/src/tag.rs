use std::fmt;
use std::str::FromStr;

use abi_stable::StableAbi;
use serde::{Deserialize, Serialize};

use crate::ValueError;

/// Discriminant of a [`crate::Value`].
///
/// The numeric ids are part of the C boundary and must stay stable.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, StableAbi, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueTag {
    Bool = 0,
    I8 = 1,
    I16 = 2,
    I32 = 3,
    I64 = 4,
    U8 = 5,
    U16 = 6,
    U32 = 7,
    U64 = 8,
    F32 = 9,
    F64 = 10,
    Str = 11,
    Buffer = 12,
    Array = 13,
    Map = 14,
    Null = 15,
    Function = 16,
}

impl ValueTag {
    pub const ALL: [ValueTag; 17] = [
        ValueTag::Bool,
        ValueTag::I8,
        ValueTag::I16,
        ValueTag::I32,
        ValueTag::I64,
        ValueTag::U8,
        ValueTag::U16,
        ValueTag::U32,
        ValueTag::U64,
        ValueTag::F32,
        ValueTag::F64,
        ValueTag::Str,
        ValueTag::Buffer,
        ValueTag::Array,
        ValueTag::Map,
        ValueTag::Null,
        ValueTag::Function,
    ];

    #[inline]
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Option<Self> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| Self::ALL.get(idx))
            .copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueTag::Bool => "bool",
            ValueTag::I8 => "i8",
            ValueTag::I16 => "i16",
            ValueTag::I32 => "i32",
            ValueTag::I64 => "i64",
            ValueTag::U8 => "u8",
            ValueTag::U16 => "u16",
            ValueTag::U32 => "u32",
            ValueTag::U64 => "u64",
            ValueTag::F32 => "f32",
            ValueTag::F64 => "f64",
            ValueTag::Str => "str",
            ValueTag::Buffer => "buffer",
            ValueTag::Array => "array",
            ValueTag::Map => "map",
            ValueTag::Null => "null",
            ValueTag::Function => "function",
        }
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ValueTag::I8
                | ValueTag::I16
                | ValueTag::I32
                | ValueTag::I64
                | ValueTag::U8
                | ValueTag::U16
                | ValueTag::U32
                | ValueTag::U64
        )
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, ValueTag::F32 | ValueTag::F64)
    }

    #[inline]
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }
}

impl fmt::Display for ValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueTag {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = match s.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => ValueTag::Bool,
            "i8" | "char" => ValueTag::I8,
            "i16" | "short" => ValueTag::I16,
            "i32" | "int" => ValueTag::I32,
            "i64" | "long" => ValueTag::I64,
            "u8" => ValueTag::U8,
            "u16" => ValueTag::U16,
            "u32" => ValueTag::U32,
            "u64" => ValueTag::U64,
            "f32" | "float" => ValueTag::F32,
            "f64" | "double" => ValueTag::F64,
            "str" | "string" => ValueTag::Str,
            "buffer" | "bytes" => ValueTag::Buffer,
            "array" | "vec" => ValueTag::Array,
            "map" => ValueTag::Map,
            "null" | "unit" => ValueTag::Null,
            "function" | "fn" => ValueTag::Function,
            _ => return Err(ValueError::UnknownTag(s.to_string())),
        };
        Ok(tag)
    }
}

/// Declared type of a parameter or return slot.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, StableAbi, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Accepts any value; the callee inspects its runtime shape.
    Any,
    Tag(ValueTag),
}

impl ParamType {
    #[inline]
    pub fn tag(self) -> Option<ValueTag> {
        match self {
            ParamType::Any => None,
            ParamType::Tag(tag) => Some(tag),
        }
    }
}

impl From<ValueTag> for ParamType {
    fn from(tag: ValueTag) -> Self {
        ParamType::Tag(tag)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Any => f.write_str("any"),
            ParamType::Tag(tag) => write!(f, "{tag}"),
        }
    }
}

impl FromStr for ParamType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("any") {
            Ok(ParamType::Any)
        } else {
            s.parse().map(ParamType::Tag)
        }
    }
}
