use thiserror::Error;

use crate::ValueTag;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    #[error("cannot convert {from} to {to}")]
    TypeMismatch { from: ValueTag, to: ValueTag },
    #[error("cannot parse `{input}` as {to}")]
    Parse { input: String, to: ValueTag },
    #[error("buffer is not valid utf-8: {0}")]
    Utf8(String),
    #[error("{0} values cannot be serialized")]
    Unserializable(ValueTag),
    #[error("unknown value tag `{0}`")]
    UnknownTag(String),
}
