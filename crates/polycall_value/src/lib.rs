//! Generic value representation shared by every loader and the dispatcher.
//!
//! A [`Value`] is a tagged union; its [`ValueTag`] decides which accessor is
//! valid. Conversions between tags go through [`Value::cast`] and may fail with
//! a [`ValueError`].

mod cast;
mod error;
mod function;
mod json;
mod map;
mod tag;
mod value;
mod wire;

pub use error::ValueError;
pub use function::{Callable, FunctionRef};
pub use map::ValueMap;
pub use tag::{ParamType, ValueTag};
pub use value::Value;

/// Zero-length argument list for calls that take no arguments.
pub const NO_ARGS: &[Value] = &[];
