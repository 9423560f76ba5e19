//! Runtime context, invocation dispatcher and C-compatible boundary.
//!
//! A [`Runtime`] bundles the loader manager, the function registry and the
//! initialization flag behind one lock. [`global()`] offers a process-wide
//! default context, which is what the `extern "C"` surface in [`capi`] uses.

pub mod capi;
pub mod config;
mod dispatch;
pub mod error;
mod global;
mod native;
mod runtime;

pub use config::RuntimeConfig;
pub use error::{BridgeError, Result};
pub use global::*;
pub use runtime::{FunctionInfo, Runtime};

pub use polycall_loader::{DiscoveredFunction, Loader, LoaderFactory, LoaderProvider};
pub use polycall_symbol::{FunctionHandle, NativeFn, Signature, Target};
pub use polycall_value::{
    Callable, FunctionRef, NO_ARGS, ParamType, Value, ValueError, ValueMap, ValueTag,
};

/// Calls `name` on a runtime with any number of arguments convertible into
/// [`Value`].
///
/// ```ignore
/// let sum = metacall!(runtime, "add", 2, 3)?;
/// ```
#[macro_export]
macro_rules! metacall {
    ($runtime:expr, $name:expr $(, $arg:expr)* $(,)?) => {
        $runtime.metacallv($name, &[$($crate::Value::from($arg)),*])
    };
}
