//! Function handles and the name-keyed registry the dispatcher resolves from.

pub mod handle;
pub mod registry;

pub use handle::{FunctionHandle, NativeFn, Signature, Target};
pub use registry::FunctionRegistry;
