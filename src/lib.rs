//! Polyglot function-call bridge.
//!
//! Code is loaded through pluggable loaders keyed by a language tag; every
//! function a load exposes lands in one registry and is invoked by name with
//! dynamically typed [`Value`] arguments. See [`Runtime`] for the entry points
//! and [`capi`] for the C-compatible surface.

pub mod cli;

pub use polycall_runtime::*;

pub mod loader {
    pub use polycall_loader::*;
}

pub mod utils {
    pub use polycall_utils::*;
}
