//! Pluggable loaders and the manager that routes load requests to them.
//!
//! A loader executes or opens source for one tag and reports the functions it
//! exposes. The [`LoaderManager`] creates loaders on first use of their tag and
//! turns discovered functions into registry entries.

pub mod dylib;
pub mod error;
pub mod manager;
pub mod providers;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};

use polycall_symbol::Signature;
use polycall_value::Value;

pub use dylib::{DylibConfig, DylibLoader};
pub use error::LoaderError;
pub use manager::LoaderManager;
pub use providers::LoaderProvider;

/// A function a loader exposes after a successful load.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveredFunction {
    /// Registry name.
    pub name: String,
    /// Loader-internal reference handed back to [`Loader::invoke`].
    pub symbol: String,
    pub signature: Signature,
}

/// Backend for one source-language tag.
///
/// Loaders are shared between the manager and in-flight invocations, so every
/// method takes `&self` and implementations keep their state behind their own
/// locks. A failed load must leave no trace in what [`Loader::discover`]
/// reports.
pub trait Loader: Send + Sync {
    fn tag(&self) -> &str;

    fn load_from_file(&self, paths: &[PathBuf]) -> Result<()>;

    fn load_from_memory(&self, name: &str, buffer: &[u8]) -> Result<()> {
        let _ = (name, buffer);
        bail!("loader `{}` cannot load from memory", self.tag())
    }

    fn load_from_package(&self, path: &Path) -> Result<()> {
        bail!(
            "loader `{}` cannot load package {}",
            self.tag(),
            path.display()
        )
    }

    /// Functions exposed by the most recent successful load.
    fn discover(&self) -> Result<Vec<DiscoveredFunction>>;

    fn invoke(&self, symbol: &str, args: &[Value]) -> Result<Value>;

    /// Whether [`Loader::invoke`] can take function values. Loaders that ship
    /// arguments over a wire keep the default, and the dispatcher rejects
    /// function arguments before calling them.
    fn accepts_function_values(&self) -> bool {
        false
    }

    fn teardown(&self) {}
}

/// Constructor for a loader, registered per tag.
pub type LoaderFactory = Arc<dyn Fn() -> Result<Arc<dyn Loader>> + Send + Sync>;
