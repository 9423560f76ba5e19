use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use polycall_loader::dylib::{self, DylibLoader};
use polycall_loader::{Loader, LoaderFactory, LoaderManager};
use polycall_symbol::{FunctionHandle, FunctionRegistry, Signature};
use polycall_utils::timer::Stopwatch;
use polycall_value::Value;

use crate::config::RuntimeConfig;
use crate::error::{BridgeError, Result};

macro_rules! info_text {
    () => {
        concat!(
            "polycall v",
            env!("CARGO_PKG_VERSION"),
            " polyglot function-call bridge (",
            env!("CARGO_PKG_NAME"),
            ")"
        )
    };
}
pub(crate) use info_text;

pub(crate) struct RuntimeState {
    pub(crate) loaders: LoaderManager,
    pub(crate) registry: FunctionRegistry,
}

/// Registry entry as reported by [`Runtime::inspect`].
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    /// `None` for natively registered functions.
    pub loader: Option<String>,
    pub signature: Signature,
}

/// Bridging context: loaders, registry and lifecycle behind a single lock.
///
/// Loads, registrations and `destroy` hold the write lock for their whole
/// duration, so a function only becomes visible once its load fully succeeded.
/// Invocations hold the read lock only while resolving their target; the call
/// itself runs unlocked and may re-enter the runtime.
pub struct Runtime {
    config: RuntimeConfig,
    factories: Mutex<AHashMap<String, LoaderFactory>>,
    state: RwLock<Option<RuntimeState>>,
    memory_loads: AtomicU64,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::with_config(RuntimeConfig::default())
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let dylib_config = config.dylib.clone();
        let dylib_factory: LoaderFactory = Arc::new(move || {
            Ok(Arc::new(DylibLoader::new(dylib_config.clone())) as Arc<dyn Loader>)
        });

        Self {
            config,
            factories: Mutex::new(AHashMap::from_iter([(dylib::TAG.to_string(), dylib_factory)])),
            state: RwLock::new(None),
            memory_loads: AtomicU64::new(0),
        }
    }

    pub fn from_env() -> Self {
        Self::with_config(RuntimeConfig::from_env())
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Static diagnostic string; needs no initialization.
    pub fn print_info() -> &'static str {
        info_text!()
    }

    /// Maximum number of arguments a single call may carry.
    pub fn args_size(&self) -> usize {
        self.config.args_size
    }

    /// Makes `tag` constructible through `factory`, replacing any earlier
    /// factory for the tag. Takes effect for loaders not yet created, including
    /// on a live runtime.
    pub fn register_loader_factory(&self, tag: impl Into<String>, factory: LoaderFactory) {
        let tag = tag.into();
        if let Some(state) = self.state.write().as_mut() {
            state.loaders.add_factory(tag.clone(), factory.clone());
        }
        self.factories.lock().insert(tag, factory);
    }

    pub fn initialize(&self) -> Result<()> {
        let mut guard = self.state.write();
        if guard.is_some() {
            debug!("runtime already initialized");
            return Ok(());
        }

        let mut loaders = LoaderManager::new(self.config.search_paths.clone());
        for (tag, factory) in self.factories.lock().iter() {
            loaders.add_factory(tag.clone(), factory.clone());
        }

        let mut registry = FunctionRegistry::new();
        for tag in &self.config.preload {
            if let Err(err) = loaders.get_or_create(tag) {
                loaders.teardown_all(&mut registry);
                return Err(BridgeError::Initialization(err.to_string()));
            }
        }

        *guard = Some(RuntimeState { loaders, registry });
        info!(preload = ?self.config.preload, "runtime initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    /// Tears down every loader and clears the registry. A no-op when the
    /// runtime is not initialized.
    pub fn destroy(&self) -> Result<()> {
        let Some(mut state) = self.state.write().take() else {
            return Ok(());
        };
        state.loaders.teardown_all(&mut state.registry);
        state.registry.clear();
        info!("runtime destroyed");
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, tag: &str, paths: &[P]) -> Result<usize> {
        let paths = paths
            .iter()
            .map(|path| path.as_ref().to_path_buf())
            .collect::<Vec<PathBuf>>();
        self.load(tag, |state| {
            state
                .loaders
                .load_from_file(tag, &paths, &mut state.registry)
        })
    }

    pub fn load_from_memory(&self, tag: &str, buffer: &[u8]) -> Result<usize> {
        let seq = self.memory_loads.fetch_add(1, Ordering::Relaxed);
        let name = format!("memory_{seq}_");
        self.load(tag, |state| {
            state
                .loaders
                .load_from_memory(tag, &name, buffer, &mut state.registry)
        })
    }

    pub fn load_from_package(&self, tag: &str, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        self.load(tag, |state| {
            state
                .loaders
                .load_from_package(tag, path, &mut state.registry)
        })
    }

    fn load<F>(&self, tag: &str, op: F) -> Result<usize>
    where
        F: FnOnce(&mut RuntimeState) -> std::result::Result<usize, polycall_loader::LoaderError>,
    {
        let stopwatch = Stopwatch::start_new();
        let count = self.with_state_mut(|state| op(state).map_err(BridgeError::from))?;
        debug!(tag, count, elapsed_ms = stopwatch.elapsed_ms(), "load complete");
        Ok(count)
    }

    /// Number of live loader instances.
    pub fn loader_count(&self) -> usize {
        self.state
            .read()
            .as_ref()
            .map_or(0, |state| state.loaders.len())
    }

    pub fn loader_tags(&self) -> Vec<String> {
        self.state
            .read()
            .as_ref()
            .map(|state| state.loaders.tags())
            .unwrap_or_default()
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<FunctionHandle>> {
        self.with_state(|state| {
            state
                .registry
                .lookup(name)
                .ok_or_else(|| BridgeError::FunctionNotFound(name.to_string()))
        })
    }

    /// The registered function `name` wrapped as a value, for passing as a
    /// callback.
    pub fn function(&self, name: &str) -> Result<Value> {
        self.lookup(name).map(|handle| handle.to_value())
    }

    pub fn inspect(&self) -> Result<Vec<FunctionInfo>> {
        self.with_state(|state| {
            Ok(state
                .registry
                .all()
                .into_iter()
                .map(|handle| FunctionInfo {
                    name: handle.name.clone(),
                    loader: handle.loader_tag().map(str::to_owned),
                    signature: handle.signature.clone(),
                })
                .collect())
        })
    }

    pub(crate) fn with_state<T>(&self, f: impl FnOnce(&RuntimeState) -> Result<T>) -> Result<T> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(BridgeError::NotInitialized)?;
        f(state)
    }

    pub(crate) fn with_state_mut<T>(
        &self,
        f: impl FnOnce(&mut RuntimeState) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(BridgeError::NotInitialized)?;
        f(state)
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if let Some(mut state) = self.state.get_mut().take() {
            state.loaders.teardown_all(&mut state.registry);
        }
    }
}
