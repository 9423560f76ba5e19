//! Loader for shared libraries exposing a stable export table.
//!
//! A library participates by exporting three C symbols (names configurable):
//!
//! - `polycall_exports() -> StableExportSet` describing its functions,
//! - `polycall_call_json(symbol, args_json) -> *mut c_char` which runs a
//!   function on tagged-JSON arguments and replies with `{"ok": value}` or
//!   `{"error": message}`,
//! - `polycall_free_string(*mut c_char)` releasing replies.

mod exports;
mod library;
mod package;

use std::ffi::{CStr, CString};
use std::io::Write;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use anyhow::{Context, Result, anyhow, bail};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use polycall_value::Value;

use crate::providers::LoaderProvider;
use crate::{DiscoveredFunction, Loader};

pub use exports::{ExportFn, StableExportSet, StableFunction, read_exports};
pub use library::{DynamicLibrary, LibraryCache};
pub use package::{MANIFEST_FILE, PackageManifest};

pub const TAG: &str = "dylib";

pub type JsonDispatcher = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut c_char;
pub type FreeString = unsafe extern "C" fn(*mut c_char);

/// Symbol names looked up in every library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DylibConfig {
    pub exports_symbol: String,
    pub call_symbol: String,
    pub free_symbol: String,
}

impl Default for DylibConfig {
    fn default() -> Self {
        Self {
            exports_symbol: "polycall_exports".to_string(),
            call_symbol: "polycall_call_json".to_string(),
            free_symbol: "polycall_free_string".to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum CallReply {
    Ok(Value),
    Error(String),
}

#[derive(Clone)]
struct LoadedModule {
    path: PathBuf,
    /// Keeps the library mapped while `dispatcher` and `free` are in use.
    _library: DynamicLibrary,
    dispatcher: JsonDispatcher,
    free: FreeString,
}

#[derive(Default)]
struct DylibState {
    next_id: u64,
    modules: AHashMap<u64, LoadedModule>,
    last_loaded: Vec<DiscoveredFunction>,
    /// Backing files of libraries loaded from memory.
    scratch: Vec<NamedTempFile>,
}

pub struct DylibLoader {
    config: DylibConfig,
    cache: LibraryCache,
    state: Mutex<DylibState>,
}

impl Default for DylibLoader {
    fn default() -> Self {
        Self::new(DylibConfig::default())
    }
}

impl DylibLoader {
    pub fn new(config: DylibConfig) -> Self {
        Self {
            config,
            cache: LibraryCache::new(),
            state: Mutex::new(DylibState::default()),
        }
    }

    /// Opens every path before touching the loader state, so one bad library
    /// rejects the whole batch.
    fn load_paths(&self, paths: &[PathBuf], scratch: Option<NamedTempFile>) -> Result<()> {
        if paths.is_empty() {
            bail!("no library paths given");
        }

        let mut opened = Vec::with_capacity(paths.len());
        let mut fresh = Vec::new();
        for path in paths {
            if !self.cache.contains(path) {
                fresh.push(path);
            }
            match self.open(path) {
                Ok(entry) => opened.push(entry),
                Err(err) => {
                    for path in fresh {
                        self.cache.evict(path);
                    }
                    return Err(err);
                }
            }
        }

        let mut state = self.state.lock();
        let mut discovered = Vec::new();
        for (module, functions) in opened {
            let id = state.next_id;
            state.next_id += 1;
            debug!(path = %module.path.display(), id, count = functions.len(), "library loaded");
            discovered.extend(functions.into_iter().map(|function| DiscoveredFunction {
                signature: function.signature(),
                name: function.name.into_string(),
                symbol: format!("{id}:{}", function.symbol),
            }));
            state.modules.insert(id, module);
        }
        state.last_loaded = discovered;
        state.scratch.extend(scratch);
        Ok(())
    }

    fn open(&self, path: &Path) -> Result<(LoadedModule, Vec<StableFunction>)> {
        let library = self.cache.load(path)?;
        let functions = read_exports(&library, &self.config.exports_symbol)
            .with_context(|| format!("failed to read exports of {}", path.display()))?;
        let dispatcher = unsafe { library.get::<JsonDispatcher>(self.config.call_symbol.as_bytes()) }
            .map(|symbol| *symbol)
            .with_context(|| {
                format!(
                    "{} does not expose `{}`",
                    path.display(),
                    self.config.call_symbol
                )
            })?;
        let free = unsafe { library.get::<FreeString>(self.config.free_symbol.as_bytes()) }
            .map(|symbol| *symbol)
            .with_context(|| {
                format!(
                    "{} does not expose `{}`",
                    path.display(),
                    self.config.free_symbol
                )
            })?;

        let module = LoadedModule {
            path: path.to_path_buf(),
            _library: library,
            dispatcher,
            free,
        };
        Ok((module, functions))
    }

    /// Number of distinct libraries currently mapped by this loader.
    pub fn open_libraries(&self) -> usize {
        self.cache.len()
    }

    fn module_for(&self, symbol: &str) -> Result<(LoadedModule, String)> {
        let (id, name) = symbol
            .split_once(':')
            .ok_or_else(|| anyhow!("malformed dylib symbol `{symbol}`"))?;
        let id: u64 = id
            .parse()
            .with_context(|| format!("malformed dylib symbol `{symbol}`"))?;
        let module = self
            .state
            .lock()
            .modules
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("library for `{name}` is no longer loaded"))?;
        Ok((module, name.to_string()))
    }
}

impl Loader for DylibLoader {
    fn tag(&self) -> &str {
        TAG
    }

    fn load_from_file(&self, paths: &[PathBuf]) -> Result<()> {
        self.load_paths(paths, None)
    }

    fn load_from_memory(&self, name: &str, buffer: &[u8]) -> Result<()> {
        let mut file = tempfile::Builder::new()
            .prefix(name)
            .suffix(std::env::consts::DLL_SUFFIX)
            .tempfile()
            .context("failed to create scratch file for in-memory library")?;
        file.write_all(buffer)
            .and_then(|()| file.flush())
            .context("failed to write in-memory library")?;
        let path = file.path().to_path_buf();
        self.load_paths(&[path], Some(file))
    }

    fn load_from_package(&self, path: &Path) -> Result<()> {
        let (manifest, root) = PackageManifest::read(path)?;
        debug!(package = manifest.name.as_deref().unwrap_or("<unnamed>"), "loading package");
        self.load_paths(&manifest.library_paths(&root), None)
    }

    fn discover(&self) -> Result<Vec<DiscoveredFunction>> {
        Ok(self.state.lock().last_loaded.clone())
    }

    fn invoke(&self, symbol: &str, args: &[Value]) -> Result<Value> {
        let (module, name) = self.module_for(symbol)?;
        let args_json = serde_json::to_string(args)
            .with_context(|| format!("failed to encode arguments for `{name}`"))?;

        let func_cstr = CString::new(name.as_str())
            .with_context(|| format!("failed to convert function name `{name}` to CString"))?;
        let args_cstr = CString::new(args_json)
            .with_context(|| format!("failed to convert args JSON for `{name}`"))?;

        let raw = unsafe { (module.dispatcher)(func_cstr.as_ptr(), args_cstr.as_ptr()) };
        if raw.is_null() {
            bail!(
                "json dispatcher returned null for `{name}` in {}",
                module.path.display()
            );
        }
        let reply = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        unsafe { (module.free)(raw) };

        match serde_json::from_str::<CallReply>(&reply)
            .with_context(|| format!("invalid reply from `{name}`: {reply}"))?
        {
            CallReply::Ok(value) => Ok(value),
            CallReply::Error(message) => Err(anyhow!(message)),
        }
    }

    fn teardown(&self) {
        let mut state = self.state.lock();
        state.modules.clear();
        state.last_loaded.clear();
        state.scratch.clear();
        self.cache.clear();
    }
}

fn create_default_loader() -> Result<Arc<dyn Loader>> {
    Ok(Arc::new(DylibLoader::default()))
}

inventory::submit! {
    LoaderProvider {
        tag: TAG,
        create: create_default_loader,
    }
}
