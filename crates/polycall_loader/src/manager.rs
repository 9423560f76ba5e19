use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use anyhow::Result;
use tracing::{debug, info, warn};

use polycall_symbol::{FunctionHandle, FunctionRegistry};

use crate::error::LoaderError;
use crate::providers::find_provider;
use crate::{Loader, LoaderFactory};

/// Owns one loader per tag and routes load requests to it.
pub struct LoaderManager {
    factories: AHashMap<String, LoaderFactory>,
    loaders: AHashMap<String, Arc<dyn Loader>>,
    /// Creation order, used to tear loaders down in reverse.
    order: Vec<String>,
    search_paths: Vec<PathBuf>,
}

impl LoaderManager {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            factories: AHashMap::new(),
            loaders: AHashMap::new(),
            order: Vec::new(),
            search_paths,
        }
    }

    /// Registers a constructor for `tag`. Explicit factories take precedence
    /// over link-time providers. Already created loaders are left alone.
    pub fn add_factory(&mut self, tag: impl Into<String>, factory: LoaderFactory) {
        self.factories.insert(tag.into(), factory);
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn Loader>> {
        self.loaders.get(tag).cloned()
    }

    pub fn get_or_create(&mut self, tag: &str) -> Result<Arc<dyn Loader>, LoaderError> {
        if let Some(loader) = self.loaders.get(tag) {
            return Ok(loader.clone());
        }

        let created = if let Some(factory) = self.factories.get(tag) {
            factory()
        } else if let Some(provider) = find_provider(tag) {
            (provider.create)()
        } else {
            return Err(LoaderError::NotFound(tag.to_string()));
        };

        let loader = created.map_err(|source| LoaderError::Create {
            tag: tag.to_string(),
            source,
        })?;
        info!(tag, "loader initialized");
        self.loaders.insert(tag.to_string(), loader.clone());
        self.order.push(tag.to_string());
        Ok(loader)
    }

    pub fn load_from_file(
        &mut self,
        tag: &str,
        paths: &[PathBuf],
        registry: &mut FunctionRegistry,
    ) -> Result<usize, LoaderError> {
        let loader = self.get_or_create(tag)?;
        let resolved = paths
            .iter()
            .map(|path| self.resolve_path(path))
            .collect::<Vec<_>>();
        debug!(tag, paths = ?resolved, "loading from file");
        let result = loader.load_from_file(&resolved);
        Self::register_discovered(loader.as_ref(), tag, result, registry)
    }

    pub fn load_from_memory(
        &mut self,
        tag: &str,
        name: &str,
        buffer: &[u8],
        registry: &mut FunctionRegistry,
    ) -> Result<usize, LoaderError> {
        let loader = self.get_or_create(tag)?;
        debug!(tag, name, size = buffer.len(), "loading from memory");
        let result = loader.load_from_memory(name, buffer);
        Self::register_discovered(loader.as_ref(), tag, result, registry)
    }

    pub fn load_from_package(
        &mut self,
        tag: &str,
        path: &Path,
        registry: &mut FunctionRegistry,
    ) -> Result<usize, LoaderError> {
        let loader = self.get_or_create(tag)?;
        let resolved = self.resolve_path(path);
        debug!(tag, path = %resolved.display(), "loading package");
        let result = loader.load_from_package(&resolved);
        Self::register_discovered(loader.as_ref(), tag, result, registry)
    }

    /// Discovers and registers after a load, or reports the load failure
    /// without touching the registry.
    fn register_discovered(
        loader: &dyn Loader,
        tag: &str,
        result: Result<()>,
        registry: &mut FunctionRegistry,
    ) -> Result<usize, LoaderError> {
        let discovered = result.and_then(|()| loader.discover()).map_err(|source| {
            warn!(tag, error = %format!("{source:#}"), "load failed");
            LoaderError::Load {
                tag: tag.to_string(),
                source,
            }
        })?;

        let handles = discovered.into_iter().map(|function| {
            FunctionHandle::loader(function.name, function.signature, tag, function.symbol)
        });
        Ok(registry.register_many(handles))
    }

    /// Resolves a relative path against the configured search paths, falling
    /// back to the path as given.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.exists() {
            return path.to_path_buf();
        }
        self.search_paths
            .iter()
            .map(|base| base.join(path))
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| path.to_path_buf())
    }

    /// Tears every loader down in reverse creation order and drops the
    /// functions they registered.
    pub fn teardown_all(&mut self, registry: &mut FunctionRegistry) {
        for tag in self.order.drain(..).rev() {
            if let Some(loader) = self.loaders.remove(&tag) {
                let removed = registry.unregister_all_for(&tag);
                debug!(tag = %tag, removed, "tearing down loader");
                loader.teardown();
            }
        }
    }

    /// Tags of the live loaders in creation order.
    pub fn tags(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}
