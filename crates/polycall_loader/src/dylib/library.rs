use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use libloading::Library;
use parking_lot::Mutex;

/// Reference-counted `libloading::Library` so in-flight calls keep the library
/// mapped while the loader is being torn down.
#[derive(Clone)]
pub struct DynamicLibrary {
    inner: Arc<Library>,
}

impl DynamicLibrary {
    pub fn new(library: Library) -> Self {
        Self {
            inner: Arc::new(library),
        }
    }
}

impl Deref for DynamicLibrary {
    type Target = Library;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

/// Opens libraries on demand, caching handles by canonical path.
#[derive(Default)]
pub struct LibraryCache {
    cache: Mutex<HashMap<PathBuf, DynamicLibrary>>,
}

impl LibraryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, path: &Path) -> Result<DynamicLibrary> {
        let canonical = path
            .canonicalize()
            .with_context(|| format!("library {} does not exist", path.display()))?;
        if let Some(existing) = self.cache.lock().get(&canonical).cloned() {
            return Ok(existing);
        }

        let library = unsafe { Library::new(&canonical) }
            .with_context(|| format!("failed to load dynamic library {}", canonical.display()))?;
        let handle = DynamicLibrary::new(library);
        self.cache.lock().insert(canonical, handle.clone());
        Ok(handle)
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.canonicalize()
            .is_ok_and(|canonical| self.cache.lock().contains_key(&canonical))
    }

    /// Drops the cached handle for `path`; the library is unmapped once no
    /// loaded module still holds it.
    pub fn evict(&self, path: &Path) {
        if let Ok(canonical) = path.canonicalize() {
            self.cache.lock().remove(&canonical);
        }
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_paths_are_never_cached() {
        let cache = LibraryCache::new();
        let path = Path::new("/definitely/not/here.so");
        assert!(cache.load(path).is_err());
        assert!(!cache.contains(path));
        cache.evict(path);
        assert!(cache.is_empty());
    }
}
