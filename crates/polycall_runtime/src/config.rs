//! Runtime configuration
//!
//! Defaults, environment variables and (with the `toml-config` feature) a TOML
//! file. Environment variables take precedence over file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use polycall_loader::DylibConfig;

/// Upper bound on the number of arguments a single call may carry.
pub const DEFAULT_ARGS_SIZE: usize = 16;

pub const ENV_ARGS_SIZE: &str = "POLYCALL_ARGS_SIZE";
pub const ENV_PRELOAD: &str = "POLYCALL_PRELOAD";
pub const ENV_PATH: &str = "POLYCALL_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum call arity accepted by the dispatcher.
    pub args_size: usize,

    /// Loader tags created eagerly during `initialize`.
    pub preload: Vec<String>,

    /// Base directories for relative load paths, searched in order.
    pub search_paths: Vec<PathBuf>,

    /// Symbol names used by the shared-library loader.
    pub dylib: DylibConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            args_size: DEFAULT_ARGS_SIZE,
            preload: Vec::new(),
            search_paths: Vec::new(),
            dylib: DylibConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().merge_with_env()
    }

    /// Load configuration from TOML file
    #[cfg(feature = "toml-config")]
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: RuntimeConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from TOML file (stub when toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn from_file(_path: &Path) -> anyhow::Result<Self> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }

    /// Save configuration to TOML file
    #[cfg(feature = "toml-config")]
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Save configuration to TOML file (stub when toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn save_to_file(&self, _path: &Path) -> anyhow::Result<()> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }

    /// Merge with environment variables (env vars take precedence)
    pub fn merge_with_env(self) -> Self {
        self.merge_with(|key| std::env::var(key).ok())
    }

    /// Overrides fields from `lookup`, which maps variable names to values.
    pub fn merge_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(size) = lookup(ENV_ARGS_SIZE).and_then(|val| val.trim().parse().ok()) {
            self.args_size = size;
        }

        if let Some(tags) = lookup(ENV_PRELOAD) {
            self.preload = tags
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_owned)
                .collect();
        }

        if let Some(paths) = lookup(ENV_PATH) {
            self.search_paths = std::env::split_paths(&paths).collect();
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.args_size, DEFAULT_ARGS_SIZE);
        assert!(config.preload.is_empty());
        assert_eq!(config.dylib.exports_symbol, "polycall_exports");
    }

    #[test]
    fn env_overrides_fields() {
        let vars = HashMap::from([
            (ENV_ARGS_SIZE, "4"),
            (ENV_PRELOAD, "dylib, script,,"),
        ]);
        let config = RuntimeConfig::default()
            .merge_with(|key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.args_size, 4);
        assert_eq!(config.preload, vec!["dylib".to_string(), "script".to_string()]);
        assert!(config.search_paths.is_empty());
    }

    #[test]
    fn malformed_args_size_keeps_default() {
        let config = RuntimeConfig::default()
            .merge_with(|key| (key == ENV_ARGS_SIZE).then(|| "many".to_string()));
        assert_eq!(config.args_size, DEFAULT_ARGS_SIZE);
    }

    #[test]
    #[cfg(feature = "toml-config")]
    fn test_config_serialization() {
        let config = RuntimeConfig {
            preload: vec!["dylib".into()],
            ..RuntimeConfig::default()
        };
        let toml = toml::to_string(&config).unwrap();
        let deserialized: RuntimeConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    #[cfg(feature = "toml-config")]
    fn save_and_reload_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polycall.toml");
        let config = RuntimeConfig {
            args_size: 8,
            search_paths: vec![dir.path().to_path_buf()],
            ..RuntimeConfig::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(RuntimeConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    #[cfg(not(feature = "toml-config"))]
    fn file_loading_requires_feature() {
        assert!(RuntimeConfig::from_file(Path::new("polycall.toml")).is_err());
    }
}
