use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const MANIFEST_FILE: &str = "polycall.json";

/// `polycall.json` at the root of a library package.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,
    /// Library files relative to the package directory.
    pub libraries: Vec<PathBuf>,
}

impl PackageManifest {
    /// Reads the manifest from a package directory or a direct path to the
    /// manifest file, returning it with the package root.
    pub fn read(path: &Path) -> Result<(Self, PathBuf)> {
        let (manifest_path, root) = if path.is_dir() {
            (path.join(MANIFEST_FILE), path.to_path_buf())
        } else {
            let root = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            (path.to_path_buf(), root)
        };

        let contents = fs::read_to_string(&manifest_path)
            .with_context(|| format!("failed to read {}", manifest_path.display()))?;
        let manifest: PackageManifest = serde_json::from_str(&contents)
            .with_context(|| format!("invalid package manifest {}", manifest_path.display()))?;
        if manifest.libraries.is_empty() {
            bail!("package manifest {} lists no libraries", manifest_path.display());
        }
        Ok((manifest, root))
    }

    pub fn library_paths(&self, root: &Path) -> Vec<PathBuf> {
        self.libraries.iter().map(|lib| root.join(lib)).collect()
    }
}
