//! Manifest file discovery
//!
//! Answers "where is THE manifest for this mode". Falling back from one
//! manifest to another when a model is missing happens one layer up.

use std::path::{Path, PathBuf};
use dbt_meta_core::config::{expand_home, Config};
use crate::manifest::ManifestError;

/// Finds production / development manifest files on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLocator {
    prod_path: PathBuf,
    dev_path: PathBuf,
}

impl ManifestLocator {
    pub fn new(prod_path: impl Into<PathBuf>, dev_path: impl Into<PathBuf>) -> Self {
        Self {
            prod_path: prod_path.into(),
            dev_path: dev_path.into(),
        }
    }

    /// Locator for the configured manifest locations
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.prod_manifest_path, &config.dev_manifest_path)
    }

    /// Configured production location (may not exist)
    pub fn prod_path(&self) -> &Path {
        &self.prod_path
    }

    /// Configured development location (may not exist)
    pub fn dev_path(&self) -> &Path {
        &self.dev_path
    }

    /// Absolute path of the manifest to use
    ///
    /// An explicit path is final: if it does not exist the lookup fails
    /// without trying any configured location. Otherwise exactly one of the
    /// development or production location is checked, depending on `use_dev`.
    pub fn locate(&self, explicit_path: Option<&Path>, use_dev: bool) -> Result<PathBuf, ManifestError> {
        let candidate = match explicit_path {
            Some(path) => expand_home(&path.to_string_lossy(), dirs::home_dir().as_deref()),
            None if use_dev => self.dev_path.clone(),
            None => self.prod_path.clone(),
        };

        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), use_dev, "located manifest");
            return Ok(absolute(&candidate));
        }

        Err(ManifestError::NotFound {
            path: candidate.clone(),
            searched: vec![candidate],
        })
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
