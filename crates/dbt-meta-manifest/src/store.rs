//! Parsed-manifest cache
//!
//! At most a production and a development manifest are in play per process,
//! so the cache is tiny and keyed by canonical path. Entries are never
//! mutated after parse.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use crate::manifest::{Manifest, ManifestError};

/// Default number of cached manifests
pub const DEFAULT_CAPACITY: usize = 2;

/// Loads manifests and caches them by absolute path
#[derive(Debug)]
pub struct ManifestStore {
    /// Insertion-ordered so the oldest entry is evicted first
    cache: Arc<RwLock<IndexMap<PathBuf, Arc<Manifest>>>>,

    capacity: usize,
}

impl ManifestStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store holding at most `capacity` manifests (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: Arc::new(RwLock::new(IndexMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Load a manifest, reusing the cached parse for the same file
    pub fn load(&self, path: &Path) -> Result<Arc<Manifest>, ManifestError> {
        let key = std::fs::canonicalize(path).map_err(|_| ManifestError::NotFound {
            path: path.to_path_buf(),
            searched: vec![path.to_path_buf()],
        })?;

        if let Some(manifest) = self.read().get(&key) {
            tracing::debug!(path = %key.display(), "manifest cache hit");
            return Ok(Arc::clone(manifest));
        }

        tracing::debug!(path = %key.display(), "parsing manifest");
        let manifest = Arc::new(Manifest::from_file(&key)?);

        let mut cache = self.write();

        // Another caller may have parsed the same file meanwhile
        if let Some(existing) = cache.get(&key) {
            return Ok(Arc::clone(existing));
        }

        while cache.len() >= self.capacity {
            cache.shift_remove_index(0);
        }
        cache.insert(key, Arc::clone(&manifest));

        Ok(manifest)
    }

    /// Number of cached manifests
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached manifest
    pub fn clear(&self) {
        self.write().clear();
    }

    // Entries are whole parses, so a poisoned map is still consistent
    fn read(&self) -> RwLockReadGuard<'_, IndexMap<PathBuf, Arc<Manifest>>> {
        self.cache.read().unwrap_or_else(|poisoned| {
            tracing::warn!("manifest cache lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<PathBuf, Arc<Manifest>>> {
        self.cache.write().unwrap_or_else(|poisoned| {
            tracing::warn!("manifest cache lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }
}

impl Default for ManifestStore {
    fn default() -> Self {
        Self::new()
    }
}
