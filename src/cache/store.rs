//! JSON-backed hash cache for one tree.
//!
//! The cache maps a file's relative path to the hash computed for it and the
//! size/mtime it had at the time. It is shared by reference between hashing
//! workers; an internal `RwLock` guards the map.
//!
//! # Persisted form
//!
//! ```json
//! {
//!   "version": 1,
//!   "root": "/srv/source",
//!   "hash_mode": "blake3",
//!   "entries": {
//!     "photos/a.jpg": { "hash": "…", "size": 1024, "mtime_secs": 1700000000, "mtime_nanos": 0 }
//!   }
//! }
//! ```
//!
//! Entries are kept in a `BTreeMap`, so saving an unchanged cache reproduces
//! the file byte for byte.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entry::CacheEntry;
use crate::output::atomic::write_bytes_atomic;
use crate::scanner::HashMode;

/// Current on-disk format version.
pub const CACHE_VERSION: u32 = 1;

/// Errors that can occur while loading or saving a cache file.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache file could not be read or written.
    #[error("cache I/O error for {path}: {source}")]
    Io {
        /// Cache file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The cache file is not valid JSON of the expected shape.
    #[error("malformed cache file {path}: {source}")]
    Malformed {
        /// Cache file path
        path: PathBuf,
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// The cache file was written by an incompatible version.
    #[error("unsupported cache version {found} in {path} (expected {expected})")]
    UnsupportedVersion {
        /// Cache file path
        path: PathBuf,
        /// Version found in the file
        found: u32,
        /// Version this build reads
        expected: u32,
    },

    /// The cache file belongs to a different tree root.
    #[error("cache {path} was built for root {found}, not {expected}")]
    RootMismatch {
        /// Cache file path
        path: PathBuf,
        /// Root recorded in the file
        found: String,
        /// Root of the current run
        expected: String,
    },

    /// The cache file was built with a different hash mode.
    #[error("cache {path} uses hash mode {found}, not {expected}")]
    ModeMismatch {
        /// Cache file path
        path: PathBuf,
        /// Mode recorded in the file
        found: String,
        /// Mode of the current run
        expected: String,
    },

    /// Serialization failed while saving.
    #[error("failed to serialize cache: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Deserialize)]
struct CacheFile {
    version: u32,
    root: String,
    hash_mode: String,
    entries: BTreeMap<String, CacheEntry>,
}

#[derive(Serialize)]
struct CacheFileRef<'a> {
    version: u32,
    root: &'a str,
    hash_mode: &'a str,
    entries: &'a BTreeMap<String, CacheEntry>,
}

/// Persistent cache of content hashes for one tree.
#[derive(Debug)]
pub struct HashCache {
    root: String,
    hash_mode: String,
    entries: RwLock<BTreeMap<String, CacheEntry>>,
}

impl HashCache {
    /// Create an empty cache for the tree at `root`.
    #[must_use]
    pub fn new(root: &Path, mode: HashMode) -> Self {
        Self {
            root: root.to_string_lossy().into_owned(),
            hash_mode: mode.tag(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached hash for `path` if its entry matches `size` and `modified`.
    #[must_use]
    pub fn lookup(&self, path: &str, size: u64, modified: SystemTime) -> Option<String> {
        self.read()
            .get(path)
            .filter(|entry| entry.is_fresh(size, modified))
            .map(|entry| entry.hash.clone())
    }

    /// Insert or overwrite the entry for `path`.
    pub fn update(&self, path: &str, size: u64, modified: SystemTime, hash: String) {
        self.write()
            .insert(path.to_string(), CacheEntry::new(hash, size, modified));
    }

    /// Get the raw entry for `path`, fresh or not.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<CacheEntry> {
        self.read().get(path).cloned()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of all entries in path order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, CacheEntry)> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Drop entries whose path is not in `seen`. Returns how many were removed.
    pub fn retain_paths(&self, seen: &HashSet<String>) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|path, _| seen.contains(path));
        before - entries.len()
    }

    /// Open a persisted cache strictly.
    ///
    /// An absent file yields an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the file cannot be read, is malformed, or
    /// was built for another version, root or hash mode.
    pub fn open(path: &Path, root: &Path, mode: HashMode) -> CacheResult<Self> {
        let cache = Self::new(root, mode);

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No cache at {}, starting empty", path.display());
                return Ok(cache);
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let file: CacheFile =
            serde_json::from_str(&content).map_err(|source| CacheError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        if file.version != CACHE_VERSION {
            return Err(CacheError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: file.version,
                expected: CACHE_VERSION,
            });
        }
        if file.root != cache.root {
            return Err(CacheError::RootMismatch {
                path: path.to_path_buf(),
                found: file.root,
                expected: cache.root,
            });
        }
        if file.hash_mode != cache.hash_mode {
            return Err(CacheError::ModeMismatch {
                path: path.to_path_buf(),
                found: file.hash_mode,
                expected: cache.hash_mode,
            });
        }

        log::debug!(
            "Loaded {} cache entries from {}",
            file.entries.len(),
            path.display()
        );
        *cache.write() = file.entries;
        Ok(cache)
    }

    /// Load a persisted cache, falling back to an empty cache on any problem.
    ///
    /// Corruption never aborts a run: the problem is logged and the tree is
    /// simply rehashed.
    #[must_use]
    pub fn load(path: &Path, root: &Path, mode: HashMode) -> Self {
        match Self::open(path, root, mode) {
            Ok(cache) => cache,
            Err(e) => {
                log::warn!("Ignoring hash cache: {}", e);
                Self::new(root, mode)
            }
        }
    }

    /// Serialize the cache to its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Serialize`] if serialization fails.
    pub fn to_json(&self) -> CacheResult<String> {
        let entries = self.read();
        let file = CacheFileRef {
            version: CACHE_VERSION,
            root: &self.root,
            hash_mode: &self.hash_mode,
            entries: &*entries,
        };
        let mut json = serde_json::to_string_pretty(&file).map_err(CacheError::Serialize)?;
        json.push('\n');
        Ok(json)
    }

    /// Persist the cache atomically to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if serialization or the write fails. The
    /// previously persisted file is left intact on failure.
    pub fn save(&self, path: &Path) -> CacheResult<()> {
        let json = self.to_json()?;
        write_bytes_atomic(path, json.as_bytes()).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Saved {} cache entries to {}", self.len(), path.display());
        Ok(())
    }
}
