//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a tree and
//! producing one [`FileRecord`] per regular file. It uses [`jwalk`] for
//! parallel directory reads while yielding entries in a deterministic,
//! name-sorted depth-first order.
//!
//! # Features
//!
//! - Regular files only: symlinks are never followed, special files skipped
//! - Unreadable directories are reported as errors and skipped, the walk goes on
//! - Gitignore-style matching of configured patterns via the `ignore` crate
//! - Extension allow/deny lists and hidden-name skipping
//! - Graceful shutdown via atomic flag
//!
//! Each call to [`Walker::walk`] re-walks the tree from scratch.
//!
//! # Example
//!
//! ```no_run
//! use hashsync::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/srv/archive"), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::path_utils::{is_hidden_name, normalize_extension, relative_key};
use super::{FileRecord, ScanError, WalkerConfig};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Normalized include extensions
    include: Vec<String>,
    /// Normalized exclude extensions
    exclude: Vec<String>,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to scan
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        let normalize = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|e| normalize_extension(e))
                .filter(|e| !e.is_empty())
                .collect()
        };
        Self {
            root: path.to_path_buf(),
            include: normalize(&config.include_extensions),
            exclude: normalize(&config.exclude_extensions),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The root this walker scans.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that the root exists, is a directory and can be listed.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] describing why the tree is inaccessible.
    pub fn validate_root(&self) -> Result<(), ScanError> {
        let metadata = std::fs::metadata(&self.root).map_err(|e| self.io_error(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        std::fs::read_dir(&self.root).map_err(|e| self.io_error(&self.root, e))?;
        Ok(())
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build the ignore matcher from the configured patterns only.
    ///
    /// `.gitignore` files inside the tree are plain data and never consulted.
    fn build_gitignore(&self) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(&self.root);

        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Check a relative key against the ignore matcher, including parent directories.
    fn should_ignore(key: &str, gitignore: &Option<Gitignore>) -> bool {
        gitignore
            .as_ref()
            .is_some_and(|gi| gi.matched_path_or_any_parents(key, false).is_ignore())
    }

    /// Check a file name against the extension filters.
    fn passes_extension_filter(&self, path: &Path) -> bool {
        if self.include.is_empty() && self.exclude.is_empty() {
            return true;
        }

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(normalize_extension)
            .unwrap_or_default();

        if !self.include.is_empty() && !self.include.contains(&extension) {
            return false;
        }
        !self.exclude.contains(&extension)
    }

    /// Walk the directory tree, yielding file records.
    ///
    /// Returns an iterator over [`FileRecord`] results. Errors (unreadable
    /// directories, vanished files) are yielded as [`ScanError`] values
    /// rather than stopping iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileRecord, ScanError>> + '_ {
        let gitignore = self.build_gitignore();
        let skip_hidden = self.config.skip_hidden;

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .process_read_dir(move |depth, _path, _read_dir_state, children| {
                // depth is None for the listing holding the root itself
                if skip_hidden && depth.is_some() {
                    children.retain(|child| {
                        child.as_ref().map_or(true, |entry| {
                            !entry.file_name().to_str().is_some_and(is_hidden_name)
                        })
                    });
                }
                // Sort children for deterministic output
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            match entry_result {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }

                    let path = entry.path();
                    if file_type.is_symlink() {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }

                    let metadata = match std::fs::symlink_metadata(&path) {
                        Ok(m) => m,
                        Err(e) => return Some(Err(self.io_error(&path, e))),
                    };

                    // Sockets, FIFOs, devices
                    if !metadata.is_file() {
                        log::trace!("Skipping special file: {}", path.display());
                        return None;
                    }

                    self.process_file_entry(&path, &metadata, &gitignore)
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    Some(Err(self.handle_jwalk_error(path, e)))
                }
            }
        })
    }

    /// Apply filters and build a [`FileRecord`] for a regular file.
    fn process_file_entry(
        &self,
        path: &Path,
        metadata: &Metadata,
        gitignore: &Option<Gitignore>,
    ) -> Option<Result<FileRecord, ScanError>> {
        let key = match relative_key(&self.root, path) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("{}", e);
                return Some(Err(e));
            }
        };

        if Self::should_ignore(&key, gitignore) {
            log::trace!("Ignoring file: {}", key);
            return None;
        }

        if !self.passes_extension_filter(path) {
            log::trace!("Skipping file due to extension filter: {}", key);
            return None;
        }

        let size = metadata.len();
        if size == 0 && self.config.skip_empty {
            log::debug!("Skipping empty file: {}", key);
            return None;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        Some(Ok(FileRecord {
            path: key,
            size,
            modified,
        }))
    }

    /// Map an I/O error to a [`ScanError`].
    fn io_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                }
            }
        }
    }

    /// Map a jwalk error (typically an unreadable directory) to a [`ScanError`].
    fn handle_jwalk_error(&self, path: PathBuf, error: jwalk::Error) -> ScanError {
        if let Some(kind) = error.io_error().map(std::io::Error::kind) {
            if kind == std::io::ErrorKind::PermissionDenied {
                log::warn!("Skipping unreadable directory: {}", path.display());
                return ScanError::PermissionDenied(path);
            }
        }
        log::warn!("Walker error for {}: {}", path.display(), error);
        ScanError::Io {
            path,
            source: std::io::Error::other(error.to_string()),
        }
    }
}
