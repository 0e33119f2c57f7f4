//! Bounded hashing pool for one tree.
//!
//! # Overview
//!
//! The scanner runs on its own thread and pushes numbered records into a
//! bounded channel; a rayon pool drains the channel through `par_bridge`,
//! hashing each record via [`Hasher::hash_record`]. When the workers fall
//! behind, the channel fills and the scanner blocks until space frees up.
//!
//! Every record gets a sequence number from the scanner before it enters the
//! channel. Results are sorted back into that order once the pool is done,
//! so downstream grouping never depends on worker scheduling.
//!
//! Per-file errors never leave this module as errors: they become
//! [`FileFailure`] entries and the tree's remaining files keep hashing.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use rayon::iter::{ParallelBridge, ParallelIterator};

use crate::cache::HashCache;
use crate::progress::ProgressCallback;
use crate::scanner::path_utils::relative_key;
use crate::scanner::{FileRecord, HashedFile, Hasher, ScanError, Walker};

/// Records buffered per worker between the scanner and the pool.
const QUEUE_DEPTH_PER_WORKER: usize = 64;

/// Which tree a result or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeSide {
    /// The tree files should be copied from
    Source,
    /// The tree files should exist in
    Target,
}

impl std::fmt::Display for TreeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeSide::Source => write!(f, "source"),
            TreeSide::Target => write!(f, "target"),
        }
    }
}

/// A file or directory that could not be scanned or hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    /// Tree the path belongs to
    pub tree: TreeSide,
    /// Path relative to the tree root (or absolute if outside it)
    pub path: String,
    /// Human-readable error
    pub error: String,
}

/// Configuration for [`hash_tree`].
#[derive(Clone)]
pub struct HashPoolConfig {
    /// Number of hashing workers.
    pub workers: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for HashPoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashPoolConfig")
            .field("workers", &self.workers)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for HashPoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl HashPoolConfig {
    /// Set the number of workers (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Number of available execution units, or 1 if unknown.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Statistics from hashing one tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashStats {
    /// Regular files produced by the scanner
    pub files_scanned: usize,
    /// Files with a hash (cached or computed)
    pub files_hashed: usize,
    /// Hashes served from the cache
    pub cache_hits: usize,
    /// Hashes computed from file content
    pub cache_misses: usize,
    /// Total size of the hashed files
    pub bytes_total: u64,
    /// Bytes actually read from disk
    pub bytes_read: u64,
    /// Files or directories that failed
    pub failed: usize,
    /// Directory-level scan errors among the failures
    pub scan_errors: usize,
    /// Records left unprocessed because of shutdown
    pub skipped: usize,
    /// Whether hashing stopped early
    pub interrupted: bool,
}

/// Everything hashing produced for one tree.
#[derive(Debug, Clone)]
pub struct TreeHashes {
    /// Which tree this is
    pub side: TreeSide,
    /// Hashed files in scanner order
    pub files: Vec<HashedFile>,
    /// Failures in scanner order
    pub failures: Vec<FileFailure>,
    /// Counters
    pub stats: HashStats,
    seen: HashSet<String>,
}

impl TreeHashes {
    /// Relative paths of every regular file the scanner produced, whether or
    /// not hashing succeeded.
    #[must_use]
    pub fn seen_paths(&self) -> &HashSet<String> {
        &self.seen
    }

    /// Whether the scan covered the whole tree: not interrupted and no
    /// directory was skipped.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.stats.interrupted && self.stats.scan_errors == 0
    }
}

enum Outcome {
    Hashed(HashedFile),
    HashFailed(FileRecord, String),
    ScanFailed(String, String),
    Skipped(Option<String>),
}

/// Hash every file `walker` yields using a bounded worker pool.
///
/// `cache` is consulted and updated by the workers; it is only ever touched
/// by this tree's pipeline.
#[must_use]
pub fn hash_tree(
    side: TreeSide,
    walker: &Walker,
    hasher: &Hasher,
    cache: &HashCache,
    config: &HashPoolConfig,
) -> TreeHashes {
    let workers = config.workers.max(1);
    let root = walker.root();
    let bytes_before = hasher.bytes_read();

    log::info!(
        "Hashing {} tree {} with {} workers",
        side,
        root.display(),
        workers
    );

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start(&format!("hashing {side}"), 0);
    }

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(move |i| format!("hash-{side}-{i}"))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            log::warn!(
                "Failed to create hashing pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            None
        }
    };

    let (tx, rx) = mpsc::sync_channel::<(usize, Result<FileRecord, ScanError>)>(
        workers * QUEUE_DEPTH_PER_WORKER,
    );
    let processed = AtomicUsize::new(0);

    let mut outcomes: Vec<(usize, Outcome)> = std::thread::scope(|scope| {
        scope.spawn(move || {
            for (seq, item) in walker.walk().enumerate() {
                if tx.send((seq, item)).is_err() {
                    break;
                }
            }
        });

        let work = || {
            rx.into_iter()
                .par_bridge()
                .map(|(seq, item)| {
                    let outcome = process_item(root, seq, item, hasher, cache, config);
                    if let Some(ref callback) = config.progress_callback {
                        let n = processed.fetch_add(1, Ordering::Relaxed) + 1;
                        if let Outcome::Hashed(ref file) = outcome {
                            callback.on_progress(n, file.path());
                            callback.on_item_completed(file.record.size);
                        }
                    }
                    (seq, outcome)
                })
                .collect()
        };

        match pool {
            Some(ref pool) => pool.install(work),
            None => work(),
        }
    });

    outcomes.sort_by_key(|(seq, _)| *seq);

    let mut stats = HashStats::default();
    let mut files = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    let mut seen = HashSet::with_capacity(outcomes.len());

    for (_, outcome) in outcomes {
        match outcome {
            Outcome::Hashed(file) => {
                stats.files_scanned += 1;
                stats.files_hashed += 1;
                stats.bytes_total += file.record.size;
                if file.cache_hit {
                    stats.cache_hits += 1;
                } else {
                    stats.cache_misses += 1;
                }
                seen.insert(file.record.path.clone());
                files.push(file);
            }
            Outcome::HashFailed(record, error) => {
                log::warn!("Failed to hash {} file {}: {}", side, record.path, error);
                stats.files_scanned += 1;
                stats.failed += 1;
                seen.insert(record.path.clone());
                failures.push(FileFailure {
                    tree: side,
                    path: record.path,
                    error,
                });
            }
            Outcome::ScanFailed(path, error) => {
                log::warn!("Skipped {} path {}: {}", side, path, error);
                stats.failed += 1;
                stats.scan_errors += 1;
                failures.push(FileFailure {
                    tree: side,
                    path,
                    error,
                });
            }
            Outcome::Skipped(path) => {
                stats.skipped += 1;
                if let Some(path) = path {
                    stats.files_scanned += 1;
                    seen.insert(path);
                }
            }
        }
    }

    stats.bytes_read = hasher.bytes_read().saturating_sub(bytes_before);
    stats.interrupted = config.is_shutdown_requested();

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end(&format!("hashing {side}"));
    }

    if stats.interrupted {
        log::warn!(
            "Hashing {} interrupted after {} files ({} skipped)",
            side,
            stats.files_hashed,
            stats.skipped
        );
    } else {
        log::info!(
            "Hashed {} {} files: {} cache hits, {} misses, {} failed",
            stats.files_hashed,
            side,
            stats.cache_hits,
            stats.cache_misses,
            stats.failed
        );
    }

    TreeHashes {
        side,
        files,
        failures,
        stats,
        seen,
    }
}

fn process_item(
    root: &Path,
    seq: usize,
    item: Result<FileRecord, ScanError>,
    hasher: &Hasher,
    cache: &HashCache,
    config: &HashPoolConfig,
) -> Outcome {
    let record = match item {
        Ok(record) => record,
        Err(e) => {
            let path = relative_key(root, e.path()).unwrap_or_else(|_| e.path().display().to_string());
            return Outcome::ScanFailed(path, e.to_string());
        }
    };

    if config.is_shutdown_requested() {
        return Outcome::Skipped(Some(record.path));
    }

    match hasher.hash_record(root, &record, cache) {
        Ok((hash, cache_hit)) => Outcome::Hashed(HashedFile::new(seq, record, hash, cache_hit)),
        Err(_) if config.is_shutdown_requested() => Outcome::Skipped(Some(record.path)),
        Err(e) => Outcome::HashFailed(record, e.to_string()),
    }
}
