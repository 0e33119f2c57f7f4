//! End-to-end comparison run.
//!
//! [`SyncRunner::run`] drives one run:
//!
//! 1. Check both tree roots (fatal if either is unusable)
//! 2. Load each tree's cache; a missing or unusable cache starts empty
//! 3. Hash the source tree, then the target tree
//! 4. Prune cache entries for files that are gone (complete scans only)
//! 5. Compare, once both trees are fully hashed
//! 6. Write reports and save both caches
//!
//! If the run is cancelled during hashing, both caches are still saved so
//! the next run reuses the work, but no reports are written: a partial
//! target tree would make present files look missing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::HashCache;
use crate::compare::{compare, Comparison};
use crate::config::RunConfig;
use crate::error::SyncError;
use crate::output::{ReportPaths, ReportWriter, RunSummary, TreeSummary};
use crate::progress::ProgressCallback;
use crate::scanner::{Hasher, ScanError, Walker};

use super::hashing::{hash_tree, FileFailure, HashPoolConfig, TreeHashes, TreeSide};

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Whether the run was cancelled before comparing
    pub interrupted: bool,
    /// Comparison results (empty when interrupted)
    pub comparison: Comparison,
    /// Failures from both trees, source first
    pub failures: Vec<FileFailure>,
    /// Run summary (absent when interrupted)
    pub summary: Option<RunSummary>,
    /// Where artifacts were written
    pub paths: ReportPaths,
}

/// Runs a full source/target comparison.
pub struct SyncRunner {
    config: RunConfig,
    shutdown_flag: Arc<AtomicBool>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for SyncRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRunner")
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl SyncRunner {
    /// Create a runner for the given configuration.
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            progress_callback: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = flag;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// The configuration this runner uses.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the run.
    ///
    /// # Errors
    ///
    /// - [`SyncError::TreeAccess`] if a tree root is missing or unreadable
    /// - [`SyncError::Report`] if any artifact could not be written
    pub fn run(&self) -> Result<RunOutcome, SyncError> {
        let started = Instant::now();
        let config = &self.config;

        let source_root = open_tree(TreeSide::Source, &config.source_dir)?;
        let target_root = open_tree(TreeSide::Target, &config.target_dir)?;
        if source_root == target_root {
            log::warn!(
                "Source and target are the same directory: {}",
                source_root.display()
            );
        }

        let writer = ReportWriter::new(&config.output_dir, &config.cache_dir);
        let paths = writer.paths().clone();

        let source_cache = HashCache::load(&paths.source_cache, &source_root, config.hash_mode);
        let target_cache = HashCache::load(&paths.target_cache, &target_root, config.hash_mode);

        let source = self.hash_side(TreeSide::Source, &source_root, &source_cache);
        let target = if self.is_shutdown_requested() {
            None
        } else {
            Some(self.hash_side(TreeSide::Target, &target_root, &target_cache))
        };

        let target = match target {
            Some(target) if !self.is_shutdown_requested() => target,
            unfinished => {
                return Ok(interrupted_outcome(
                    &writer,
                    &source_cache,
                    &target_cache,
                    source,
                    unfinished,
                ));
            }
        };

        let source_pruned = self.prune(&source, &source_cache);
        let target_pruned = self.prune(&target, &target_cache);

        let comparison = compare(&source.files, &target.files, &config.compare);

        let summary = RunSummary::new(
            &comparison,
            TreeSummary::new(&source_root, &source, source_cache.len(), source_pruned),
            TreeSummary::new(&target_root, &target, target_cache.len(), target_pruned),
            config.compare.missing_policy,
            config.compare.match_mode,
            started.elapsed(),
        );

        let mut failures = source.failures;
        failures.extend(target.failures);

        writer.write(
            &comparison,
            &failures,
            &summary,
            &source_cache,
            &target_cache,
        )?;

        Ok(RunOutcome {
            interrupted: false,
            comparison,
            failures,
            summary: Some(summary),
            paths,
        })
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    fn hash_side(&self, side: TreeSide, root: &Path, cache: &HashCache) -> TreeHashes {
        let config = &self.config;
        let walker = Walker::new(root, config.walker.clone())
            .with_shutdown_flag(Arc::clone(&self.shutdown_flag));
        let hasher = Hasher::new()
            .with_mode(config.hash_mode)
            .with_mmap(config.use_mmap)
            .with_shutdown_flag(Arc::clone(&self.shutdown_flag));

        let mut pool = HashPoolConfig::default()
            .with_workers(config.worker_count)
            .with_shutdown_flag(Arc::clone(&self.shutdown_flag));
        if let Some(ref callback) = self.progress_callback {
            pool = pool.with_progress_callback(Arc::clone(callback));
        }

        hash_tree(side, &walker, &hasher, cache, &pool)
    }

    fn prune(&self, hashes: &TreeHashes, cache: &HashCache) -> usize {
        if !self.config.prune_cache {
            return 0;
        }
        if !hashes.is_complete() {
            log::debug!(
                "Not pruning {} cache: scan did not cover the whole tree",
                hashes.side
            );
            return 0;
        }
        let removed = cache.retain_paths(hashes.seen_paths());
        if removed > 0 {
            log::info!("Pruned {} stale {} cache entries", removed, hashes.side);
        }
        removed
    }
}

/// Save what was hashed so far; no comparison, no reports.
fn interrupted_outcome(
    writer: &ReportWriter,
    source_cache: &HashCache,
    target_cache: &HashCache,
    source: TreeHashes,
    target: Option<TreeHashes>,
) -> RunOutcome {
    log::warn!("Run interrupted; saving caches without writing reports");
    if let Err(e) = writer.save_caches(source_cache, target_cache) {
        log::error!("{e}");
    }

    let mut failures = source.failures;
    if let Some(target) = target {
        failures.extend(target.failures);
    }

    RunOutcome {
        interrupted: true,
        comparison: Comparison::default(),
        failures,
        summary: None,
        paths: writer.paths().clone(),
    }
}

/// Validate a tree root and return its canonical form.
fn open_tree(side: TreeSide, root: &Path) -> Result<PathBuf, SyncError> {
    Walker::new(root, Default::default())
        .validate_root()
        .map_err(|source| SyncError::TreeAccess { side, source })?;

    std::fs::canonicalize(root).map_err(|e| SyncError::TreeAccess {
        side,
        source: ScanError::Io {
            path: root.to_path_buf(),
            source: e,
        },
    })
}
