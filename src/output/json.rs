//! JSON run summary.
//!
//! `summary.json` records what a run did: per-tree counters, result sizes,
//! timing and whether it completed. It carries a timestamp and durations,
//! so unlike the CSV reports it differs between otherwise identical runs.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2024-01-01T00:00:00Z",
//!   "duration_ms": 1234,
//!   "interrupted": false,
//!   "missing_policy": "all",
//!   "match_mode": "content",
//!   "source": { "root": "/src", "files_scanned": 10, "cache_hits": 8, ... },
//!   "target": { "root": "/dst", ... },
//!   "missing_files": 2,
//!   "missing_bytes": 2048,
//!   "source_duplicate_groups": 1,
//!   "target_duplicate_groups": 0,
//!   "failures": 0
//! }
//! ```

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compare::{Comparison, MatchMode, MissingPolicy};
use crate::pipeline::{HashStats, TreeHashes};

/// Per-tree section of the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSummary {
    /// Canonical tree root
    pub root: String,
    /// Hashing counters
    #[serde(flatten)]
    pub stats: HashStats,
    /// Cache entries after the run
    pub cache_entries: usize,
    /// Entries dropped for paths no longer present
    pub cache_pruned: usize,
}

impl TreeSummary {
    /// Build a tree section from hashing results.
    #[must_use]
    pub fn new(root: &std::path::Path, hashes: &TreeHashes, cache_entries: usize, cache_pruned: usize) -> Self {
        Self {
            root: root.display().to_string(),
            stats: hashes.stats.clone(),
            cache_entries,
            cache_pruned,
        }
    }
}

/// Contents of `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// When the summary was produced
    pub generated_at: DateTime<Utc>,
    /// Wall-clock run time in milliseconds
    pub duration_ms: u64,
    /// Whether the run was cancelled
    pub interrupted: bool,
    /// Missing policy in effect
    pub missing_policy: MissingPolicy,
    /// Match mode in effect
    pub match_mode: MatchMode,
    /// Source tree section
    pub source: TreeSummary,
    /// Target tree section
    pub target: TreeSummary,
    /// Number of missing source files reported
    pub missing_files: usize,
    /// Total size of the missing files
    pub missing_bytes: u64,
    /// Duplicate groups in the source tree
    pub source_duplicate_groups: usize,
    /// Duplicate groups in the target tree
    pub target_duplicate_groups: usize,
    /// Files and directories that failed in either tree
    pub failures: usize,
}

impl RunSummary {
    /// Assemble a summary for a finished comparison.
    #[must_use]
    pub fn new(
        comparison: &Comparison,
        source: TreeSummary,
        target: TreeSummary,
        policy: MissingPolicy,
        match_mode: MatchMode,
        elapsed: Duration,
    ) -> Self {
        let failures = source.stats.failed + target.stats.failed;
        let interrupted = source.stats.interrupted || target.stats.interrupted;
        Self {
            generated_at: Utc::now(),
            duration_ms: elapsed.as_millis() as u64,
            interrupted,
            missing_policy: policy,
            match_mode,
            source,
            target,
            missing_files: comparison.missing.len(),
            missing_bytes: comparison.missing_bytes(),
            source_duplicate_groups: comparison.source_duplicates.len(),
            target_duplicate_groups: comparison.target_duplicates.len(),
            failures,
        }
    }

    /// Write pretty JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if serialization or writing fails.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writer.write_all(b"\n")
    }
}
