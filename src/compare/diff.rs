//! Source-versus-target comparison.
//!
//! # Algorithm
//!
//! 1. Build a [`TreeIndex`] over the target tree's hash results.
//! 2. Walk the source results in scanner order; a file is missing when its
//!    hash (or, in [`MatchMode::Path`], its relative path) is absent from the
//!    target index. One lookup per file keeps this O(S + T).
//! 3. Group each tree's own results by hash to find duplicate groups.
//!
//! Failed files never reach this module: the pipeline keeps them in a
//! separate failures list, so they are neither present nor missing.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::index::TreeIndex;
use crate::duplicates::{find_duplicate_groups, DuplicateGroup, GroupingStats};
use crate::scanner::{Hash, HashedFile};

/// Which missing source files are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingPolicy {
    /// Every source path whose content is absent from the target.
    #[default]
    #[serde(rename = "all", alias = "all_paths")]
    AllPaths,
    /// Only the first source path (scanner order) per absent hash.
    #[serde(rename = "one_per_group")]
    OnePerGroup,
}

impl std::fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingPolicy::AllPaths => write!(f, "all"),
            MissingPolicy::OnePerGroup => write!(f, "one_per_group"),
        }
    }
}

/// What makes a source file "present" in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Identical content anywhere in the target tree.
    #[default]
    Content,
    /// Any file at the same relative path, regardless of content.
    Path,
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::Content => write!(f, "content"),
            MatchMode::Path => write!(f, "path"),
        }
    }
}

/// Comparison settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareConfig {
    /// Which missing files are reported
    pub missing_policy: MissingPolicy,
    /// How presence in the target is decided
    pub match_mode: MatchMode,
}

impl CompareConfig {
    /// Set the missing policy.
    #[must_use]
    pub fn with_missing_policy(mut self, policy: MissingPolicy) -> Self {
        self.missing_policy = policy;
        self
    }

    /// Set the match mode.
    #[must_use]
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }
}

/// A source file with no counterpart in the target tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingFile {
    /// Path relative to the source root
    pub path: String,
    /// Content hash
    pub hash: Hash,
    /// File size in bytes
    pub size: u64,
}

impl MissingFile {
    /// Hash as hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        crate::scanner::hash_to_hex(&self.hash)
    }
}

/// Result of comparing two trees.
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    /// Missing source files, in scanner order
    pub missing: Vec<MissingFile>,
    /// Duplicate groups within the source tree
    pub source_duplicates: Vec<DuplicateGroup>,
    /// Duplicate groups within the target tree
    pub target_duplicates: Vec<DuplicateGroup>,
    /// Grouping statistics for the source tree
    pub source_stats: GroupingStats,
    /// Grouping statistics for the target tree
    pub target_stats: GroupingStats,
}

impl Comparison {
    /// Total bytes of the missing files.
    #[must_use]
    pub fn missing_bytes(&self) -> u64 {
        self.missing.iter().map(|m| m.size).sum()
    }
}

/// Compare source results against target results.
///
/// Both slices must hold complete results for their tree; partial target
/// results would produce false "missing" entries.
#[must_use]
pub fn compare(source: &[HashedFile], target: &[HashedFile], config: &CompareConfig) -> Comparison {
    let target_index = TreeIndex::build(target);
    let missing = find_missing(source, &target_index, config);

    let (source_duplicates, source_stats) = find_duplicate_groups(source);
    let (target_duplicates, target_stats) = find_duplicate_groups(target);

    log::info!(
        "Compared {} source files against {} target files: {} missing, {} source / {} target duplicate groups",
        source.len(),
        target.len(),
        missing.len(),
        source_duplicates.len(),
        target_duplicates.len()
    );

    Comparison {
        missing,
        source_duplicates,
        target_duplicates,
        source_stats,
        target_stats,
    }
}

/// Source files absent from `target`, in scanner order.
#[must_use]
pub fn find_missing(
    source: &[HashedFile],
    target: &TreeIndex,
    config: &CompareConfig,
) -> Vec<MissingFile> {
    let mut ordered: Vec<&HashedFile> = source.iter().collect();
    ordered.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.path().cmp(b.path())));

    let mut reported: HashSet<Hash> = HashSet::new();
    let mut missing = Vec::new();

    for file in ordered {
        let present = match config.match_mode {
            MatchMode::Content => target.contains_hash(&file.hash),
            MatchMode::Path => target.contains_path(file.path()),
        };
        if present {
            continue;
        }
        if config.missing_policy == MissingPolicy::OnePerGroup && !reported.insert(file.hash) {
            log::trace!("Missing duplicate suppressed: {}", file.path());
            continue;
        }
        log::trace!("Missing: {}", file.path());
        missing.push(MissingFile {
            path: file.path().to_string(),
            hash: file.hash,
            size: file.record.size,
        });
    }

    missing
}
