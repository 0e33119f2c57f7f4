//! Content-duplicate grouping within a single tree.
//!
//! # Overview
//!
//! Files are grouped by content hash; every hash shared by two or more
//! paths becomes a [`DuplicateGroup`]. Groups and their members follow
//! scanner order, so repeated runs over an unchanged tree produce the same
//! groups in the same order.
//!
//! # Example
//!
//! ```
//! use hashsync::duplicates::find_duplicate_groups;
//! use hashsync::scanner::{FileRecord, HashedFile};
//! use std::time::SystemTime;
//!
//! let now = SystemTime::now();
//! let files = vec![
//!     HashedFile::new(0, FileRecord::new("a.txt", 1, now), [1u8; 32], false),
//!     HashedFile::new(1, FileRecord::new("b.txt", 1, now), [1u8; 32], false),
//!     HashedFile::new(2, FileRecord::new("c.txt", 1, now), [2u8; 32], false),
//! ];
//!
//! let (groups, stats) = find_duplicate_groups(&files);
//!
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].paths, vec!["a.txt", "b.txt"]);
//! assert_eq!(stats.unique_files, 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::scanner::{Hash, HashedFile};

/// Files within one tree sharing a content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// BLAKE3 hash of the shared content (32 bytes)
    pub hash: Hash,
    /// File size in bytes, shared by every member
    pub size: u64,
    /// Relative paths, in scanner order
    pub paths: Vec<String>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    ///
    /// # Arguments
    ///
    /// * `hash` - BLAKE3 content hash
    /// * `size` - File size in bytes
    /// * `paths` - Member paths in scanner order
    #[must_use]
    pub fn new(hash: Hash, size: u64, paths: Vec<String>) -> Self {
        Self { hash, size, paths }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of redundant copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// Space taken by the redundant copies.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Hash as hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        crate::scanner::hash_to_hex(&self.hash)
    }
}

/// Statistics from duplicate grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of hashed files considered
    pub total_files: usize,
    /// Number of distinct content hashes
    pub unique_hashes: usize,
    /// Files whose content appears nowhere else in the tree
    pub unique_files: usize,
    /// Files that belong to a duplicate group
    pub duplicate_files: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Bytes taken by redundant copies
    pub wasted_space: u64,
}

/// Group a tree's hashed files by content.
///
/// Only hashes shared by two or more files produce a group. Groups are
/// ordered by the scanner position of their first member; members are
/// ordered by scanner position with the relative path as a tie-break.
///
/// # Performance
///
/// - Time complexity: O(n log n) for the ordering, O(n) for grouping
/// - No file I/O is performed
#[must_use]
pub fn find_duplicate_groups(files: &[HashedFile]) -> (Vec<DuplicateGroup>, GroupingStats) {
    let mut ordered: Vec<&HashedFile> = files.iter().collect();
    ordered.sort_by(|a, b| a.seq.cmp(&b.seq).then_with(|| a.path().cmp(b.path())));

    // Buckets in order of first appearance
    let mut slots: HashMap<Hash, usize> = HashMap::with_capacity(ordered.len());
    let mut buckets: Vec<Vec<&HashedFile>> = Vec::new();
    for file in ordered {
        let slot = *slots.entry(file.hash).or_insert_with(|| {
            buckets.push(Vec::new());
            buckets.len() - 1
        });
        buckets[slot].push(file);
    }

    let mut stats = GroupingStats {
        total_files: files.len(),
        unique_hashes: buckets.len(),
        ..Default::default()
    };

    let groups: Vec<DuplicateGroup> = buckets
        .into_iter()
        .filter_map(|members| {
            if members.len() < 2 {
                stats.unique_files += members.len();
                return None;
            }
            let first = members[0];
            let group = DuplicateGroup::new(
                first.hash,
                first.record.size,
                members.iter().map(|f| f.path().to_string()).collect(),
            );
            log::debug!(
                "Duplicate group {}: {} files of {} bytes",
                &group.hash_hex()[..16],
                group.len(),
                group.size
            );
            stats.duplicate_files += group.len();
            stats.duplicate_groups += 1;
            stats.wasted_space += group.wasted_space();
            Some(group)
        })
        .collect();

    (groups, stats)
}
