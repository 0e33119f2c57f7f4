//! Per-tree lookup index.
//!
//! A [`TreeIndex`] is derived from one run's hash results and never from
//! cache contents directly. It answers two questions in O(1): does this
//! content exist in the tree, and does this relative path exist in the tree.

use std::collections::{HashMap, HashSet};

use crate::scanner::path_utils::match_key;
use crate::scanner::{Hash, HashedFile};

/// Content hash to paths mapping for one tree.
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    by_hash: HashMap<Hash, Vec<String>>,
    paths: HashSet<String>,
    file_count: usize,
}

impl TreeIndex {
    /// Build an index from a tree's hash results.
    ///
    /// Paths under each hash keep scanner order.
    #[must_use]
    pub fn build(files: &[HashedFile]) -> Self {
        let mut ordered: Vec<&HashedFile> = files.iter().collect();
        ordered.sort_by_key(|f| f.seq);

        let mut by_hash: HashMap<Hash, Vec<String>> = HashMap::with_capacity(files.len());
        let mut paths = HashSet::with_capacity(files.len());
        for file in ordered {
            by_hash
                .entry(file.hash)
                .or_default()
                .push(file.path().to_string());
            paths.insert(match_key(file.path()));
        }

        Self {
            by_hash,
            paths,
            file_count: files.len(),
        }
    }

    /// Whether any file in the tree has this content.
    #[must_use]
    pub fn contains_hash(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Paths sharing this content, in scanner order.
    #[must_use]
    pub fn paths_for(&self, hash: &Hash) -> Option<&[String]> {
        self.by_hash.get(hash).map(Vec::as_slice)
    }

    /// Whether a file exists at this relative path.
    ///
    /// Paths are compared after Unicode NFC normalization, so the same name
    /// written by different platforms still matches.
    #[must_use]
    pub fn contains_path(&self, path: &str) -> bool {
        self.paths.contains(&match_key(path))
    }

    /// Number of indexed files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.file_count
    }

    /// Whether the index holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file_count == 0
    }

    /// Number of distinct content hashes.
    #[must_use]
    pub fn hash_count(&self) -> usize {
        self.by_hash.len()
    }
}
