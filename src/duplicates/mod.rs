//! Duplicate detection module.
//!
//! Groups each tree's hashed files by content; see [`groups`].

pub mod groups;

pub use groups::{find_duplicate_groups, DuplicateGroup, GroupingStats};
