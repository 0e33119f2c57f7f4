//! Hashing pipeline and run orchestration.
//!
//! - [`hashing`]: scanner thread feeding a bounded rayon worker pool
//! - [`runner`]: loads caches, hashes both trees, compares, writes reports

pub mod hashing;
pub mod runner;

pub use hashing::{
    default_workers, hash_tree, FileFailure, HashPoolConfig, HashStats, TreeHashes, TreeSide,
};
pub use runner::{RunOutcome, SyncRunner};
