//! Tree comparison.
//!
//! - [`index`]: hash and path lookup for one tree
//! - [`diff`]: missing-file detection plus per-tree duplicate groups

pub mod diff;
pub mod index;

pub use diff::{
    compare, find_missing, CompareConfig, Comparison, MatchMode, MissingFile, MissingPolicy,
};
pub use index::TreeIndex;
