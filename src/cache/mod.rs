//! Hash caching module.
//!
//! This module provides persistent storage for file hashes so that unchanged
//! files are not re-read on every run. There is one cache per tree.
//!
//! # Architecture
//!
//! * [`store`]: The in-memory map, JSON persistence and atomic saving.
//! * [`entry`]: The data model stored per path and its freshness check.
//!
//! # Cache Invalidation
//!
//! Entries are keyed by the file's path relative to the tree root and
//! validated by:
//! * File size
//! * Modification time (nanosecond precision)
//!
//! If either differs from the live file, the entry is stale and the file is
//! re-hashed. A whole cache file is discarded if it was built for another
//! root or hash mode, or cannot be parsed.

pub mod entry;
pub mod store;

pub use entry::{CacheEntry, ModTime};
pub use store::{CacheError, CacheResult, HashCache, CACHE_VERSION};
