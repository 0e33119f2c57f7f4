//! Cache entry definitions.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A modification time with nanosecond precision, stored as seconds and
/// nanoseconds relative to the Unix epoch.
///
/// Times before the epoch have negative `secs` and a non-negative `nanos`
/// offset, so every `SystemTime` has exactly one representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModTime {
    /// Whole seconds since the Unix epoch
    #[serde(rename = "mtime_secs")]
    pub secs: i64,
    /// Sub-second nanoseconds (0..1_000_000_000)
    #[serde(rename = "mtime_nanos")]
    pub nanos: u32,
}

impl ModTime {
    /// Create a ModTime from raw parts.
    #[must_use]
    pub fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }
}

impl From<SystemTime> for ModTime {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::new(d.as_secs() as i64, d.subsec_nanos()),
            Err(e) => {
                let before = e.duration();
                let mut secs = -(before.as_secs() as i64);
                let mut nanos = before.subsec_nanos();
                if nanos > 0 {
                    secs -= 1;
                    nanos = 1_000_000_000 - nanos;
                }
                Self::new(secs, nanos)
            }
        }
    }
}

impl From<ModTime> for SystemTime {
    fn from(time: ModTime) -> Self {
        let nanos = Duration::from_nanos(u64::from(time.nanos));
        if time.secs >= 0 {
            UNIX_EPOCH + Duration::from_secs(time.secs as u64) + nanos
        } else {
            UNIX_EPOCH - Duration::from_secs(time.secs.unsigned_abs()) + nanos
        }
    }
}

/// A cached content hash together with the file state it was computed for.
///
/// The entry is only trusted while both `size` and `modified` still match
/// the live file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hex-encoded content hash
    pub hash: String,
    /// File size in bytes when hashed
    pub size: u64,
    /// Modification time when hashed
    #[serde(flatten)]
    pub modified: ModTime,
}

impl CacheEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(hash: String, size: u64, modified: SystemTime) -> Self {
        Self {
            hash,
            size,
            modified: modified.into(),
        }
    }

    /// Whether this entry describes a file with the given size and mtime.
    #[must_use]
    pub fn is_fresh(&self, size: u64, modified: SystemTime) -> bool {
        self.size == size && self.modified == ModTime::from(modified)
    }
}
