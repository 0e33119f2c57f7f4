//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! This module provides the [`Hasher`] struct for computing BLAKE3 hashes
//! of file contents without loading whole files into memory:
//!
//! - Small files are streamed through a fixed-size buffer
//! - Files above the mmap threshold are memory-mapped and hashed with rayon,
//!   one chunk at a time so a shutdown request is noticed mid-file
//! - [`HashMode::Sampled`] hashes only the head and tail of very large files
//!
//! [`Hasher::hash_record`] is the cache-aware entry point: it consults a
//! [`HashCache`] first and only reads file bytes on a miss.
//!
//! # Example
//!
//! ```no_run
//! use hashsync::scanner::{hash_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let hash = hasher.full_hash(Path::new("Cargo.toml")).unwrap();
//! println!("{}", hash_to_hex(&hash));
//! ```

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use super::path_utils::resolve_key;
use super::{FileRecord, HashError};
use crate::cache::HashCache;

/// A 256-bit BLAKE3 content hash.
pub type Hash = [u8; 32];

/// Default read buffer size (64 KiB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Files at or above this size are memory-mapped when mmap is enabled.
const DEFAULT_MMAP_THRESHOLD: u64 = 16 * 1024 * 1024;

/// Bytes of a mapped file hashed between shutdown checks (4 MiB).
const MMAP_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// How much of a file's content goes into its hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum HashMode {
    /// Hash every byte.
    #[default]
    Full,
    /// For files larger than `threshold`, hash the first and last
    /// `sample_size` bytes plus the file length.
    Sampled {
        /// Files above this size are sampled
        threshold: u64,
        /// Bytes taken from each end
        sample_size: u64,
    },
}

impl HashMode {
    /// Stable tag recorded in cache files so caches built under a different
    /// mode are never reused.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Self::Full => "blake3".to_string(),
            Self::Sampled {
                threshold,
                sample_size,
            } => format!("blake3-sampled-{threshold}-{sample_size}"),
        }
    }
}

/// Streaming BLAKE3 hasher.
///
/// Counts every file and byte it actually reads, so callers can verify that
/// cache hits never touch file content.
#[derive(Debug)]
pub struct Hasher {
    buffer_size: usize,
    use_mmap: bool,
    mmap_threshold: u64,
    mmap_chunk_size: usize,
    mode: HashMode,
    shutdown_flag: Option<Arc<AtomicBool>>,
    files_read: AtomicUsize,
    bytes_read: AtomicU64,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with full-content hashing and mmap enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: BUFFER_SIZE,
            use_mmap: true,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
            mmap_chunk_size: MMAP_CHUNK_SIZE,
            mode: HashMode::Full,
            shutdown_flag: None,
            files_read: AtomicUsize::new(0),
            bytes_read: AtomicU64::new(0),
        }
    }

    /// Enable or disable memory-mapped hashing of large files.
    #[must_use]
    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.use_mmap = enabled;
        self
    }

    /// Set the size at which files are memory-mapped.
    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    /// Set the read buffer size (minimum 4 KiB).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096);
        self
    }

    /// Set the hash mode.
    #[must_use]
    pub fn with_mode(mut self, mode: HashMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the shutdown flag; reads of a single file stop early when it is raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The configured hash mode.
    #[must_use]
    pub fn mode(&self) -> HashMode {
        self.mode
    }

    /// Number of files whose content has been read.
    #[must_use]
    pub fn files_read(&self) -> usize {
        self.files_read.load(Ordering::Relaxed)
    }

    /// Number of content bytes read.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Hash the file behind `record`, consulting `cache` first.
    ///
    /// Returns the hash and whether it came from the cache. On a miss the
    /// file is read, hashed and the cache entry refreshed with the record's
    /// size and modification time.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read. The cache
    /// is left untouched in that case.
    pub fn hash_record(
        &self,
        root: &Path,
        record: &FileRecord,
        cache: &HashCache,
    ) -> Result<(Hash, bool), HashError> {
        if let Some(cached) = cache.lookup(&record.path, record.size, record.modified) {
            match hex_to_hash(&cached) {
                Some(hash) => {
                    log::trace!("Cache hit: {}", record.path);
                    return Ok((hash, true));
                }
                None => log::debug!("Ignoring malformed cached hash for {}", record.path),
            }
        }

        log::trace!("Cache miss: {}", record.path);
        let path = resolve_key(root, &record.path);
        let hash = self.hash_file(&path)?;
        cache.update(
            &record.path,
            record.size,
            record.modified,
            hash_to_hex(&hash),
        );
        Ok((hash, false))
    }

    /// Hash a file according to the configured [`HashMode`].
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
        match self.mode {
            HashMode::Full => self.full_hash(path),
            HashMode::Sampled {
                threshold,
                sample_size,
            } => {
                let size = std::fs::metadata(path)
                    .map_err(|e| HashError::from_io(path.to_path_buf(), e))?
                    .len();
                if size <= threshold || sample_size.saturating_mul(2) >= size {
                    self.full_hash(path)
                } else {
                    self.sampled_hash(path, size, sample_size)
                }
            }
        }
    }

    /// Hash the entire content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let io_err = |e: io::Error| HashError::from_io(path.to_path_buf(), e);

        let mut file = File::open(path).map_err(io_err)?;
        let size = file.metadata().map_err(io_err)?.len();
        self.files_read.fetch_add(1, Ordering::Relaxed);

        let mut hasher = blake3::Hasher::new();

        if self.use_mmap && size >= self.mmap_threshold {
            log::trace!("Hashing via mmap: {}", path.display());
            // SAFETY: the mapping is read-only and dropped before returning.
            // A file truncated by another process while mapped can fault.
            let mmap = unsafe { Mmap::map(&file) }.map_err(io_err)?;
            for chunk in mmap.chunks(self.mmap_chunk_size) {
                if self.is_shutdown_requested() {
                    return Err(io_err(interrupted()));
                }
                hasher.update_rayon(chunk);
                self.bytes_read.fetch_add(chunk.len() as u64, Ordering::Relaxed);
            }
            return Ok(*hasher.finalize().as_bytes());
        }

        let mut buffer = vec![0u8; self.buffer_size];
        loop {
            if self.is_shutdown_requested() {
                return Err(io_err(interrupted()));
            }
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_err(e)),
            };
            hasher.update(&buffer[..n]);
            self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
        }

        Ok(*hasher.finalize().as_bytes())
    }

    /// Hash the first and last `sample_size` bytes plus the length.
    fn sampled_hash(&self, path: &Path, size: u64, sample_size: u64) -> Result<Hash, HashError> {
        let io_err = |e: io::Error| HashError::from_io(path.to_path_buf(), e);

        let mut file = File::open(path).map_err(io_err)?;
        self.files_read.fetch_add(1, Ordering::Relaxed);

        let mut hasher = blake3::Hasher::new();
        let head = io::copy(&mut (&mut file).take(sample_size), &mut hasher).map_err(io_err)?;

        file.seek(SeekFrom::End(-(sample_size as i64)))
            .map_err(io_err)?;
        let tail = io::copy(&mut (&mut file).take(sample_size), &mut hasher).map_err(io_err)?;

        hasher.update(&size.to_le_bytes());
        self.bytes_read.fetch_add(head + tail, Ordering::Relaxed);

        Ok(*hasher.finalize().as_bytes())
    }
}

fn interrupted() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "hashing interrupted")
}

/// Format a hash as lowercase hexadecimal.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from_bytes(*hash).to_hex().to_string()
}

/// Parse a 64-character hexadecimal hash.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    blake3::Hash::from_hex(hex).ok().map(|h| *h.as_bytes())
}
