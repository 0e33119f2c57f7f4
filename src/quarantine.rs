//! Copy missing files into a quarantine folder inside the target tree.
//!
//! # Overview
//!
//! Reads a `missing_files.csv` report and, for every listed path:
//! - resolves it against the source root (absolute paths must lie inside it)
//! - recreates its relative directory structure under
//!   `target_dir/<quarantine_dir>`
//! - copies content, permissions and modification time
//!
//! A single file's failure is logged and counted; the remaining rows are
//! still copied. Rows that would escape the source root through `..` are
//! rejected individually.
//!
//! # Example
//!
//! ```no_run
//! use hashsync::quarantine::Quarantine;
//! use std::path::Path;
//!
//! let quarantine = Quarantine::new("/data/src", "/data/dst/missed_files");
//! let stats = quarantine.run(Path::new("missing_files.csv")).unwrap();
//! println!("{}", stats.summary());
//! ```

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytesize::ByteSize;
use filetime::FileTime;
use thiserror::Error;

use crate::output::{read_missing_report, CsvOutputError, MissingRow};
use crate::progress::ProgressCallback;

/// Error type for quarantine copies.
#[derive(Debug, Error)]
pub enum CopyError {
    /// The missing-file report could not be read.
    #[error("cannot read report {}: {source}", .path.display())]
    Report {
        /// Report location
        path: PathBuf,
        /// Why
        #[source]
        source: CsvOutputError,
    },

    /// The report row points outside the source root.
    #[error("path escapes the source root: {0}")]
    OutsideSource(String),

    /// The listed source file does not exist (anymore).
    #[error("source file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// The listed path is not a regular file.
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    /// General I/O error.
    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl CopyError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Counters for one quarantine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Files copied
    pub copied: usize,
    /// Bytes copied
    pub bytes_copied: u64,
    /// Rows that failed, with their error
    pub failures: Vec<(String, String)>,
    /// Whether the run stopped early on request
    pub interrupted: bool,
}

impl CopyStats {
    /// Number of failed rows.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// One-line summary for the log.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Copied {} file(s) ({}), {} failed",
            self.copied,
            ByteSize::b(self.bytes_copied),
            self.failures.len()
        )
    }
}

/// Copies report rows from the source root into a quarantine directory.
pub struct Quarantine {
    source_dir: PathBuf,
    dest_dir: PathBuf,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Quarantine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Quarantine")
            .field("source_dir", &self.source_dir)
            .field("dest_dir", &self.dest_dir)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Quarantine {
    /// Copy from `source_dir` into `dest_dir`.
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            dest_dir: dest_dir.into(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Stop between files once the flag is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report per-file progress.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Where copies land.
    #[must_use]
    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Read `report` and copy every row.
    ///
    /// # Errors
    ///
    /// Only an unreadable report is an error; per-row failures are collected
    /// in the returned [`CopyStats`].
    pub fn run(&self, report: &Path) -> Result<CopyStats, CopyError> {
        let rows = read_missing_report(report).map_err(|source| CopyError::Report {
            path: report.to_path_buf(),
            source,
        })?;
        log::info!(
            "Copying {} missing file(s) into {}",
            rows.len(),
            self.dest_dir.display()
        );
        Ok(self.copy_rows(&rows))
    }

    /// Copy every row, continuing past failures.
    #[must_use]
    pub fn copy_rows(&self, rows: &[MissingRow]) -> CopyStats {
        let mut stats = CopyStats::default();

        if let Some(ref cb) = self.progress_callback {
            cb.on_phase_start("copying", rows.len());
        }

        for (index, row) in rows.iter().enumerate() {
            if self.is_shutdown_requested() {
                log::warn!("Copy interrupted after {} file(s)", stats.copied);
                stats.interrupted = true;
                break;
            }
            if let Some(ref cb) = self.progress_callback {
                cb.on_progress(index + 1, &row.path);
            }

            match self.copy_one(&row.path) {
                Ok(bytes) => {
                    log::debug!("Copied {}", row.path);
                    stats.copied += 1;
                    stats.bytes_copied += bytes;
                    if let Some(ref cb) = self.progress_callback {
                        cb.on_item_completed(bytes);
                    }
                }
                Err(e) => {
                    log::warn!("Failed to copy {}: {}", row.path, e);
                    stats.failures.push((row.path.clone(), e.to_string()));
                }
            }
        }

        if let Some(ref cb) = self.progress_callback {
            cb.on_phase_end("copying");
        }
        log::info!("{}", stats.summary());
        stats
    }

    /// Copy a single report path; returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns [`CopyError`] if the path escapes the source root or any
    /// filesystem step fails.
    pub fn copy_one(&self, report_path: &str) -> Result<u64, CopyError> {
        let relative = relative_to_source(&self.source_dir, report_path)?;
        let src = self.source_dir.join(&relative);
        let dst = self.dest_dir.join(&relative);

        let metadata = match fs::metadata(&src) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CopyError::SourceMissing(src));
            }
            Err(e) => return Err(CopyError::io(&src, e)),
        };
        if !metadata.is_file() {
            return Err(CopyError::NotAFile(src));
        }

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| CopyError::io(parent, e))?;
        }
        // fs::copy carries the permission bits over
        let bytes = fs::copy(&src, &dst).map_err(|e| CopyError::io(&dst, e))?;

        let mtime = FileTime::from_last_modification_time(&metadata);
        let atime = FileTime::from_last_access_time(&metadata);
        filetime::set_file_times(&dst, atime, mtime).map_err(|e| CopyError::io(&dst, e))?;

        Ok(bytes)
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Turn a report path into a path relative to `source_dir`.
///
/// Absolute paths must lie inside `source_dir` (as given or canonicalized).
/// `.` components are dropped; `..` and anything else that could leave the
/// root is rejected.
///
/// # Errors
///
/// Returns [`CopyError::OutsideSource`] for paths that leave the root.
pub fn relative_to_source(source_dir: &Path, report_path: &str) -> Result<PathBuf, CopyError> {
    let path = Path::new(report_path);
    let path = if path.is_absolute() {
        strip_root(source_dir, path)
            .ok_or_else(|| CopyError::OutsideSource(report_path.to_string()))?
    } else {
        path
    };

    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(CopyError::OutsideSource(report_path.to_string()));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(CopyError::OutsideSource(report_path.to_string()));
    }
    Ok(relative)
}

fn strip_root<'a>(source_dir: &Path, path: &'a Path) -> Option<&'a Path> {
    if let Ok(rest) = path.strip_prefix(source_dir) {
        return Some(rest);
    }
    let canonical = fs::canonicalize(source_dir).ok()?;
    path.strip_prefix(canonical).ok()
}
