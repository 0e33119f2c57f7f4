//! Report and cache persistence.
//!
//! [`ReportWriter`] writes every artifact of a run:
//! - CSV reports for missing files, per-tree duplicates and failures
//! - a JSON run summary
//! - both hash caches
//!
//! Each artifact is replaced atomically (see [`atomic`]). A failing artifact
//! does not stop the others; all failures are collected into one
//! [`ReportError`] and artifacts already written stay in place.

pub mod atomic;
pub mod csv;
pub mod json;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cache::HashCache;
use crate::compare::Comparison;
use crate::pipeline::FileFailure;

pub use self::csv::{read_missing_report, split_paths, CsvOutput, CsvOutputError, MissingRow};
pub use json::{RunSummary, TreeSummary};

/// File name of the missing-file report.
pub const MISSING_REPORT: &str = "missing_files.csv";
/// File name of the source duplicate report.
pub const SOURCE_DUPLICATES_REPORT: &str = "source_duplicates.csv";
/// File name of the target duplicate report.
pub const TARGET_DUPLICATES_REPORT: &str = "target_duplicates.csv";
/// File name of the failures report.
pub const FAILURES_REPORT: &str = "failures.csv";
/// File name of the run summary.
pub const SUMMARY_REPORT: &str = "summary.json";
/// File name of the source tree cache.
pub const SOURCE_CACHE: &str = "source_cache.json";
/// File name of the target tree cache.
pub const TARGET_CACHE: &str = "target_cache.json";

/// One artifact that could not be written.
#[derive(Debug, Error)]
#[error("failed to write {}: {source}", .path.display())]
pub struct ArtifactError {
    /// Destination of the artifact
    pub path: PathBuf,
    /// Underlying failure
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

/// One or more artifacts could not be written.
#[derive(Debug, Error)]
#[error("{count} artifact(s) could not be written: {summary}", count = .failures.len(), summary = describe(.failures))]
pub struct ReportError {
    /// Every failed artifact, in write order
    pub failures: Vec<ArtifactError>,
}

fn describe(failures: &[ArtifactError]) -> String {
    failures
        .iter()
        .map(|f| f.path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Locations of every artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// `missing_files.csv`
    pub missing: PathBuf,
    /// `source_duplicates.csv`
    pub source_duplicates: PathBuf,
    /// `target_duplicates.csv`
    pub target_duplicates: PathBuf,
    /// `failures.csv`
    pub failures: PathBuf,
    /// `summary.json`
    pub summary: PathBuf,
    /// `source_cache.json`
    pub source_cache: PathBuf,
    /// `target_cache.json`
    pub target_cache: PathBuf,
}

impl ReportPaths {
    /// Artifact locations for the given directories.
    #[must_use]
    pub fn new(output_dir: &Path, cache_dir: &Path) -> Self {
        Self {
            missing: output_dir.join(MISSING_REPORT),
            source_duplicates: output_dir.join(SOURCE_DUPLICATES_REPORT),
            target_duplicates: output_dir.join(TARGET_DUPLICATES_REPORT),
            failures: output_dir.join(FAILURES_REPORT),
            summary: output_dir.join(SUMMARY_REPORT),
            source_cache: cache_dir.join(SOURCE_CACHE),
            target_cache: cache_dir.join(TARGET_CACHE),
        }
    }
}

/// Writes reports and caches.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    paths: ReportPaths,
}

impl ReportWriter {
    /// Create a writer for the given output and cache directories.
    #[must_use]
    pub fn new(output_dir: &Path, cache_dir: &Path) -> Self {
        Self {
            paths: ReportPaths::new(output_dir, cache_dir),
        }
    }

    /// Where each artifact goes.
    #[must_use]
    pub fn paths(&self) -> &ReportPaths {
        &self.paths
    }

    /// Write all reports and both caches.
    ///
    /// Every artifact is attempted even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] listing every artifact that failed.
    pub fn write(
        &self,
        comparison: &Comparison,
        failures: &[FileFailure],
        summary: &RunSummary,
        source_cache: &HashCache,
        target_cache: &HashCache,
    ) -> Result<&ReportPaths, ReportError> {
        let mut errors = Vec::new();

        let reports: [(&Path, CsvOutput<'_>); 4] = [
            (self.paths.missing.as_path(), CsvOutput::missing(&comparison.missing)),
            (
                self.paths.source_duplicates.as_path(),
                CsvOutput::duplicates(&comparison.source_duplicates),
            ),
            (
                self.paths.target_duplicates.as_path(),
                CsvOutput::duplicates(&comparison.target_duplicates),
            ),
            (self.paths.failures.as_path(), CsvOutput::failures(failures)),
        ];
        for (path, report) in reports {
            let result = atomic::write_atomic(path, |w| report.write_to(w).map_err(Into::into));
            record(&mut errors, path, result.map_err(boxed));
        }

        let result = atomic::write_atomic(&self.paths.summary, |w| summary.write_to(w));
        record(&mut errors, &self.paths.summary, result.map_err(boxed));

        if let Err(e) = self.save_caches(source_cache, target_cache) {
            errors.extend(e.failures);
        }

        if errors.is_empty() {
            log::info!(
                "Wrote {} missing, {} + {} duplicate groups to {}",
                comparison.missing.len(),
                comparison.source_duplicates.len(),
                comparison.target_duplicates.len(),
                self.paths
                    .missing
                    .parent()
                    .map_or_else(String::new, |p| p.display().to_string())
            );
            Ok(&self.paths)
        } else {
            Err(ReportError { failures: errors })
        }
    }

    /// Persist both caches.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] listing the caches that could not be saved.
    pub fn save_caches(
        &self,
        source_cache: &HashCache,
        target_cache: &HashCache,
    ) -> Result<(), ReportError> {
        let mut errors = Vec::new();
        for (path, cache) in [
            (&self.paths.source_cache, source_cache),
            (&self.paths.target_cache, target_cache),
        ] {
            record(&mut errors, path, cache.save(path).map_err(boxed));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ReportError { failures: errors })
        }
    }
}

fn boxed<E: std::error::Error + Send + Sync + 'static>(e: E) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(e)
}

fn record(
    errors: &mut Vec<ArtifactError>,
    path: &Path,
    result: Result<(), Box<dyn std::error::Error + Send + Sync>>,
) {
    if let Err(source) = result {
        log::error!("Failed to write {}: {}", path.display(), source);
        errors.push(ArtifactError {
            path: path.to_path_buf(),
            source,
        });
    }
}
