//! CSV reports.
//!
//! Every report has a header row and one row per fact. Paths are relative
//! to their tree root and `/`-separated.
//!
//! # Files
//!
//! - `missing_files.csv`: `path,hash,size`, one row per missing source file
//! - `source_duplicates.csv` / `target_duplicates.csv`: `hash,paths`, one
//!   row per duplicate group with member paths joined by [`PATH_DELIMITER`]
//! - `failures.csv`: `tree,path,error`
//!
//! # Example
//!
//! ```
//! use hashsync::compare::MissingFile;
//! use hashsync::output::csv::CsvOutput;
//!
//! let missing = vec![MissingFile { path: "a.txt".into(), hash: [0u8; 32], size: 1 }];
//! let csv = CsvOutput::missing(&missing).to_string().unwrap();
//! assert!(csv.starts_with("path,hash,size\n"));
//! ```

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compare::MissingFile;
use crate::duplicates::DuplicateGroup;
use crate::pipeline::FileFailure;

/// Separator between paths in a duplicate row.
pub const PATH_DELIMITER: char = '|';

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<CsvOutputError> for io::Error {
    fn from(err: CsvOutputError) -> Self {
        match err {
            CsvOutputError::Io(e) => e,
            CsvOutputError::Csv(e) => e.into(),
        }
    }
}

/// A row of `missing_files.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingRow {
    /// Path relative to the source root
    pub path: String,
    /// BLAKE3 hash (hex); absent in hand-written reports
    #[serde(default)]
    pub hash: Option<String>,
    /// File size in bytes; absent in hand-written reports
    #[serde(default)]
    pub size: Option<u64>,
}

/// Which report a [`CsvOutput`] renders.
enum Report<'a> {
    Missing(&'a [MissingFile]),
    Duplicates(&'a [DuplicateGroup]),
    Failures(&'a [FileFailure]),
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    report: Report<'a>,
}

impl<'a> CsvOutput<'a> {
    /// Formatter for the missing-file report.
    #[must_use]
    pub fn missing(missing: &'a [MissingFile]) -> Self {
        Self {
            report: Report::Missing(missing),
        }
    }

    /// Formatter for a duplicate report.
    #[must_use]
    pub fn duplicates(groups: &'a [DuplicateGroup]) -> Self {
        Self {
            report: Report::Duplicates(groups),
        }
    }

    /// Formatter for the failures report.
    #[must_use]
    pub fn failures(failures: &'a [FileFailure]) -> Self {
        Self {
            report: Report::Failures(failures),
        }
    }

    /// Write the CSV output to the given writer.
    ///
    /// The header row is written even when there are no rows.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        match self.report {
            Report::Missing(missing) => {
                csv_writer.write_record(["path", "hash", "size"])?;
                for file in missing {
                    let hash = file.hash_hex();
                    let size = file.size.to_string();
                    csv_writer.write_record([file.path.as_str(), hash.as_str(), size.as_str()])?;
                }
            }
            Report::Duplicates(groups) => {
                csv_writer.write_record(["hash", "paths"])?;
                let delimiter = PATH_DELIMITER.to_string();
                for group in groups {
                    csv_writer.write_record([group.hash_hex(), group.paths.join(&delimiter)])?;
                }
            }
            Report::Failures(failures) => {
                csv_writer.write_record(["tree", "path", "error"])?;
                for failure in failures {
                    let tree = failure.tree.to_string();
                    csv_writer.write_record([
                        tree.as_str(),
                        failure.path.as_str(),
                        failure.error.as_str(),
                    ])?;
                }
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

/// Read a missing-file report.
///
/// Only the `path` column is required, so a hand-edited list with a single
/// `path` header is accepted too.
///
/// # Errors
///
/// Returns `CsvOutputError` if the file cannot be opened or a row cannot be
/// parsed.
pub fn read_missing_report(path: &Path) -> Result<Vec<MissingRow>, CsvOutputError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: MissingRow = row?;
        if !row.path.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// Split a duplicate row's `paths` cell back into paths.
#[must_use]
pub fn split_paths(cell: &str) -> Vec<String> {
    cell.split(PATH_DELIMITER).map(str::to_string).collect()
}
