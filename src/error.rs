//! Structured error handling and exit codes.
//!
//! Only structural failures end a run with a non-zero status: unusable
//! configuration, an inaccessible tree root, or a report artifact that could
//! not be written. Missing files, duplicates and per-file failures are
//! results, not errors.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::output::ReportError;
use crate::pipeline::TreeSide;
use crate::scanner::ScanError;

/// Exit codes for the hashsync binary.
///
/// - 0: Success (run completed, whatever was found)
/// - 1: General error (tree root inaccessible, unexpected failure)
/// - 2: Configuration error (nothing was scanned)
/// - 3: Report error (at least one artifact could not be written)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Run completed.
    Success = 0,
    /// An unexpected error occurred or a tree could not be accessed.
    GeneralError = 1,
    /// Configuration was missing or invalid.
    ConfigError = 2,
    /// One or more report artifacts could not be written.
    ReportError = 3,
    /// Run was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "HS000",
            Self::GeneralError => "HS001",
            Self::ConfigError => "HS002",
            Self::ReportError => "HS003",
            Self::Interrupted => "HS130",
        }
    }

    /// Pick the exit code for an error that reached the top level.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(sync) = err.downcast_ref::<SyncError>() {
            return sync.exit_code();
        }
        if err.downcast_ref::<ConfigError>().is_some() {
            return Self::ConfigError;
        }
        if err.downcast_ref::<ReportError>().is_some() {
            return Self::ReportError;
        }
        Self::GeneralError
    }
}

/// Fatal run errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A tree root does not exist or cannot be read.
    #[error("Cannot access {side} tree: {source}")]
    TreeAccess {
        /// Which tree
        side: TreeSide,
        /// Why
        #[source]
        source: ScanError,
    },

    /// One or more artifacts could not be written.
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl SyncError {
    /// Exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::ConfigError,
            Self::TreeAccess { .. } => ExitCode::GeneralError,
            Self::Report(_) => ExitCode::ReportError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "HS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
