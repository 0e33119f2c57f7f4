//! hashsync - content-addressed directory tree comparison
//!
//! Hashes a source and a target tree with BLAKE3, reusing per-tree caches
//! keyed by relative path, size and modification time, then reports which
//! source files have no content match in the target and which contents are
//! duplicated within each tree.
//!
//! The library is organised as a pipeline:
//!
//! - [`scanner`]: tree walking and file hashing
//! - [`cache`]: persisted per-tree hash caches
//! - [`pipeline`]: the bounded hashing pool and the end-to-end run
//! - [`compare`] / [`duplicates`]: set difference and duplicate groups
//! - [`output`]: CSV/JSON reports and atomic artifact writes
//! - [`quarantine`]: copying missing files into the target tree
//!
//! [`run_app`] ties these to the command line.

pub mod cache;
pub mod cli;
pub mod compare;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod quarantine;
pub mod scanner;
pub mod signal;

use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, Commands, CompareArgs, ConfigArgs, CopyArgs};
use crate::config::{Settings, SettingsOverrides};
use crate::error::{ExitCode, SyncError};
use crate::output::MISSING_REPORT;
use crate::pipeline::SyncRunner;
use crate::progress::Progress;
use crate::quarantine::Quarantine;

/// Run the parsed command line.
///
/// Returns the exit code for runs that completed or were interrupted.
///
/// # Errors
///
/// Fatal errors are returned for the caller to report; use
/// [`ExitCode::from_error`] to map them to an exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Compare(ref args) => run_compare(args, cli.quiet),
        Commands::Copy(ref args) => run_copy(args, cli.quiet),
        Commands::Config(ref args) => run_config(args),
    }
}

fn load_settings(
    config: Option<&std::path::Path>,
    overrides: &SettingsOverrides,
) -> Result<Settings, SyncError> {
    Ok(Settings::load(config, overrides)?)
}

fn run_compare(args: &CompareArgs, quiet: bool) -> anyhow::Result<ExitCode> {
    let settings = load_settings(args.config.as_deref(), &args.overrides())?;
    let config = settings.resolve().map_err(SyncError::from)?;

    log::info!(
        "Comparing {} -> {} with {} worker(s)",
        config.source_dir.display(),
        config.target_dir.display(),
        config.worker_count
    );

    let handler = signal::install_handler();
    let mut runner = SyncRunner::new(config).with_shutdown_flag(handler.get_flag());
    if !quiet && !args.no_progress {
        runner = runner.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let outcome = runner.run()?;
    if outcome.interrupted {
        log::warn!("Interrupted; caches saved, no reports written");
        return Ok(ExitCode::Interrupted);
    }

    if let Some(summary) = outcome.summary {
        log::info!(
            "{} missing file(s) ({}), {} source and {} target duplicate group(s), {} failure(s)",
            summary.missing_files,
            bytesize::ByteSize::b(summary.missing_bytes),
            summary.source_duplicate_groups,
            summary.target_duplicate_groups,
            summary.failures
        );
    }
    log::info!("Reports written to {}", outcome.paths.summary.display());

    Ok(ExitCode::Success)
}

fn run_copy(args: &CopyArgs, quiet: bool) -> anyhow::Result<ExitCode> {
    let settings = load_settings(args.config.as_deref(), &args.overrides())?;
    let config = settings.resolve().map_err(SyncError::from)?;

    if !config.source_dir.is_dir() {
        anyhow::bail!(
            "source directory does not exist: {}",
            config.source_dir.display()
        );
    }

    let report = args
        .report
        .clone()
        .unwrap_or_else(|| config.output_dir.join(MISSING_REPORT));
    let dest = config.target_dir.join(&settings.quarantine_dir);

    let handler = signal::install_handler();
    let mut quarantine =
        Quarantine::new(&config.source_dir, dest).with_shutdown_flag(handler.get_flag());
    if !quiet && !args.no_progress {
        quarantine = quarantine.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let stats = quarantine
        .run(&report)
        .with_context(|| format!("copying files listed in {}", report.display()))?;

    if stats.interrupted {
        return Ok(ExitCode::Interrupted);
    }
    Ok(ExitCode::Success)
}

fn run_config(args: &ConfigArgs) -> anyhow::Result<ExitCode> {
    let settings = load_settings(args.config.as_deref(), &SettingsOverrides::default())?;
    let rendered = settings.to_toml().map_err(SyncError::from)?;
    print!("{rendered}");
    Ok(ExitCode::Success)
}
