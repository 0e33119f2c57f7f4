//! Command-line interface definitions for hashsync.
//!
//! Global options (verbosity, error format) apply to every subcommand.
//!
//! ```bash
//! # Compare two trees using ./hashsync.toml
//! hashsync compare
//!
//! # Override the roots and report one path per missing hash
//! hashsync compare --source /data/a --target /data/b --missing-policy one-per-group
//!
//! # Copy the files listed in missing_files.csv into the target's quarantine folder
//! hashsync copy
//!
//! # Show the effective configuration
//! hashsync -v config
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::compare::{MatchMode, MissingPolicy};
use crate::config::SettingsOverrides;

/// Content-hash comparison of a source and a target directory tree.
///
/// hashsync hashes both trees with BLAKE3 (reusing per-tree caches), reports
/// every source file whose content is absent from the target, and lists
/// duplicate content within each tree.
#[derive(Debug, Parser)]
#[command(name = "hashsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print fatal errors as a JSON object on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Hash both trees and write the missing-file and duplicate reports
    Compare(CompareArgs),
    /// Copy files listed in the missing-file report into the quarantine folder
    Copy(CopyArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

/// Arguments for the compare subcommand.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Configuration file (default: ./hashsync.toml, then the user config dir)
    #[arg(short, long, value_name = "PATH", env = "HASHSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Source tree root
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Target tree root
    #[arg(long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Number of hashing workers (default: available parallelism)
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,

    /// Directory holding source_cache.json and target_cache.json
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory the reports are written to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Which source paths to report when their content is absent from the target
    #[arg(long, value_enum, value_name = "POLICY")]
    pub missing_policy: Option<MissingPolicyArg>,

    /// Whether files match by content hash or by relative path
    #[arg(long, value_enum, value_name = "MODE")]
    pub match_mode: Option<MatchModeArg>,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl CompareArgs {
    /// Command-line values as a configuration layer.
    #[must_use]
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            source_dir: self.source.clone(),
            target_dir: self.target.clone(),
            worker_count: self
                .workers
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX)),
            cache_dir: self.cache_dir.clone(),
            output_dir: self.output_dir.clone(),
            missing_policy: self.missing_policy.map(Into::into),
            match_mode: self.match_mode.map(Into::into),
        }
    }
}

/// Arguments for the copy subcommand.
#[derive(Debug, Args)]
pub struct CopyArgs {
    /// Configuration file (default: ./hashsync.toml, then the user config dir)
    #[arg(short, long, value_name = "PATH", env = "HASHSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Source tree root
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Target tree root
    #[arg(long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Missing-file report (default: missing_files.csv in the output directory)
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl CopyArgs {
    /// Command-line values as a configuration layer.
    #[must_use]
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            source_dir: self.source.clone(),
            target_dir: self.target.clone(),
            ..Default::default()
        }
    }
}

/// Arguments for the config subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Configuration file (default: ./hashsync.toml, then the user config dir)
    #[arg(short, long, value_name = "PATH", env = "HASHSYNC_CONFIG")]
    pub config: Option<PathBuf>,
}

/// `--missing-policy` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MissingPolicyArg {
    /// Report every source path whose content is absent
    All,
    /// Report only the first path of each absent content
    OnePerGroup,
}

impl From<MissingPolicyArg> for MissingPolicy {
    fn from(arg: MissingPolicyArg) -> Self {
        match arg {
            MissingPolicyArg::All => MissingPolicy::AllPaths,
            MissingPolicyArg::OnePerGroup => MissingPolicy::OnePerGroup,
        }
    }
}

/// `--match-mode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatchModeArg {
    /// Match by content hash
    Content,
    /// Match by relative path
    Path,
}

impl From<MatchModeArg> for MatchMode {
    fn from(arg: MatchModeArg) -> Self {
        match arg {
            MatchModeArg::Content => MatchMode::Content,
            MatchModeArg::Path => MatchMode::Path,
        }
    }
}
