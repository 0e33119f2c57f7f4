//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. A TOML file: `--config PATH`, else `./hashsync.toml`, else
//!    `<platform config dir>/hashsync/config.toml`
//! 3. Environment variables prefixed `HASHSYNC_` (`__` separates nested keys,
//!    e.g. `HASHSYNC_HASH_MODE__KIND=sampled`)
//! 4. Command-line overrides ([`SettingsOverrides`])
//!
//! [`Settings::resolve`] validates the merged settings into a [`RunConfig`].

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compare::{CompareConfig, MatchMode, MissingPolicy};
use crate::pipeline::default_workers;
use crate::scanner::{HashMode, WalkerConfig};

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "hashsync.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "HASHSYNC_";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    /// A layer could not be parsed or has the wrong shape.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// A required key has no value in any layer.
    #[error("Missing required setting `{0}`")]
    MissingKey(&'static str),

    /// A key has an unusable value.
    #[error("Invalid value for `{key}`: {message}")]
    InvalidValue {
        /// Offending key
        key: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// The effective settings could not be rendered as TOML.
    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Invalid(Box::new(err))
    }
}

/// Every recognized setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the source tree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
    /// Root of the target tree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_dir: Option<PathBuf>,
    /// Hashing parallelism
    pub worker_count: usize,
    /// Where the two cache files live
    pub cache_dir: PathBuf,
    /// Where reports are written
    pub output_dir: PathBuf,
    /// Skip names starting with `.` or `$`
    pub skip_hidden: bool,
    /// Skip zero-length files
    pub skip_empty: bool,
    /// Only these extensions (empty = all)
    pub include_extensions: Vec<String>,
    /// Never these extensions
    pub exclude_extensions: Vec<String>,
    /// Gitignore-style patterns relative to each root
    pub ignore_patterns: Vec<String>,
    /// Which missing files are reported
    pub missing_policy: MissingPolicy,
    /// How presence in the target is decided
    pub match_mode: MatchMode,
    /// Drop cache entries for files no longer present
    pub prune_cache: bool,
    /// Memory-map large files while hashing
    pub use_mmap: bool,
    /// Full or sampled hashing
    pub hash_mode: HashMode,
    /// Subdirectory of the target tree receiving copied files
    pub quarantine_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_dir: None,
            target_dir: None,
            worker_count: default_workers(),
            cache_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            skip_hidden: false,
            skip_empty: false,
            include_extensions: Vec::new(),
            exclude_extensions: Vec::new(),
            ignore_patterns: Vec::new(),
            missing_policy: MissingPolicy::default(),
            match_mode: MatchMode::default(),
            prune_cache: true,
            use_mmap: true,
            hash_mode: HashMode::default(),
            quarantine_dir: PathBuf::from("missed_files"),
        }
    }
}

/// Values given on the command line; `None` leaves lower layers in effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsOverrides {
    /// `--source`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
    /// `--target`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_dir: Option<PathBuf>,
    /// `--workers`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_count: Option<usize>,
    /// `--cache-dir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    /// `--output-dir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// `--missing-policy`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_policy: Option<MissingPolicy>,
    /// `--match-mode`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_mode: Option<MatchMode>,
}

/// Validated settings for one comparison run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Root of the source tree
    pub source_dir: PathBuf,
    /// Root of the target tree
    pub target_dir: PathBuf,
    /// Hashing parallelism (at least 1)
    pub worker_count: usize,
    /// Where the two cache files live
    pub cache_dir: PathBuf,
    /// Where reports are written
    pub output_dir: PathBuf,
    /// Filters applied to both trees
    pub walker: WalkerConfig,
    /// Full or sampled hashing
    pub hash_mode: HashMode,
    /// Memory-map large files while hashing
    pub use_mmap: bool,
    /// Comparison policy
    pub compare: CompareConfig,
    /// Drop cache entries for files no longer present
    pub prune_cache: bool,
}

impl RunConfig {
    /// A run over two trees with every other setting at its default.
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        let defaults = Settings::default();
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
            worker_count: defaults.worker_count,
            cache_dir: defaults.cache_dir,
            output_dir: defaults.output_dir,
            walker: WalkerConfig::default(),
            hash_mode: defaults.hash_mode,
            use_mmap: defaults.use_mmap,
            compare: CompareConfig::default(),
            prune_cache: defaults.prune_cache,
        }
    }

    /// Set the cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the report directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the worker count (at least one).
    #[must_use]
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers.max(1);
        self
    }

    /// Set the comparison policy.
    #[must_use]
    pub fn with_compare(mut self, compare: CompareConfig) -> Self {
        self.compare = compare;
        self
    }

    /// Set the walker filters.
    #[must_use]
    pub fn with_walker(mut self, walker: WalkerConfig) -> Self {
        self.walker = walker;
        self
    }

    /// Set the hash mode.
    #[must_use]
    pub fn with_hash_mode(mut self, mode: HashMode) -> Self {
        self.hash_mode = mode;
        self
    }
}

impl Settings {
    /// Find the config file to use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if `explicit` is given but is
    /// not a file.
    pub fn config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = explicit {
            return if path.is_file() {
                Ok(Some(path.to_path_buf()))
            } else {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            };
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Ok(Some(local));
        }

        Ok(Self::default_config_path().filter(|p| p.is_file()))
    }

    /// Platform-specific config file location.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "hashsync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Build the layered figment.
    #[must_use]
    pub fn figment(file: Option<&Path>, overrides: &SettingsOverrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
    }

    /// Load settings from every layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file is missing or any layer
    /// cannot be parsed.
    pub fn load(explicit: Option<&Path>, overrides: &SettingsOverrides) -> Result<Self, ConfigError> {
        let file = Self::config_file(explicit)?;
        match file {
            Some(ref path) => log::debug!("Using config file {}", path.display()),
            None => log::debug!("No config file found, using defaults"),
        }
        Self::from_figment(&Self::figment(file.as_deref(), overrides))
    }

    /// Extract settings from a figment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if extraction fails.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        Ok(figment.extract()?)
    }

    /// Validate into a run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a tree root is missing or a value is
    /// unusable.
    pub fn resolve(&self) -> Result<RunConfig, ConfigError> {
        let source_dir = self
            .source_dir
            .clone()
            .ok_or(ConfigError::MissingKey("source_dir"))?;
        let target_dir = self
            .target_dir
            .clone()
            .ok_or(ConfigError::MissingKey("target_dir"))?;

        if self.worker_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "worker_count",
                message: "must be at least 1".to_string(),
            });
        }

        if let HashMode::Sampled { sample_size, .. } = self.hash_mode {
            if sample_size == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "hash_mode.sample_size",
                    message: "must be at least 1".to_string(),
                });
            }
        }

        Ok(RunConfig {
            source_dir,
            target_dir,
            worker_count: self.worker_count,
            cache_dir: self.cache_dir.clone(),
            output_dir: self.output_dir.clone(),
            walker: WalkerConfig::default()
                .with_skip_hidden(self.skip_hidden)
                .with_skip_empty(self.skip_empty)
                .with_include_extensions(self.include_extensions.clone())
                .with_exclude_extensions(self.exclude_extensions.clone())
                .with_ignore_patterns(self.ignore_patterns.clone()),
            hash_mode: self.hash_mode,
            use_mmap: self.use_mmap,
            compare: CompareConfig::default()
                .with_missing_policy(self.missing_policy)
                .with_match_mode(self.match_mode),
            prune_cache: self.prune_cache,
        })
    }

    /// Render the settings as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Render`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
