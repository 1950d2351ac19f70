//! Layered application configuration.
//!
//! Values are merged with `figment`, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. The platform config file (`config.toml` in the project config
//!    directory), or the file passed with `--config PATH`
//! 3. Environment variables prefixed with `TREEDUPE_`; nested keys use a
//!    double underscore, e.g. `TREEDUPE_CHUNK__SIZE=4096`
//! 4. Command-line flags, applied by [`Config::apply_scan_args`]
//!
//! ```toml
//! io_threads = 8
//! output = "json"
//!
//! [chunk]
//! policy = "accelerating"
//! size = 512
//! factor = 4
//! max = 1048576
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::{OutputFormat, ScanArgs};
use crate::duplicates::FinderConfig;
use crate::source::{
    ChunkPolicy, PolicyError, DEFAULT_CHUNK_SIZE, DEFAULT_GROWTH_FACTOR, DEFAULT_MAX_CHUNK_SIZE,
};

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "TREEDUPE_";

/// Default number of worker threads used for classification.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// The merged configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// Chunk settings are out of range.
    #[error("Invalid chunk settings: {0}")]
    Policy(#[from] PolicyError),

    /// `io_threads` was set to zero.
    #[error("io_threads must be at least 1")]
    ZeroThreads,

    /// The platform has no usable config directory.
    #[error("Failed to determine project directories")]
    NoConfigDir,

    /// The effective configuration could not be rendered as TOML.
    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Invalid(Box::new(err))
    }
}

/// Which chunk-length schedule to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Every read uses `size` bytes.
    #[default]
    Fixed,
    /// Reads start at `size` bytes and grow by `factor` per level up to `max`.
    Accelerating,
}

/// Chunk read settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkSettings {
    /// Fixed or accelerating chunk sizes.
    pub policy: PolicyKind,
    /// Bytes per read, or the first read's size when accelerating.
    pub size: usize,
    /// Per-level multiplier when accelerating.
    pub factor: usize,
    /// Upper bound on a single read when accelerating.
    pub max: usize,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Fixed,
            size: DEFAULT_CHUNK_SIZE,
            factor: DEFAULT_GROWTH_FACTOR,
            max: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

/// Effective application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chunk read settings
    pub chunk: ChunkSettings,
    /// Worker threads for per-bucket classification
    pub io_threads: usize,
    /// Output format for scan results
    pub output: OutputFormat,
    /// Expand directory arguments
    pub recursive: bool,
    /// Skip hidden entries while expanding directories
    pub skip_hidden: bool,
    /// Treat unopenable paths as a hard error
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk: ChunkSettings::default(),
            io_threads: DEFAULT_IO_THREADS,
            output: OutputFormat::Text,
            recursive: false,
            skip_hidden: false,
            strict: false,
        }
    }
}

impl Config {
    /// Load the merged configuration.
    ///
    /// With `explicit` set, that file must exist; otherwise the platform
    /// config file is used when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing or if any layer
    /// contains values of the wrong type.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(explicit)?.extract()?;
        log::debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    /// Build the figment with defaults, file and environment layers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if `explicit` names a missing file.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => match Self::config_path() {
                Ok(path) if path.is_file() => {
                    log::debug!("Loading config from {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
                Ok(_) => {}
                Err(e) => log::debug!("Skipping config file: {}", e),
            },
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Get the default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] when no home directory is known.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let project_dirs =
            ProjectDirs::from("com", "treedupe", "treedupe").ok_or(ConfigError::NoConfigDir)?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// Override values with flags given on the command line.
    pub fn apply_scan_args(&mut self, args: &ScanArgs) {
        if args.recursive {
            self.recursive = true;
        }
        if args.skip_hidden {
            self.skip_hidden = true;
        }
        if args.strict {
            self.strict = true;
        }
        if args.accelerate {
            self.chunk.policy = PolicyKind::Accelerating;
        }
        if let Some(size) = args.chunk_size {
            self.chunk.size = clamp_to_usize(size);
        }
        if let Some(factor) = args.growth_factor {
            self.chunk.factor = factor;
        }
        if let Some(max) = args.max_chunk {
            self.chunk.max = clamp_to_usize(max);
        }
        if let Some(threads) = args.io_threads {
            self.io_threads = threads;
        }
        if let Some(output) = args.output {
            self.output = output;
        }
    }

    /// Validate the chunk settings and turn them into a [`ChunkPolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Policy`] for zero sizes, a zero growth factor,
    /// or a maximum below the initial size.
    pub fn to_policy(&self) -> Result<ChunkPolicy, ConfigError> {
        let chunk = &self.chunk;
        let policy = match chunk.policy {
            PolicyKind::Fixed => ChunkPolicy::fixed(chunk.size)?,
            PolicyKind::Accelerating => {
                ChunkPolicy::accelerating(chunk.size, chunk.factor, chunk.max)?
            }
        };
        Ok(policy)
    }

    /// Build a finder configuration from these settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the chunk settings or thread count are invalid.
    pub fn finder_config(&self) -> Result<FinderConfig, ConfigError> {
        if self.io_threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(FinderConfig::default()
            .with_chunk_policy(self.to_policy()?)
            .with_io_threads(self.io_threads))
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Render`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn clamp_to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}
