//! # Configuration
//!
//! `engram.toml`, parsed with serde. Every section and field is optional.
//!
//! ```toml
//! [consolidation]
//! default_decay_rate = 0.02
//!
//! [query]
//! path_depth = 8
//!
//! [optimizer]
//! bloom_hashes = 6
//!
//! [storage]
//! database = "knowledge.redb"
//! ```
//!
//! The file is looked up in this order:
//! 1. `--config <path>`
//! 2. `ENGRAM_CONFIG`
//! 3. `./engram.toml`, if it exists
//! 4. built-in defaults

use engram_core::primitives::{
    DEFAULT_DEPENDENCY_DEPTH, DEFAULT_PAGE_SIZE, DEFAULT_PATH_DEPTH, DEFAULT_SEARCH_LIMIT,
};
use engram_core::{ConsolidationConfig, EngramError, OptimizerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ENGRAM_CONFIG";

/// Config file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "engram.toml";

/// Database used when neither the CLI nor the config names one.
pub const DEFAULT_DATABASE: &str = "engram.redb";

/// Root of `engram.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngramConfig {
    pub consolidation: ConsolidationConfig,
    pub query: QueryConfig,
    pub optimizer: OptimizerConfig,
    pub storage: StorageConfig,
}

/// Defaults for reasoning and search commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub path_depth: usize,
    pub dependency_depth: usize,
    pub search_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            path_depth: DEFAULT_PATH_DEPTH,
            dependency_depth: DEFAULT_DEPENDENCY_DEPTH,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Local store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: PathBuf,
    /// Nodes per page when loading a snapshot.
    pub page_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl EngramConfig {
    /// Parse a config from TOML text.
    pub fn parse(content: &str) -> Result<Self, EngramError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| EngramError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, EngramError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngramError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Resolve and load the config: explicit path, then `env_path`, then
    /// `./engram.toml`, then defaults.
    ///
    /// An explicitly named file that cannot be read is an error; a missing
    /// `./engram.toml` is not.
    pub fn resolve(
        explicit: Option<&Path>,
        env_path: Option<PathBuf>,
    ) -> Result<Self, EngramError> {
        if let Some(path) = explicit {
            tracing::debug!(path = %path.display(), "loading config from --config");
            return Self::from_file(path);
        }
        if let Some(path) = env_path.filter(|p| !p.as_os_str().is_empty()) {
            tracing::debug!(path = %path.display(), "loading config from {}", CONFIG_ENV);
            return Self::from_file(&path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            tracing::debug!("loading ./{}", DEFAULT_CONFIG_FILE);
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    /// `resolve` with `ENGRAM_CONFIG` read from the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, EngramError> {
        Self::resolve(explicit, std::env::var_os(CONFIG_ENV).map(PathBuf::from))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), EngramError> {
        let c = &self.consolidation;
        if !c.default_decay_rate.is_finite() || c.default_decay_rate <= 0.0 {
            return Err(EngramError::ConfigError(
                "consolidation.default_decay_rate must be a positive number".into(),
            ));
        }
        for (name, value) in [
            ("decay_write_threshold", c.decay_write_threshold),
            ("reinforce_strength_step", c.reinforce_strength_step),
            ("reinforce_confidence_step", c.reinforce_confidence_step),
            ("weak_strength_threshold", c.weak_strength_threshold),
            ("low_confidence_threshold", c.low_confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngramError::ConfigError(format!(
                    "consolidation.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if c.page_size == 0 || self.storage.page_size == 0 {
            return Err(EngramError::ConfigError(
                "page_size must be greater than 0".into(),
            ));
        }
        if self.optimizer.bloom_hashes == 0 || self.optimizer.bloom_min_bits == 0 {
            return Err(EngramError::ConfigError(
                "optimizer.bloom_hashes and optimizer.bloom_min_bits must be greater than 0"
                    .into(),
            ));
        }
        Ok(())
    }
}
