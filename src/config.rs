//! Configuration management for tsgroup
//!
//! TOML configuration with environment variable overrides and defaults for
//! every field, so an empty file is a valid configuration.
//!
//! ```toml
//! [resolver]
//! enable_wildcards = true
//! max_pattern_len = 256
//! max_pattern_cache = 1024
//!
//! [change_detection]
//! positional_filters = true
//!
//! [logging]
//! level = "info"
//! with_target = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Membership resolution
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Change detection policy
    #[serde(default)]
    pub change_detection: ChangeDetectionConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Membership resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Treat `*` in other-filter values as a wildcard
    #[serde(default = "default_true")]
    pub enable_wildcards: bool,

    /// Longest wildcard value accepted
    #[serde(default = "default_max_pattern_len")]
    pub max_pattern_len: usize,

    /// Maximum number of compiled patterns kept
    #[serde(default = "default_max_pattern_cache")]
    pub max_pattern_cache: usize,
}

/// Change detector configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChangeDetectionConfig {
    /// Compare site, datatype and other filters by position
    ///
    /// When false they are compared as multisets.
    #[serde(default = "default_true")]
    pub positional_filters: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Include the event target in log lines
    #[serde(default = "default_true")]
    pub with_target: bool,
}

fn default_true() -> bool { true }
fn default_max_pattern_len() -> usize { 256 }
fn default_max_pattern_cache() -> usize { 1024 }
fn default_log_level() -> String { "info".to_string() }

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enable_wildcards: true,
            max_pattern_len: default_max_pattern_len(),
            max_pattern_cache: default_max_pattern_cache(),
        }
    }
}

impl Default for ChangeDetectionConfig {
    fn default() -> Self {
        Self {
            positional_filters: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("TSGROUP_ENABLE_WILDCARDS") {
            if let Ok(v) = value.trim().parse() {
                self.resolver.enable_wildcards = v;
            }
        }
        if let Ok(value) = std::env::var("TSGROUP_POSITIONAL_FILTERS") {
            if let Ok(v) = value.trim().parse() {
                self.change_detection.positional_filters = v;
            }
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.resolver.max_pattern_len == 0 {
            return Err(Error::Configuration(
                "resolver.max_pattern_len must be > 0".to_string(),
            ));
        }
        if self.resolver.max_pattern_len > 4096 {
            return Err(Error::Configuration(
                "resolver.max_pattern_len cannot exceed 4096".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(Error::Configuration(
                "logging.level cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents).map_err(|e| {
            Error::Configuration(format!("Failed to write config file {}: {}", path.display(), e))
        })
    }
}
