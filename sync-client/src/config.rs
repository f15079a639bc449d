//! Configuration loading for sync-client.
//!
//! Configuration is loaded from a TOML file (default: `carelog.toml`). Every
//! section and field is optional.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sync_core::{AutoResolutionPreferences, MergeStrategy, StrategyTable};

use crate::transport::HttpTransportConfig;

/// Supplies auto-resolution preferences to the orchestrator.
///
/// Read once per conflict evaluation, so changes apply to the next conflict.
pub trait PreferencesSource: Send + Sync {
    /// Current preferences.
    fn preferences(&self) -> AutoResolutionPreferences;
}

impl PreferencesSource for AutoResolutionPreferences {
    fn preferences(&self) -> AutoResolutionPreferences {
        *self
    }
}

/// Root configuration for sync-client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Local store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Auto-resolution preferences.
    #[serde(default)]
    pub auto_resolution: AutoResolutionPreferences,
    /// Resolved-conflict cleanup configuration.
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Per-field strategy overrides.
    #[serde(default)]
    pub strategies: BTreeMap<String, MergeStrategy>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Prefix for relative target URLs.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Local store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
}

/// Cleanup task configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CleanupConfig {
    /// Enable cleanup task (default: true).
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
    /// Cleanup interval in seconds (default: 3600 = 1 hour).
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,
    /// How long resolved conflicts are kept, in seconds (default: 7 days).
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
}

// Default value functions
fn default_timeout_secs() -> u64 {
    30
}

fn default_database_path() -> PathBuf {
    PathBuf::from("carelog.db")
}

fn default_cleanup_enabled() -> bool {
    true
}

fn default_cleanup_interval() -> u64 {
    3600 // 1 hour
}

fn default_retention() -> u64 {
    7 * 24 * 60 * 60 // 7 days in seconds
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_cleanup_enabled(),
            interval_secs: default_cleanup_interval(),
            retention_secs: default_retention(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// The standard strategy table with configured overrides applied.
    pub fn strategy_table(&self) -> StrategyTable {
        StrategyTable::standard().with_overrides(
            self.strategies
                .iter()
                .map(|(field, strategy)| (field.clone(), *strategy)),
        )
    }

    /// HTTP transport settings.
    pub fn transport(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            base_url: self.server.base_url.clone(),
            timeout: Duration::from_secs(self.server.timeout_secs),
        }
    }
}

impl PreferencesSource for ClientConfig {
    fn preferences(&self) -> AutoResolutionPreferences {
        self.auto_resolution
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
