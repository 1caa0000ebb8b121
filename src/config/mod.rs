//! Application configuration.
//!
//! Aggregates configuration into a single Config struct that can be loaded
//! from YAML files or environment variables.

mod storage;

use serde::Deserialize;

pub use storage::{PostgresConfig, SqliteConfig, StorageConfig};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "PUSHGATE_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "PUSHGATE";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "PUSHGATE_LOG";

/// Push protocol version this build speaks.
pub const SUPPORTED_PUSH_VERSION: u32 = 1;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Push processing configuration.
    pub push: PushConfig,
    /// Ledger storage configuration.
    pub storage: StorageConfig,
}

/// Push processing configuration.
///
/// Fixed for the lifetime of a processor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// The only `pushVersion` the processor accepts.
    pub push_version: u32,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            push_version: SUPPORTED_PUSH_VERSION,
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config: Config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the processor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.push.push_version == 0 {
            return Err(ConfigError::Invalid(
                "push.push_version must be at least 1".to_string(),
            ));
        }
        if self.storage.sqlite.max_connections == 0 || self.storage.postgres.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "storage max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        let mut config = Self::default();
        config.storage.sqlite.path = ":memory:".to_string();
        config
    }
}
