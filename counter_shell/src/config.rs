//! Shell configuration loaded from TOML.
//!
//! ```toml
//! [storage]
//! backend = "file"
//! counter = "app"
//!
//! [effects]
//! mode = "background"
//! settle_timeout_ms = 2000
//!
//! [logging]
//! filter = "counter_shell=debug"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    pub storage: StorageConfig,
    pub effects: EffectsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Store location; defaults to the platform data directory.
    pub path: Option<PathBuf>,
    /// Name of the counter record.
    pub counter: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: None,
            counter: "app".to_string(),
        }
    }
}

/// Where storage effects run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectMode {
    /// On the loop thread, before the next effect of the batch.
    #[default]
    Inline,
    /// On an ordered worker; completions come back through the inbox.
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectsConfig {
    pub mode: EffectMode,
    /// Threads of the background runtime. Storage jobs still run one at a
    /// time in submission order; extra threads only serve the runtime
    /// itself, so they never make storage work parallel.
    pub worker_threads: usize,
    pub settle_timeout_ms: u64,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            mode: EffectMode::Inline,
            worker_threads: 1,
            settle_timeout_ms: 5000,
        }
    }
}

impl EffectsConfig {
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins if set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl ShellConfig {
    /// `~/.config/persistent-counter/config.toml` or the platform equivalent.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("persistent-counter").join("config.toml")
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = Self::config_path();
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        Self::parse(&content, &path)
    }

    /// Parse and validate TOML text; `origin` is only used in errors.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: ShellConfig = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: origin.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.counter.trim().is_empty() {
            return Err(invalid("storage.counter must not be empty"));
        }
        if self.effects.worker_threads == 0 {
            return Err(invalid("effects.worker_threads must be at least 1"));
        }
        if self.effects.settle_timeout_ms == 0 {
            return Err(invalid("effects.settle_timeout_ms must be at least 1"));
        }
        EnvFilter::try_new(&self.logging.filter).map_err(|e| ConfigError::ValidationError {
            message: format!("logging.filter '{}' is invalid: {}", self.logging.filter, e),
        })?;
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
    }
}
