//! Tracing subscriber setup for the shell binary.

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, LoggingConfig};

/// Install a stderr fmt subscriber. `RUST_LOG` overrides `config.filter`.
///
/// Installing twice is harmless: the second call keeps the first subscriber.
pub fn init(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| ConfigError::ValidationError {
            message: format!("logging.filter '{}' is invalid: {}", config.filter, e),
        })?,
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        debug!("global tracing subscriber already installed");
    }
    Ok(())
}
