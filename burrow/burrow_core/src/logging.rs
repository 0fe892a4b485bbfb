//! Logging bootstrap.
//!
//! Pool code emits events through the `tracing` macros. Binaries that
//! compose a pool call [`init_logging`] once at startup to install a
//! formatting subscriber.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::LoggingConfig;
use crate::error::ConfigError;

/// Install a global `tracing` subscriber built from `config`.
///
/// `RUST_LOG`, when set, overrides `config.level`. Returns `Ok(false)` if
/// logging is disabled or a global subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, ConfigError> {
    if !config.enabled {
        return Ok(false);
    }

    let filter = build_filter(config)?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .finish();

    Ok(tracing::subscriber::set_global_default(subscriber).is_ok())
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| ConfigError::Invalid(format!("Invalid log level '{}': {}", config.level, e))),
    }
}
