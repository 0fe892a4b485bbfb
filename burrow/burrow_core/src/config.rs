//! Configuration for client pools.
//!
//! Pools take a [`PoolConfig`] at construction; it is fixed for the life of
//! the pool. Configuration may be built in code or loaded from a TOML file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

/// Pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of instances the pool may hold
    #[serde(default = "default_max_pool")]
    pub max_pool: usize,

    /// Default bound (milliseconds) on waiting for a permit in `acquire`.
    /// `None` waits indefinitely.
    #[serde(default)]
    pub acquire_timeout_ms: Option<u64>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_max_pool() -> usize {
    10
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_pool: default_max_pool(),
            acquire_timeout_ms: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl PoolConfig {
    /// Configuration with the given capacity and no acquire timeout.
    pub fn with_capacity(max_pool: usize) -> Self {
        Self {
            max_pool,
            ..Self::default()
        }
    }

    /// Set the default acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// The default acquire timeout as a `Duration`.
    pub fn acquire_timeout_duration(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a malformed or invalid one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = PoolConfig::default();

        if let Some(path) = path {
            info!("Loading pool configuration from {}", path.display());

            if !path.exists() {
                warn!("Configuration file not found: {}", path.display());
                return Ok(config);
            }

            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

            config = Self::from_toml(&content)
                .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;
        } else {
            info!("No configuration file specified, using defaults");
        }

        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from a TOML document.
    pub fn from_toml(content: &str) -> std::result::Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_pool == 0 {
            return Err(ConfigError::Invalid("max_pool cannot be zero".to_string()));
        }

        // Semaphore permits are bounded by tokio's MAX_PERMITS (usize::MAX >> 3).
        if self.max_pool > usize::MAX >> 3 {
            return Err(ConfigError::Invalid(format!(
                "max_pool {} exceeds the permit limit",
                self.max_pool
            )));
        }

        if self.acquire_timeout_ms == Some(0) {
            warn!("acquire_timeout_ms is zero; acquire will fail unless a permit is free");
        }

        self.logging.validate()
    }
}

/// Configuration for the logging subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether to install a subscriber at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `burrow_pool=debug`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Whether to include the event target in each line
    #[serde(default = "default_true")]
    pub with_target: bool,
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.enabled && self.level.trim().is_empty() {
            return Err(ConfigError::Invalid("Log level cannot be empty".to_string()));
        }
        Ok(())
    }
}
