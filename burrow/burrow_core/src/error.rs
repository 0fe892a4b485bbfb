//! Error types for the Burrow client pool.
//!
//! `PoolError` covers every way an `acquire` or `release` can fail. It is
//! generic over the factory's construction error so that failures from the
//! client implementation reach the caller unchanged.

use std::time::Duration;

use thiserror::Error;

use crate::id::InstanceId;

/// Errors returned by pool operations.
///
/// Variants fall into three groups:
///
/// - construction failures propagated from the factory (`Construction`)
/// - invariant violations inside the pool (`Internal`); these are
///   programming errors and are never retried
/// - caller contract violations on release (`NotReserved`, `UnknownInstance`)
///   and factory contract violations on acquire (`AlreadyReserved`)
///
/// The remaining variants describe outcomes of waiting for a permit.
#[derive(Debug, Error)]
pub enum PoolError<E> {
    /// The factory failed to build an instance
    #[error("Client construction failed: {0}")]
    Construction(#[source] E),

    /// An internal invariant of the pool was violated
    #[error("Pool invariant violated: {0}")]
    Internal(String),

    /// Release of an instance that is already available (double release)
    #[error("Instance {0} is not reserved")]
    NotReserved(InstanceId),

    /// Release of an instance this pool never handed out
    #[error("Instance does not belong to this pool")]
    UnknownInstance,

    /// The factory returned an instance that is currently reserved
    #[error("Factory returned instance {0} which is already reserved")]
    AlreadyReserved(InstanceId),

    /// Waiting for a permit exceeded the given duration
    #[error("Timed out after {0:?} waiting for a pool permit")]
    Timeout(Duration),

    /// No permit was free and the caller asked not to wait
    #[error("Pool exhausted")]
    Exhausted,

    /// The capacity limiter was closed
    #[error("Pool is closed")]
    Closed,
}

impl<E> PoolError<E> {
    /// Whether this error reports a misuse of `release`.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::NotReserved(_) | Self::UnknownInstance | Self::AlreadyReserved(_)
        )
    }

    /// Whether this error reports a broken pool invariant.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// Returns the factory error if construction failed.
    pub fn into_construction(self) -> Option<E> {
        match self {
            Self::Construction(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors raised while validating or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
