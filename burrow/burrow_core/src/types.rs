//! Data types shared between the pool and its callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reservation state of an instance in a pool registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationState {
    /// Idle and ready to be handed out.
    Available,

    /// Handed out by `acquire` and not yet released.
    Reserved,
}

impl ReservationState {
    /// Whether the instance may be handed out.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl fmt::Display for ReservationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Reserved => write!(f, "reserved"),
        }
    }
}

/// Point-in-time view of a pool's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Configured capacity.
    pub max_pool: usize,

    /// Number of instances in the registry (available + reserved).
    pub size: usize,

    /// Number of registry entries marked available.
    pub available: usize,

    /// Number of registry entries marked reserved.
    pub reserved: usize,

    /// Free permits in the capacity limiter.
    pub permits: usize,
}

/// Cumulative counters about a pool.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Total number of instances inserted into the registry
    pub total_created: usize,

    /// Total number of successful acquisitions
    pub total_checkouts: usize,

    /// Total number of successful releases
    pub total_returns: usize,

    /// Number of factory calls that failed
    pub creation_failures: usize,
}
