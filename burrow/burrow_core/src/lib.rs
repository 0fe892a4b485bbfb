//! # Burrow Core
//!
//! `burrow_core` provides the building blocks shared by the Burrow client
//! pool: identifiers, reservation states, the error hierarchy, pool
//! configuration and logging bootstrap.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for pool operations and configuration
//! - **id**: Identifier assigned to every pooled instance
//! - **types**: Reservation state and pool snapshots
//! - **config**: Pool and logging configuration
//! - **logging**: Installation of the `tracing` subscriber

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod id;
pub mod logging;
pub mod types;

// Re-export key types for convenience
pub use config::{LoggingConfig, PoolConfig};
pub use error::{ConfigError, PoolError};
pub use id::InstanceId;
pub use types::{PoolStats, PoolStatus, ReservationState};
