#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Burrow Pool
//!
//! Shares a small number of expensive client sessions (browser drivers,
//! HTTP sessions) between many concurrent tasks without exceeding a
//! configured maximum.
//!
//! - **factory**: builds instances, either fresh per call or one shared
//!   instance
//! - **pool**: the bounded registry of instances and its capacity limiter
//! - **lease**: a guard that returns an instance to its pool on drop
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use burrow_pool::{ClientPool, FnFactory};
//!
//! #[derive(Debug)]
//! struct Session;
//!
//! let factory = FnFactory::new(|| Ok::<_, std::io::Error>(Session));
//! let pool = Arc::new(ClientPool::with_capacity(factory, 4)?);
//!
//! let session = pool.acquire().await?;
//! // ... use the session ...
//! pool.release(&session)?;
//! # Ok(())
//! # }
//! ```

/// Client construction capabilities
pub mod factory;

/// Guard releasing an instance on drop
pub mod lease;

/// Bounded client pool
pub mod pool;

// Re-export key types for easier access
pub use factory::{Client, ClientFactory, Factory, FactoryFlavor, FnFactory, FreshFactory, SharedFactory};
pub use lease::Lease;
pub use pool::{ClientPool, PoolResult};

pub use burrow_core::{InstanceId, PoolConfig, PoolError, PoolStats, PoolStatus, ReservationState};
