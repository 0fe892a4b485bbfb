//! Guard that returns a pooled instance when dropped.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use burrow_core::error::PoolError;
use tracing::error;

use crate::factory::Factory;
use crate::pool::ClientPool;

/// A reserved instance that is released back to its pool on drop.
///
/// Obtained from [`ClientPool::lease`]. Dereferences to the client.
pub struct Lease<F: Factory> {
    /// Pool the instance was acquired from
    pool: Arc<ClientPool<F>>,

    /// The reserved instance
    client: Arc<F::Client>,

    /// Set once the instance has been handed back
    released: bool,
}

impl<F: Factory> Lease<F> {
    pub(crate) fn new(pool: Arc<ClientPool<F>>, client: Arc<F::Client>) -> Self {
        Self {
            pool,
            client,
            released: false,
        }
    }

    /// The shared handle of the reserved instance.
    pub fn client(&self) -> &Arc<F::Client> {
        &self.client
    }

    /// The pool this lease belongs to.
    pub fn pool(&self) -> &Arc<ClientPool<F>> {
        &self.pool
    }

    /// Release the instance now and report any pool error.
    pub fn release(mut self) -> Result<(), PoolError<F::Error>> {
        self.released = true;
        self.pool.release(&self.client)
    }
}

impl<F: Factory> Deref for Lease<F> {
    type Target = F::Client;

    fn deref(&self) -> &F::Client {
        &self.client
    }
}

impl<F: Factory> Drop for Lease<F> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.pool.release(&self.client) {
            error!("Failed to release leased instance: {}", e);
        }
    }
}

impl<F: Factory> fmt::Debug for Lease<F>
where
    F::Client: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.released {
            write!(f, "Lease(released)")
        } else {
            write!(f, "Lease({:?})", self.client)
        }
    }
}
