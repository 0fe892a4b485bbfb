//! Bounded pool of expensive client instances.
//!
//! The pool hands out `Arc`-wrapped clients built by a [`Factory`], never
//! holding more than `max_pool` of them. Capacity is tracked by a semaphore:
//! `acquire` consumes a permit and `release` restores it. Each instance in the
//! registry is tagged [`ReservationState::Available`] or
//! [`ReservationState::Reserved`].
//!
//! Waiting for a permit is the only point where `acquire` suspends. After a
//! permit is obtained, the scan-or-create step runs under the registry lock,
//! and `release` takes the same lock before it updates the registry and
//! restores the permit, so the two cannot interleave.
//!
//! When several instances are available, which one `acquire` returns is
//! unspecified. Callers and tests must not rely on any ordering.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use burrow_core::config::PoolConfig;
use burrow_core::error::{ConfigError, PoolError};
use burrow_core::id::InstanceId;
use burrow_core::types::{PoolStats, PoolStatus, ReservationState};
use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};
use tracing::{debug, error, info, trace, warn};

use crate::factory::Factory;
use crate::lease::Lease;

/// Result type of pool operations over factory `F`.
pub type PoolResult<T, F> = Result<T, PoolError<<F as Factory>::Error>>;

/// Identity of an instance: the address of its shared allocation.
///
/// The registry keeps an `Arc` to every instance, so an address cannot be
/// reused while its entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InstanceKey(usize);

impl InstanceKey {
    fn of<C>(client: &Arc<C>) -> Self {
        Self(Arc::as_ptr(client) as *const () as usize)
    }
}

/// A registry entry
struct Slot<C> {
    id: InstanceId,
    client: Arc<C>,
    state: ReservationState,
    created_at: Instant,
    checkouts: usize,
}

/// State guarded by the registry lock
struct Registry<C> {
    slots: HashMap<InstanceKey, Slot<C>>,
    stats: PoolStats,
}

impl<C> Registry<C> {
    /// Any available entry; iteration order of the map decides which.
    fn find_available(&self) -> Option<InstanceKey> {
        self.slots
            .iter()
            .find(|(_, slot)| slot.state.is_available())
            .map(|(key, _)| *key)
    }

    fn count(&self, state: ReservationState) -> usize {
        self.slots.values().filter(|slot| slot.state == state).count()
    }
}

/// A bounded, concurrency-safe pool of client instances.
///
/// Share a pool by wrapping it in an `Arc`; every clone sees the same
/// registry and capacity.
pub struct ClientPool<F: Factory> {
    /// Builds new instances when none is available
    factory: F,

    /// Instance registry and counters
    registry: Mutex<Registry<F::Client>>,

    /// Capacity limiter; starts with `max_pool` permits
    permits: Semaphore,

    /// Configuration for this pool
    config: PoolConfig,
}

impl<F: Factory> ClientPool<F> {
    /// Create a pool over `factory` with the given configuration.
    pub fn new(factory: F, config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        info!(
            "Creating client pool with capacity {} ({:?} factory)",
            config.max_pool,
            factory.flavor()
        );

        Ok(Self {
            factory,
            registry: Mutex::new(Registry {
                slots: HashMap::with_capacity(config.max_pool),
                stats: PoolStats::default(),
            }),
            permits: Semaphore::new(config.max_pool),
            config,
        })
    }

    /// Create a pool with capacity `max_pool` and default settings otherwise.
    pub fn with_capacity(factory: F, max_pool: usize) -> Result<Self, ConfigError> {
        Self::new(factory, PoolConfig::with_capacity(max_pool))
    }

    /// Acquire an instance, waiting for capacity if necessary.
    ///
    /// Waits at most `PoolConfig::acquire_timeout_ms` when configured,
    /// otherwise indefinitely.
    pub async fn acquire(&self) -> PoolResult<Arc<F::Client>, F> {
        if let Some(timeout) = self.config.acquire_timeout_duration() {
            return self.acquire_timeout(timeout).await;
        }

        let permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return Err(PoolError::Closed),
        };
        self.checkout(permit)
    }

    /// Acquire an instance, waiting at most `timeout` for capacity.
    ///
    /// Only the permit wait is bounded; the scan-or-create step is the same
    /// as for [`acquire`](Self::acquire).
    pub async fn acquire_timeout(&self, timeout: Duration) -> PoolResult<Arc<F::Client>, F> {
        let permit = match tokio::time::timeout(timeout, self.permits.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => {
                debug!("Timed out after {:?} waiting for a pool permit", timeout);
                return Err(PoolError::Timeout(timeout));
            }
        };

        self.checkout(permit)
    }

    /// Acquire an instance only if capacity is free right now.
    pub fn try_acquire(&self) -> PoolResult<Arc<F::Client>, F> {
        let permit = match self.permits.try_acquire() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return Err(PoolError::Closed),
            Err(TryAcquireError::NoPermits) => return Err(PoolError::Exhausted),
        };

        self.checkout(permit)
    }

    /// Acquire an instance wrapped in a guard that releases it on drop.
    pub async fn lease(self: &Arc<Self>) -> PoolResult<Lease<F>, F> {
        let client = self.acquire().await?;
        Ok(Lease::new(Arc::clone(self), client))
    }

    /// Return an instance previously handed out by this pool.
    ///
    /// Releasing an instance that is already available, or one this pool
    /// never produced, is a caller error and leaves the pool unchanged.
    pub fn release(&self, client: &Arc<F::Client>) -> PoolResult<(), F> {
        let mut guard = self.registry.lock();
        let registry = &mut *guard;

        let slot = match registry.slots.get_mut(&InstanceKey::of(client)) {
            Some(slot) => slot,
            None => {
                warn!("Release of an instance that does not belong to this pool");
                return Err(PoolError::UnknownInstance);
            }
        };

        if slot.state.is_available() {
            warn!("Double release of instance {}", slot.id.short());
            return Err(PoolError::NotReserved(slot.id));
        }

        slot.state = ReservationState::Available;
        registry.stats.total_returns += 1;

        // Restored while the registry lock is held.
        self.permits.add_permits(1);

        trace!("Released instance {}", slot.id.short());
        Ok(())
    }

    /// Scan for an available instance or build one. Consumes `permit` on success.
    fn checkout(&self, permit: SemaphorePermit<'_>) -> PoolResult<Arc<F::Client>, F> {
        let mut guard = self.registry.lock();
        let registry = &mut *guard;

        let client = match registry.find_available() {
            Some(key) => {
                let slot = registry.slots.get_mut(&key).ok_or_else(|| {
                    self.invariant_violation(
                        "available instance vanished from the registry during checkout".to_string(),
                    )
                })?;

                slot.state = ReservationState::Reserved;
                slot.checkouts += 1;
                trace!(
                    "Reusing instance {} (checkout #{}, age {:?})",
                    slot.id.short(),
                    slot.checkouts,
                    slot.created_at.elapsed()
                );
                Arc::clone(&slot.client)
            }
            None => self.create_reserved(registry)?,
        };

        registry.stats.total_checkouts += 1;

        // The instance now holds the permit until `release`. On any error
        // above, `permit` is dropped instead and the capacity is restored.
        permit.forget();

        Ok(client)
    }

    /// Build a new instance and insert it as reserved.
    fn create_reserved(&self, registry: &mut Registry<F::Client>) -> PoolResult<Arc<F::Client>, F> {
        if registry.slots.len() >= self.config.max_pool {
            return Err(self.invariant_violation(format!(
                "registry holds {} instances at capacity {} but none is available",
                registry.slots.len(),
                self.config.max_pool
            )));
        }

        let client = match self.factory.create() {
            Ok(client) => client,
            Err(e) => {
                registry.stats.creation_failures += 1;
                warn!("Failed to create client instance: {}", e);
                return Err(PoolError::Construction(e));
            }
        };

        let key = InstanceKey::of(&client);
        if let Some(existing) = registry.slots.get(&key) {
            // Only a shared factory can return a registered instance, and the
            // scan above found nothing available.
            warn!(
                "Factory returned instance {} which is already reserved",
                existing.id.short()
            );
            return Err(PoolError::AlreadyReserved(existing.id));
        }

        let id = InstanceId::new();
        registry.slots.insert(
            key,
            Slot {
                id,
                client: Arc::clone(&client),
                state: ReservationState::Reserved,
                created_at: Instant::now(),
                checkouts: 1,
            },
        );
        registry.stats.total_created += 1;

        debug!(
            "Created instance {} ({} of {})",
            id.short(),
            registry.slots.len(),
            self.config.max_pool
        );

        Ok(client)
    }

    fn invariant_violation(&self, message: String) -> PoolError<F::Error> {
        error!("Client pool invariant violated: {}", message);
        PoolError::Internal(message)
    }

    /// Close the capacity limiter.
    ///
    /// Pending and future acquisitions fail with `PoolError::Closed`.
    /// Reserved instances may still be released.
    pub fn close(&self) {
        info!("Closing client pool");
        self.permits.close();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// The registry id of `client`, if it belongs to this pool.
    pub fn instance_id(&self, client: &Arc<F::Client>) -> Option<InstanceId> {
        self.registry
            .lock()
            .slots
            .get(&InstanceKey::of(client))
            .map(|slot| slot.id)
    }

    /// The reservation state of `client`, if it belongs to this pool.
    pub fn state_of(&self, client: &Arc<F::Client>) -> Option<ReservationState> {
        self.registry
            .lock()
            .slots
            .get(&InstanceKey::of(client))
            .map(|slot| slot.state)
    }

    /// Snapshot of the registry and limiter.
    pub fn status(&self) -> PoolStatus {
        let registry = self.registry.lock();
        PoolStatus {
            max_pool: self.config.max_pool,
            size: registry.slots.len(),
            available: registry.count(ReservationState::Available),
            reserved: registry.count(ReservationState::Reserved),
            permits: self.permits.available_permits(),
        }
    }

    /// Cumulative counters.
    pub fn stats(&self) -> PoolStats {
        self.registry.lock().stats.clone()
    }

    /// Configuration for this pool
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The factory backing this pool
    pub fn factory(&self) -> &F {
        &self.factory
    }
}

impl<F: Factory> fmt::Debug for ClientPool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientPool")
            .field("flavor", &self.factory.flavor())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::FnFactory;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("browser failed to start")]
    struct StartFailed;

    #[derive(Debug)]
    struct Browser {
        serial: usize,
    }

    fn counting_factory(
        built: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
    ) -> FnFactory<impl Fn() -> Result<Browser, StartFailed> + Send + Sync> {
        FnFactory::new(move || {
            if fail.load(Ordering::SeqCst) {
                return Err(StartFailed);
            }
            Ok(Browser {
                serial: built.fetch_add(1, Ordering::SeqCst),
            })
        })
    }

    fn pool(max_pool: usize) -> ClientPool<impl Factory<Client = Browser, Error = StartFailed>> {
        let factory = counting_factory(Arc::default(), Arc::default());
        ClientPool::with_capacity(factory, max_pool).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let factory = counting_factory(Arc::default(), Arc::default());
        assert!(ClientPool::with_capacity(factory, 0).is_err());
    }

    #[tokio::test]
    async fn test_acquire_marks_reserved() {
        let pool = pool(2);

        let browser = pool.acquire().await.unwrap();
        assert_eq!(pool.state_of(&browser), Some(ReservationState::Reserved));
        assert!(pool.instance_id(&browser).is_some());

        let status = pool.status();
        assert_eq!(status.size, 1);
        assert_eq!(status.reserved, 1);
        assert_eq!(status.available, 0);
        assert_eq!(status.permits, 1);
    }

    #[tokio::test]
    async fn test_release_restores_permit_and_state() {
        let pool = pool(2);

        let browser = pool.acquire().await.unwrap();
        pool.release(&browser).unwrap();

        assert_eq!(pool.state_of(&browser), Some(ReservationState::Available));
        let status = pool.status();
        assert_eq!(status.permits, 2);
        assert_eq!(status.available, 1);
        assert_eq!(pool.stats().total_returns, 1);
    }

    #[tokio::test]
    async fn test_released_instance_is_reused() {
        let pool = pool(1);

        let first = pool.acquire().await.unwrap();
        pool.release(&first).unwrap();
        let second = pool.acquire().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.serial, 0);
        assert_eq!(pool.stats().total_created, 1);
        assert_eq!(pool.stats().total_checkouts, 2);
    }

    #[tokio::test]
    async fn test_double_release_is_reported() {
        let pool = pool(1);

        let browser = pool.acquire().await.unwrap();
        let id = pool.instance_id(&browser).unwrap();
        pool.release(&browser).unwrap();

        match pool.release(&browser) {
            Err(PoolError::NotReserved(reported)) => assert_eq!(reported, id),
            other => panic!("expected NotReserved, got {:?}", other),
        }
        // The failed release must not mint an extra permit.
        assert_eq!(pool.status().permits, 1);
    }

    #[test]
    fn test_foreign_release_is_reported() {
        let pool = pool(1);
        let stranger = Arc::new(Browser { serial: 99 });

        assert!(matches!(
            pool.release(&stranger),
            Err(PoolError::UnknownInstance)
        ));
        assert_eq!(pool.status().permits, 1);
    }

    #[tokio::test]
    async fn test_construction_failure_restores_permit() {
        let fail = Arc::new(AtomicBool::new(true));
        let factory = counting_factory(Arc::default(), Arc::clone(&fail));
        let pool = ClientPool::with_capacity(factory, 1).unwrap();

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, PoolError::Construction(StartFailed)));
        assert_eq!(pool.status().permits, 1);
        assert_eq!(pool.status().size, 0);
        assert_eq!(pool.stats().creation_failures, 1);

        fail.store(false, Ordering::SeqCst);
        let browser = pool
            .acquire_timeout(Duration::from_secs(1))
            .await
            .expect("permit must survive a failed construction");
        assert_eq!(browser.serial, 0);
    }

    #[test]
    fn test_try_acquire_reports_exhaustion() {
        let pool = pool(1);

        let browser = pool.try_acquire().unwrap();
        assert!(matches!(pool.try_acquire(), Err(PoolError::Exhausted)));

        pool.release(&browser).unwrap();
        assert!(pool.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn test_acquire_timeout_expires_without_side_effects() {
        let pool = pool(1);
        let _held = pool.acquire().await.unwrap();

        let err = pool
            .acquire_timeout(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::Timeout(_)));

        let status = pool.status();
        assert_eq!(status.size, 1);
        assert_eq!(status.permits, 0);
    }

    #[tokio::test]
    async fn test_configured_timeout_applies_to_acquire() {
        let factory = counting_factory(Arc::default(), Arc::default());
        let config = PoolConfig::with_capacity(1).acquire_timeout(Duration::from_millis(20));
        let pool = ClientPool::new(factory, config).unwrap();

        let _held = pool.acquire().await.unwrap();
        assert!(matches!(pool.acquire().await, Err(PoolError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_acquire() {
        let pool = pool(1);
        let browser = pool.acquire().await.unwrap();

        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(pool.acquire().await, Err(PoolError::Closed)));
        assert!(matches!(pool.try_acquire(), Err(PoolError::Closed)));

        // Outstanding instances can still be returned.
        assert!(pool.release(&browser).is_ok());
    }

    #[tokio::test]
    async fn test_sequential_cycles_do_not_grow_registry() {
        let pool = pool(3);

        for _ in 0..50 {
            let browser = pool.acquire().await.unwrap();
            pool.release(&browser).unwrap();
        }

        assert_eq!(pool.status().size, 1);
        assert_eq!(pool.stats().total_created, 1);
    }
}
