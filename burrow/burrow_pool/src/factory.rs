//! Factories that build pooled client instances.
//!
//! A [`Factory`] turns a fixed configuration into an `Arc`-wrapped client.
//! Two flavors exist and the pool does not care which one it holds:
//!
//! - [`FreshFactory`] opens a new client on every call
//! - [`SharedFactory`] opens one client on first use and hands the same
//!   instance to every later caller
//!
//! [`ClientFactory`] carries the configuration for a [`Client`] type and
//! produces either flavor. [`FnFactory`] adapts a closure.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

/// An expensive client that can be opened from a configuration.
///
/// Implemented by the concrete session types (browser drivers, HTTP
/// sessions). Opening may block.
pub trait Client: Sized + Send + Sync + 'static {
    /// Configuration needed to open the client
    type Config: Send + Sync + 'static;

    /// Error raised when opening fails
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new client.
    fn open(config: &Self::Config) -> Result<Self, Self::Error>;
}

/// Which construction policy a factory follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryFlavor {
    /// Every call builds a new instance
    Fresh,

    /// Every call returns the same instance
    Shared,
}

/// Capability to construct pooled instances.
///
/// `create` is synchronous and may perform expensive setup. Failures are
/// returned to the caller unchanged.
pub trait Factory: Send + Sync {
    /// The instance type produced
    type Client: Send + Sync + 'static;

    /// Error raised when construction fails
    type Error: std::error::Error + Send + Sync + 'static;

    /// Construct (or look up) an instance.
    fn create(&self) -> Result<Arc<Self::Client>, Self::Error>;

    /// The construction policy of this factory.
    fn flavor(&self) -> FactoryFlavor;
}

impl<F: Factory + ?Sized> Factory for Arc<F> {
    type Client = F::Client;
    type Error = F::Error;

    fn create(&self) -> Result<Arc<Self::Client>, Self::Error> {
        (**self).create()
    }

    fn flavor(&self) -> FactoryFlavor {
        (**self).flavor()
    }
}

/// Holds the configuration of a client type and hands out factories for it.
pub struct ClientFactory<C: Client> {
    config: C::Config,
}

impl<C: Client> ClientFactory<C> {
    /// Create a factory provider for `config`.
    pub fn new(config: C::Config) -> Self {
        Self { config }
    }

    /// The configuration passed to every `Client::open` call.
    pub fn config(&self) -> &C::Config {
        &self.config
    }

    /// A factory opening a new client per call.
    pub fn into_fresh(self) -> FreshFactory<C> {
        FreshFactory::new(self.config)
    }

    /// A factory opening one client and sharing it.
    pub fn into_shared(self) -> SharedFactory<C> {
        SharedFactory::new(self.config)
    }
}

impl<C: Client> ClientFactory<C>
where
    C::Config: Clone,
{
    /// A fresh-flavor factory over a copy of the configuration.
    pub fn fresh(&self) -> FreshFactory<C> {
        FreshFactory::new(self.config.clone())
    }

    /// A shared-flavor factory over a copy of the configuration.
    ///
    /// Each call returns an independent singleton; wrap the result in an
    /// `Arc` to share one instance between several pools.
    pub fn shared(&self) -> SharedFactory<C> {
        SharedFactory::new(self.config.clone())
    }
}

/// Opens a new client on every call.
pub struct FreshFactory<C: Client> {
    config: C::Config,
}

impl<C: Client> FreshFactory<C> {
    /// Create a fresh-flavor factory.
    pub fn new(config: C::Config) -> Self {
        Self { config }
    }
}

impl<C: Client> Factory for FreshFactory<C> {
    type Client = C;
    type Error = C::Error;

    fn create(&self) -> Result<Arc<C>, C::Error> {
        let client = C::open(&self.config)?;
        debug!("Opened new {} client", short_type_name::<C>());
        Ok(Arc::new(client))
    }

    fn flavor(&self) -> FactoryFlavor {
        FactoryFlavor::Fresh
    }
}

impl<C: Client> fmt::Debug for FreshFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreshFactory")
            .field("client", &short_type_name::<C>())
            .finish()
    }
}

/// Opens one client on first use and returns it from every call.
///
/// Concurrent first calls are serialized; at most one `Client::open` succeeds.
/// A failed open is not cached, so the next call tries again.
pub struct SharedFactory<C: Client> {
    config: C::Config,
    instance: OnceCell<Arc<C>>,
}

impl<C: Client> SharedFactory<C> {
    /// Create a shared-flavor factory.
    pub fn new(config: C::Config) -> Self {
        Self {
            config,
            instance: OnceCell::new(),
        }
    }

    /// Whether the shared instance has been opened.
    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }
}

impl<C: Client> Factory for SharedFactory<C> {
    type Client = C;
    type Error = C::Error;

    fn create(&self) -> Result<Arc<C>, C::Error> {
        let instance = self.instance.get_or_try_init(|| {
            let client = C::open(&self.config)?;
            info!("Opened shared {} client", short_type_name::<C>());
            Ok::<_, C::Error>(Arc::new(client))
        })?;
        Ok(Arc::clone(instance))
    }

    fn flavor(&self) -> FactoryFlavor {
        FactoryFlavor::Shared
    }
}

impl<C: Client> fmt::Debug for SharedFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFactory")
            .field("client", &short_type_name::<C>())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Adapts a closure into a fresh-flavor factory.
pub struct FnFactory<F> {
    build: F,
}

impl<F> FnFactory<F> {
    /// Wrap `build`, which is called once per `create`.
    pub fn new(build: F) -> Self {
        Self { build }
    }
}

impl<F, C, E> Factory for FnFactory<F>
where
    F: Fn() -> Result<C, E> + Send + Sync,
    C: Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Client = C;
    type Error = E;

    fn create(&self) -> Result<Arc<C>, E> {
        (self.build)().map(Arc::new)
    }

    fn flavor(&self) -> FactoryFlavor {
        FactoryFlavor::Fresh
    }
}

impl<F> fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFactory")
    }
}

fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}
