//! Shared application state.

use std::sync::Arc;

use crate::commerce::{
    CartApi, CartClient, CatalogApi, CatalogClient, CommerceHttp, CustomerApi, CustomerClient,
};
use crate::config::{CommerceConfig, ConfigError};
use crate::session::{CartBadge, MemorySessionStorage, SessionStore, SessionStorage};

/// Shared state wiring the commerce clients and session stores together.
///
/// Cheaply cloneable; all clones share the same token cache, session and
/// badge. The backends are trait objects so tests can swap in in-memory
/// fakes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CommerceConfig,
    catalog: Arc<dyn CatalogApi>,
    cart: Arc<dyn CartApi>,
    customers: Arc<dyn CustomerApi>,
    session: SessionStore,
    badge: CartBadge,
}

impl AppState {
    /// Build state from the environment, backed by the real platform.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = CommerceConfig::from_env()?;
        Ok(Self::new(config, Arc::new(MemorySessionStorage::default())))
    }

    /// Build state from an explicit configuration and session storage.
    #[must_use]
    pub fn new(config: CommerceConfig, storage: Arc<dyn SessionStorage>) -> Self {
        let http = CommerceHttp::new(&config);
        Self::with_backends(
            config,
            Arc::new(CatalogClient::new(http.clone())),
            Arc::new(CartClient::new(http.clone())),
            Arc::new(CustomerClient::new(http)),
            storage,
        )
    }

    /// Build state on explicit backends. Tests use this to inject fakes.
    #[must_use]
    pub fn with_backends(
        config: CommerceConfig,
        catalog: Arc<dyn CatalogApi>,
        cart: Arc<dyn CartApi>,
        customers: Arc<dyn CustomerApi>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                cart,
                customers,
                session: SessionStore::new(storage),
                badge: CartBadge::default(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CommerceConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogApi {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn cart(&self) -> &dyn CartApi {
        self.inner.cart.as_ref()
    }

    #[must_use]
    pub fn customers(&self) -> &dyn CustomerApi {
        self.inner.customers.as_ref()
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn badge(&self) -> &CartBadge {
        &self.inner.badge
    }
}
