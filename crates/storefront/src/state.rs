//! Application state shared across front ends.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::services::{ApiClient, ApiError, CartStore, Checkout, IdentityResolver};
use crate::storage::{CartStorage, FileStore, KeyValueStore, StorageError};

/// Errors that can occur while wiring up application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("api client error: {0}")]
    Api(#[from] ApiError),
}

/// Application state shared by every surface.
///
/// This struct is cheaply cloneable via `Arc`. There is exactly one
/// [`CartStore`] per state, so every surface observes the same cart.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn KeyValueStore>,
    identity: IdentityResolver,
    cart: CartStore,
    api: ApiClient,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create application state backed by the file at `config.storage_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage file cannot be opened or the HTTP
    /// client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let store = Arc::new(FileStore::open(&config.storage_path)?);
        Self::with_store(config, store)
    }

    /// Create application state over an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_store(
        config: StorefrontConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, StateError> {
        let identity = IdentityResolver::new(Arc::clone(&store));
        let cart = CartStore::new(CartStorage::new(Arc::clone(&store)), identity.clone());
        let api = ApiClient::new(&config.api, identity.clone())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                identity,
                cart,
                api,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the durable key-value store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityResolver {
        &self.inner.identity
    }

    /// Get a reference to the shared cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Start a checkout over the shared cart, submitting through the API.
    #[must_use]
    pub fn checkout(&self) -> Checkout<ApiClient> {
        Checkout::new(self.inner.cart.clone(), self.inner.api.clone())
    }
}
