//! Composition root.
//!
//! [`AppState`] wires the storefront together exactly once: one shared
//! bearer-token slot between the auth and query clients, one cart store
//! over the device's storage, one in-process change bus. Screens receive
//! it by clone and build their per-screen services from it.

use std::sync::Arc;

use tracing::instrument;

use mercato_core::PaymentMethod;

use crate::backend::{AuthClient, AuthError, BackendClient, Order, TokenSlot};
use crate::cart::{CartStore, FileStorage, InProcessBus};
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::services::{
    AccountService, CatalogService, FavoritesService, OrderHistoryService, OrderSubmitter,
};

/// Shared application state. Cheap to clone; all clones are the same app.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    auth: AuthClient,
    cart: CartStore,
}

impl AppState {
    /// Wire up the storefront from its configuration.
    ///
    /// The bearer-token slot is shared between the auth client (which
    /// fills it on sign-in) and the query client (which reads it per
    /// request), so the backend's row security always sees the current
    /// user.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let bearer = TokenSlot::default();
        let backend = BackendClient::new(&config.backend, bearer.clone());
        let auth = AuthClient::new(&config.backend, bearer);
        let cart = CartStore::new(
            Arc::new(FileStorage::new(&config.data_dir)),
            Arc::new(InProcessBus::new()),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                auth,
                cart,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    // =========================================================================
    // Per-screen services
    // =========================================================================

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(&self.inner.backend)
    }

    #[must_use]
    pub fn favorites(&self) -> FavoritesService<'_> {
        FavoritesService::new(&self.inner.backend)
    }

    #[must_use]
    pub fn orders(&self) -> OrderHistoryService<'_> {
        OrderHistoryService::new(&self.inner.backend)
    }

    #[must_use]
    pub fn account(&self) -> AccountService<'_> {
        AccountService::new(&self.inner.backend)
    }

    /// A fresh submitter for one checkout screen.
    #[must_use]
    pub fn submitter(&self) -> OrderSubmitter<BackendClient> {
        OrderSubmitter::new(self.inner.backend.clone(), self.inner.cart.clone())
    }

    /// Place the current cart as an order for the signed-in user.
    ///
    /// Convenience over [`Self::submitter`] for callers that do not track
    /// submission state themselves.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` when nobody is signed in, otherwise
    /// whatever the submission itself returns.
    #[instrument(skip(self))]
    pub async fn place_order(&self, payment_method: PaymentMethod) -> Result<Option<Order>> {
        let user = self.inner.auth.current_user().ok_or(AuthError::NotSignedIn)?;
        let placed = self
            .submitter()
            .submit(Some(&user.id), payment_method)
            .await?;
        Ok(placed)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
