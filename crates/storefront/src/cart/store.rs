//! Write-through cart store.
//!
//! The single source of truth for the device-local cart. Every mutation is
//! load → mutate → persist → broadcast; screens never hold a long-lived
//! in-memory cart, they reload on mount and on every broadcast.
//!
//! Constructed once at the composition root and handed to screens by
//! reference (it is cheap to clone), never rediscovered per-screen.

use std::sync::Arc;

use tracing::instrument;

use mercato_core::ProductId;

use super::broadcast::{Broadcaster, Subscription};
use super::storage::{CartStorage, PersistenceError, keys};
use super::{Cart, CartLine};

/// The injected cart service.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    storage: Arc<dyn CartStorage>,
    bus: Arc<dyn Broadcaster>,
}

impl CartStore {
    /// Create a store over the platform's storage and broadcaster.
    #[must_use]
    pub fn new(storage: Arc<dyn CartStorage>, bus: Arc<dyn Broadcaster>) -> Self {
        Self {
            inner: Arc::new(CartStoreInner { storage, bus }),
        }
    }

    /// Observe cart changes (one signal per successful `save`).
    pub fn subscribe(&self, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.inner.bus.subscribe(Box::new(handler))
    }

    /// Load the persisted cart.
    ///
    /// Missing or unreadable storage and corrupt blobs all degrade to an
    /// empty cart; a cart that cannot be read is indistinguishable from a
    /// cart that was never started, and neither should take the screen
    /// down.
    #[must_use]
    pub fn load(&self) -> Cart {
        let blob = match self.inner.storage.read(keys::CART) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Cart::new(),
            Err(e) => {
                tracing::warn!("cart blob unreadable, starting empty: {e}");
                return Cart::new();
            }
        };

        match serde_json::from_str(&blob) {
            Ok(cart) => cart,
            Err(e) => {
                tracing::warn!("cart blob corrupt, starting empty: {e}");
                Cart::new()
            }
        }
    }

    /// Persist the cart and broadcast the change.
    ///
    /// Exactly one signal is emitted per successful save; a failed write
    /// emits nothing, since observers would reload the old state.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` when the blob cannot be stored.
    #[instrument(skip(self, cart), fields(lines = cart.len()))]
    pub fn save(&self, cart: &Cart) -> Result<(), PersistenceError> {
        let blob = serde_json::to_string(cart).map_err(|e| PersistenceError::Write {
            key: keys::CART.to_owned(),
            reason: e.to_string(),
        })?;

        self.inner.storage.write(keys::CART, &blob)?;
        self.inner.bus.emit();
        Ok(())
    }

    // =========================================================================
    // Write-through mutations
    // =========================================================================

    /// Add a line, or remove an existing duplicate (the add button doubles
    /// as a remove toggle; see [`Cart::add_or_toggle`]).
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` when persisting fails; the stored
    /// cart is unchanged in that case.
    pub fn add_or_toggle(&self, line: CartLine) -> Result<Cart, PersistenceError> {
        let mut cart = self.load();
        cart.add_or_toggle(line);
        self.save(&cart)?;
        Ok(cart)
    }

    /// Adjust a line's quantity by `delta` (dropping it at 0).
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` when persisting fails.
    pub fn change_quantity(&self, id: &ProductId, delta: i64) -> Result<Cart, PersistenceError> {
        let mut cart = self.load();
        cart.change_quantity(id, delta);
        self.save(&cart)?;
        Ok(cart)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` when persisting fails.
    pub fn remove(&self, id: &ProductId) -> Result<Cart, PersistenceError> {
        let mut cart = self.load();
        cart.remove(id);
        self.save(&cart)?;
        Ok(cart)
    }

    /// Empty the cart (after a successful order submission).
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` when persisting fails.
    pub fn clear(&self) -> Result<Cart, PersistenceError> {
        let cart = Cart::new();
        self.save(&cart)?;
        Ok(cart)
    }

    // =========================================================================
    // Post-purchase flag
    // =========================================================================

    /// Mark that a purchase just succeeded.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Write` when the flag cannot be stored.
    pub fn set_purchase_flag(&self) -> Result<(), PersistenceError> {
        self.inner.storage.write(keys::PURCHASE_FLAG, "1")
    }

    /// Consume the post-purchase flag.
    ///
    /// Returns `true` at most once per purchase; read or remove failures
    /// degrade to `false` (the success banner is cosmetic).
    #[must_use]
    pub fn take_purchase_flag(&self) -> bool {
        match self.inner.storage.read(keys::PURCHASE_FLAG) {
            Ok(Some(_)) => {
                if let Err(e) = self.inner.storage.remove(keys::PURCHASE_FLAG) {
                    tracing::warn!("failed to consume purchase flag: {e}");
                }
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("failed to read purchase flag: {e}");
                false
            }
        }
    }
}
