//! Cross-screen change signal for the cart.
//!
//! Screens are mounted independently and share no in-memory state, so a
//! cart mutation on one screen has to poke the others into reloading the
//! persisted blob. The signal carries no payload; a notified screen
//! re-reads the cart itself.
//!
//! Delivery contract: best-effort, synchronous, in-process, in
//! registration order, no replay. A handler registered after an emit never
//! sees that emit, which is why screens also reload eagerly on mount.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Handler = Arc<dyn Fn() + Send + Sync>;
type HandlerList = Mutex<Vec<(u64, Handler)>>;

/// A zero-payload change signal.
///
/// One implementation per target platform, chosen at the composition root;
/// the cart store and the screens only see this trait.
pub trait Broadcaster: Send + Sync {
    /// Notify all current subscribers that the cart changed.
    fn emit(&self);

    /// Register a handler for future emissions. Dropping the returned
    /// [`Subscription`] unregisters it.
    fn subscribe(&self, handler: Box<dyn Fn() + Send + Sync>) -> Subscription;
}

/// Disposer for a registered handler.
///
/// Unsubscribes explicitly via [`Subscription::unsubscribe`] or implicitly
/// on drop (screens keep it alive for their mounted lifetime).
pub struct Subscription {
    handlers: Weak<HandlerList>,
    id: u64,
}

impl Subscription {
    /// Unregister the handler now.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

/// In-process broadcaster: a plain subscriber registry.
#[derive(Clone, Default)]
pub struct InProcessBus {
    handlers: Arc<HandlerList>,
    next_id: Arc<AtomicU64>,
}

impl InProcessBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Broadcaster for InProcessBus {
    fn emit(&self) {
        // Snapshot under the lock, invoke outside it, so handlers may
        // subscribe or unsubscribe re-entrantly without deadlocking.
        let snapshot: Vec<Handler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in snapshot {
            handler();
        }
    }

    fn subscribe(&self, handler: Box<dyn Fn() + Send + Sync>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::from(handler)));

        Subscription {
            handlers: Arc::downgrade(&self.handlers),
            id,
        }
    }
}
