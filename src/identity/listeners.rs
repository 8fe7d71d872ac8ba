//! Identity change listeners and their subscription handles.
//!
//! DESIGN
//! ======
//! Listeners live in a `BTreeMap` keyed by a monotonically increasing id, so
//! delivery order is registration order. A [`Subscription`] holds a weak
//! reference back to the map: cancelling after the registry is gone is a
//! no-op, and a subscription can release its listener at most once.
//!
//! Emission snapshots the listener set before calling out, so a listener may
//! cancel itself (or register another) without deadlocking. A panicking
//! listener is logged and skipped; it never unwinds into the emitter.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::error;

use super::types::{Identity, IdentityEvent};

/// Unique identifier for a registered listener.
pub type ListenerId = u64;

/// Callback invoked on every identity transition.
pub type IdentityHandler = Arc<dyn Fn(IdentityEvent, Option<Identity>) + Send + Sync>;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new process-unique listener id.
pub fn next_listener_id() -> ListenerId {
    NEXT_LISTENER_ID.fetch_add(1, Ordering::SeqCst)
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

type Canceller = Box<dyn FnOnce(ListenerId) + Send>;

/// Handle for one listener registration. Cancels on drop.
pub struct Subscription {
    id: ListenerId,
    canceller: Mutex<Option<Canceller>>,
}

impl Subscription {
    /// Creates a subscription that runs `canceller` exactly once.
    pub fn new(id: ListenerId, canceller: impl FnOnce(ListenerId) + Send + 'static) -> Self {
        Self { id, canceller: Mutex::new(Some(Box::new(canceller))) }
    }

    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Stop delivery. Returns `true` only for the call that released the
    /// listener; later calls are no-ops.
    pub fn cancel(&self) -> bool {
        let canceller = self
            .canceller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match canceller {
            Some(cancel) => {
                cancel(self.id);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.canceller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

type HandlerMap = Mutex<BTreeMap<ListenerId, IdentityHandler>>;

/// Set of identity listeners owned by an identity backend.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    handlers: Arc<HandlerMap>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return a subscription that removes it.
    pub fn register(&self, handler: IdentityHandler) -> Subscription {
        let id = self.insert(handler);
        let weak: Weak<HandlerMap> = Arc::downgrade(&self.handlers);
        Subscription::new(id, move |id| {
            if let Some(map) = weak.upgrade() {
                map.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
            }
        })
    }

    /// Insert a listener without a handle. Pair with [`ListenerRegistry::remove`].
    pub fn insert(&self, handler: IdentityHandler) -> ListenerId {
        let id = next_listener_id();
        self.lock().insert(id, handler);
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.lock().remove(&id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Deliver an event to every listener. Returns how many ran to completion.
    pub fn emit(&self, event: IdentityEvent, identity: Option<&Identity>) -> usize {
        let snapshot: Vec<(ListenerId, IdentityHandler)> = self
            .lock()
            .iter()
            .map(|(id, handler)| (*id, Arc::clone(handler)))
            .collect();

        snapshot
            .into_iter()
            .filter(|(id, handler)| deliver(*id, handler, event, identity))
            .count()
    }

    /// Deliver an event to a single listener, if still registered.
    pub fn emit_to(&self, id: ListenerId, event: IdentityEvent, identity: Option<&Identity>) -> bool {
        let handler = self.lock().get(&id).map(Arc::clone);
        handler.is_some_and(|handler| deliver(id, &handler, event, identity))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ListenerId, IdentityHandler>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn deliver(id: ListenerId, handler: &IdentityHandler, event: IdentityEvent, identity: Option<&Identity>) -> bool {
    let outcome = catch_unwind(AssertUnwindSafe(|| handler(event, identity.cloned())));
    if outcome.is_err() {
        error!(listener = id, event = event.as_str(), "identity listener panicked; event dropped for this listener");
        return false;
    }
    true
}

#[cfg(test)]
#[path = "listeners_test.rs"]
mod tests;
