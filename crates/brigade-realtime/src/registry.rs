//! Category-keyed handler registry.
//!
//! Handlers are held by `Weak` reference: the registry never keeps a handler
//! alive. The owner keeps it alive through the [`Subscription`] (or its own
//! [`Handler`] clone); once every strong reference is gone the entry is skipped
//! and pruned.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use brigade_core::{Payload, UiCategory};
use parking_lot::Mutex;
use tracing::{debug, error};

pub type HandlerFn = dyn Fn(&Payload) + Send + Sync;

/// A shared event callback. Identity is the allocation, not the closure body.
pub type Handler = Arc<HandlerFn>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Payload) + Send + Sync + 'static,
{
    Arc::new(f)
}

fn same_handler(entry: &Weak<HandlerFn>, handler: &Handler) -> bool {
    std::ptr::addr_eq(entry.as_ptr(), Arc::as_ptr(handler))
}

#[derive(Default)]
pub struct SubscriberRegistry {
    handlers: Mutex<HashMap<UiCategory, Vec<Weak<HandlerFn>>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handler` under `category`. Returns `false` if it was already there.
    pub fn register(&self, category: UiCategory, handler: &Handler) -> bool {
        let mut handlers = self.handlers.lock();
        let entries = handlers.entry(category).or_default();
        entries.retain(|w| w.strong_count() > 0);
        if entries.iter().any(|w| same_handler(w, handler)) {
            debug!(%category, "handler already registered");
            return false;
        }
        entries.push(Arc::downgrade(handler));
        true
    }

    /// Remove `handler` from `category`. Unknown handlers are a no-op.
    pub fn unregister(&self, category: UiCategory, handler: &Handler) -> bool {
        let mut handlers = self.handlers.lock();
        let Some(entries) = handlers.get_mut(&category) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|w| !same_handler(w, handler) && w.strong_count() > 0);
        entries.len() != before
    }

    /// Invoke every live handler for `category` in registration order.
    ///
    /// Handlers run outside the lock, so they may (un)subscribe freely. A
    /// panicking handler is logged and does not stop the others. Returns the
    /// number of handlers invoked.
    pub fn dispatch(&self, category: UiCategory, payload: &Payload) -> usize {
        let live: Vec<Handler> = {
            let mut handlers = self.handlers.lock();
            let Some(entries) = handlers.get_mut(&category) else {
                return 0;
            };
            entries.retain(|w| w.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };

        for (index, h) in live.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| h(payload))).is_err() {
                error!(%category, index, "subscriber panicked during dispatch");
            }
        }
        live.len()
    }

    /// Number of live handlers under `category`.
    pub fn handler_count(&self, category: UiCategory) -> usize {
        self.handlers
            .lock()
            .get(&category)
            .map(|entries| entries.iter().filter(|w| w.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Register and return a [`Subscription`] that keeps `handler` alive.
    pub fn subscribe(self: &Arc<Self>, category: UiCategory, handler: Handler) -> Subscription {
        let _ = self.register(category, &handler);
        Subscription {
            registry: Arc::downgrade(self),
            category,
            handler,
        }
    }
}

/// Disposer returned by `subscribe`.
///
/// Dropping it releases the handler, which stops further deliveries;
/// [`Subscription::unsubscribe`] removes the entry right away and may be
/// called any number of times.
#[must_use = "dropping a Subscription stops delivery to its handler"]
pub struct Subscription {
    registry: Weak<SubscriberRegistry>,
    category: UiCategory,
    handler: Handler,
}

impl Subscription {
    pub fn category(&self) -> UiCategory {
        self.category
    }

    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            let _ = registry.unregister(self.category, &self.handler);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}
