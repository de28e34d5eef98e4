//! Subscription registry for foreground push messages.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::payload::PushMessage;
use crate::lock;

pub type MessageHandler = Arc<dyn Fn(&PushMessage) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    handlers: Mutex<BTreeMap<HandlerId, MessageHandler>>,
}

/// Handlers in registration order. Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    inner: Arc<RegistryInner>,
}

impl HandlerRegistry {
    pub fn add<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&PushMessage) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.handlers).insert(id, Arc::new(handler));
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    pub fn remove(&self, id: HandlerId) -> bool {
        lock(&self.inner.handlers).remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.handlers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `message` to every handler. Returns how many succeeded.
    ///
    /// Handlers run on a snapshot taken before delivery, so a handler may
    /// unsubscribe itself without deadlocking.
    pub fn dispatch(&self, message: &PushMessage) -> usize {
        let snapshot: Vec<(HandlerId, MessageHandler)> = lock(&self.inner.handlers)
            .iter()
            .map(|(id, h)| (*id, Arc::clone(h)))
            .collect();

        let mut delivered = 0;
        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(message))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(handler = id.0, error = %e, "Push message handler failed");
                }
                Err(_) => {
                    tracing::error!(handler = id.0, "Push message handler panicked");
                }
            }
        }
        delivered
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.len())
            .finish()
    }
}

/// Keeps a handler registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription removes the handler"]
#[derive(Debug)]
pub struct Subscription {
    id: HandlerId,
    registry: Weak<RegistryInner>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the handler registered for the registry's lifetime; it can still
    /// be removed explicitly through its id.
    pub fn detach(mut self) -> HandlerId {
        self.active = false;
        self.id
    }

    fn release(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        if let Some(inner) = self.registry.upgrade() {
            lock(&inner.handlers).remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
