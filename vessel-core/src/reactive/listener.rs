//! Listener registry and subscription handles.
//!
//! Every store keeps its listeners in a [`ListenerSet`]: an insertion-ordered
//! map from [`ListenerId`] to callback. Notification never iterates the map
//! directly; it takes a [`snapshot`](ListenerSet::snapshot) first, so a
//! listener that subscribes or unsubscribes while being notified cannot
//! disturb the pass in progress.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

/// Unique identifier for a listener registration.
///
/// Registering the same callback twice yields two ids and two independent
/// registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased removal, so a [`Subscription`] does not carry the listener's
/// signature.
trait Detach: Send + Sync {
    fn detach(&self, id: ListenerId) -> bool;
}

/// Ordered set of listeners of type `L` (usually an unsized `dyn Fn`).
pub(crate) struct ListenerSet<L: ?Sized> {
    entries: RwLock<IndexMap<ListenerId, Arc<L>>>,
}

impl<L> ListenerSet<L>
where
    L: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
        }
    }

    /// Register a listener at the end of the notification order.
    pub(crate) fn insert(self: &Arc<Self>, listener: Arc<L>) -> Subscription {
        let id = ListenerId::new();
        self.entries.write().insert(id, listener);

        let registry: Weak<dyn Detach> = Arc::downgrade(self) as Weak<dyn Detach>;
        Subscription {
            id,
            registry,
            active: AtomicBool::new(true),
        }
    }

    /// Remove a registration, keeping the relative order of the rest.
    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        self.entries.write().shift_remove(&id).is_some()
    }

    /// Copy the current listeners, in registration order.
    ///
    /// The lock is released before the caller invokes anything.
    pub(crate) fn snapshot(&self) -> Vec<Arc<L>> {
        self.entries.read().values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl<L> Detach for ListenerSet<L>
where
    L: ?Sized + Send + Sync + 'static,
{
    fn detach(&self, id: ListenerId) -> bool {
        self.remove(id)
    }
}

/// Handle returned by every `subscribe` call.
///
/// [`unsubscribe`](Self::unsubscribe) removes exactly the registration that
/// produced this handle; calling it again is a no-op. Dropping the handle
/// leaves the listener registered.
pub struct Subscription {
    id: ListenerId,
    registry: Weak<dyn Detach>,
    active: AtomicBool,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove this registration. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.detach(self.id);
        }
    }

    /// Whether `unsubscribe` has not been called yet.
    ///
    /// Stays `true` when the store itself is gone.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
