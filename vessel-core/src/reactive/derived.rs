//! Derived Atom Implementation
//!
//! A derived atom caches the result of a computation over a fixed list of
//! dependencies and recomputes it whenever any of them changes.
//!
//! # How Derived Atoms Work
//!
//! 1. On construction the computation runs once, eagerly, to seed the
//!    cached value.
//!
//! 2. One listener is registered on every dependency.
//!
//! 3. When a dependency notifies, the computation runs again in full, its
//!    result overwrites the cached value, and the derived atom's own
//!    listeners are notified. This happens even when the result equals the
//!    previous one: every upstream notification produces exactly one
//!    downstream notification.
//!
//! # Consistency
//!
//! Recomputation happens once per upstream notification. Two dependencies
//! written by two separate calls cause two recomputations, and a listener
//! may observe the intermediate value computed from one new and one old
//! input. The same holds for diamonds (`a -> b`, `a -> c`, `{b, c} -> d`):
//! `d` first recomputes with only one side updated. Nothing is deferred or
//! batched.
//!
//! # Lifetime
//!
//! The dependency list is fixed at construction and never rewired. There
//! is no explicit teardown: while the derived atom lives it stays
//! subscribed to its dependencies. The listeners hold it weakly, and when
//! the last handle is dropped its subscriptions are removed from every
//! dependency. Dependency cycles cannot be built through this API, since a
//! dependency must exist before its dependent.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use smallvec::SmallVec;
use tracing::debug;

use super::atom::{Notify, Observable, Readable};
use super::listener::Subscription;
use super::store::Store;
use crate::graph::{AtomId, NodeKind};

struct DerivedInner<T> {
    /// Cached value and downstream listeners.
    store: Store<T>,

    compute: Box<dyn Fn() -> T + Send + Sync>,

    /// Number of recomputations after the initial evaluation.
    recomputes: AtomicU64,

    /// One registration per dependency, removed on drop.
    wiring: SmallVec<[Subscription; 4]>,
}

impl<T> DerivedInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn recompute(&self) {
        let count = self.recomputes.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(derived = %self.store.id(), recompute = count, "recomputing derived atom");
        self.store.overwrite(Arc::new((self.compute)()));
    }
}

impl<T> Drop for DerivedInner<T> {
    fn drop(&mut self) {
        for subscription in &self.wiring {
            subscription.unsubscribe();
        }
    }
}

/// A read-only cell computed from other cells.
///
/// # Example
///
/// ```rust
/// use vessel_core::reactive::{Atom, Derived};
///
/// let a = Atom::new(2);
/// let b = Derived::new({
///     let a = a.clone();
///     move || a.get() * 2
/// }, &[&a]);
///
/// assert_eq!(b.get(), 4);
/// a.set(5);
/// assert_eq!(b.get(), 10);
/// ```
pub struct Derived<T> {
    inner: Arc<DerivedInner<T>>,
    dependencies: SmallVec<[AtomId; 4]>,
    name: Option<Arc<str>>,
}

impl<T> Derived<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a derived atom over `dependencies`.
    ///
    /// `compute` runs immediately and then after every change of any
    /// dependency. It should read exactly the cells listed; reads of
    /// unlisted cells are not tracked.
    pub fn new<F>(compute: F, dependencies: &[&dyn Observable]) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let initial = compute();
        let inner = Arc::new_cyclic(|weak: &Weak<DerivedInner<T>>| {
            let wiring = dependencies
                .iter()
                .map(|dependency| {
                    let weak = Weak::clone(weak);
                    dependency.observe(Arc::new(move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.recompute();
                        }
                    }))
                })
                .collect();
            DerivedInner {
                store: Store::new(initial),
                compute: Box::new(compute),
                recomputes: AtomicU64::new(0),
                wiring,
            }
        });

        let dependencies: SmallVec<[AtomId; 4]> =
            dependencies.iter().map(|dependency| dependency.id()).collect();
        debug!(
            derived = %inner.store.id(),
            dependencies = dependencies.len(),
            "derived atom wired"
        );

        Self {
            inner,
            dependencies,
            name: None,
        }
    }

    /// Attach a diagnostic label.
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> AtomId {
        self.inner.store.id()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the cached value.
    pub fn get(&self) -> T {
        (*self.inner.store.get_state()).clone()
    }

    /// Get the cached value without cloning it out of its snapshot.
    pub fn snapshot(&self) -> Arc<T> {
        self.inner.store.get_state()
    }

    /// Register a listener that runs after every change of the cached value.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.store.subscribe(move |_, _| listener())
    }

    /// Ids of the dependencies, in declaration order.
    pub fn dependencies(&self) -> &[AtomId] {
        &self.dependencies
    }

    /// Number of recomputations since construction, not counting the
    /// initial evaluation.
    pub fn recompute_count(&self) -> u64 {
        self.inner.recomputes.load(Ordering::Relaxed)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.store.listener_count()
    }
}

impl<T> Observable for Derived<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn id(&self) -> AtomId {
        self.inner.store.id()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Derived
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn dependencies(&self) -> &[AtomId] {
        &self.dependencies
    }

    fn observe(&self, listener: Arc<Notify>) -> Subscription {
        self.inner.store.subscribe(move |_, _| listener())
    }
}

impl<T> Readable<T> for Derived<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn get(&self) -> T {
        Derived::get(self)
    }
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            dependencies: self.dependencies.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T> Debug for Derived<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("id", &self.id())
            .field("name", &self.name)
            .field("value", &self.snapshot())
            .field("dependencies", &self.dependencies)
            .field("recompute_count", &self.recompute_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
