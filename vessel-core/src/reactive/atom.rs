//! Atom Implementation
//!
//! An Atom is a single-value reactive cell backed by its own [`Store`].
//! Atom listeners take no arguments: they only learn that something
//! changed and pull the new value with [`Atom::get`] if they care. That
//! keeps derived atoms independent of the shape of what they depend on.

use std::fmt::{self, Debug};
use std::sync::Arc;

use super::listener::Subscription;
use super::patch::Patch;
use super::store::Store;
use crate::graph::{AtomId, Node, NodeKind};

/// Argument-less change notification shared by atoms and derived atoms.
pub type Notify = dyn Fn() + Send + Sync;

/// Anything a derived atom can depend on.
///
/// Object safe, so one derived atom can depend on cells of different value
/// types.
pub trait Observable: Send + Sync {
    /// Id of the underlying store.
    fn id(&self) -> AtomId;

    fn kind(&self) -> NodeKind;

    /// Diagnostic label, if one was given.
    fn name(&self) -> Option<&str>;

    /// Ids this cell reads from. Empty for primitive atoms.
    fn dependencies(&self) -> &[AtomId];

    /// Register an argument-less change listener.
    fn observe(&self, listener: Arc<Notify>) -> Subscription;

    /// Describe this cell as a graph node.
    fn node(&self) -> Node {
        Node::new(
            self.id(),
            self.kind(),
            self.name().map(str::to_owned),
            self.dependencies().to_vec(),
        )
    }
}

/// A cell whose current value can be read.
pub trait Readable<T>: Observable {
    fn get(&self) -> T;
}

/// A writable reactive cell.
///
/// # Example
///
/// ```rust
/// use vessel_core::reactive::Atom;
///
/// let count = Atom::new(5);
/// assert_eq!(count.get(), 5);
///
/// count.set(7);
/// assert_eq!(count.get(), 7);
/// ```
pub struct Atom<T> {
    store: Store<T>,
    name: Option<Arc<str>>,
}

impl<T> Atom<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new atom with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            store: Store::new(value),
            name: None,
        }
    }

    /// Attach a diagnostic label.
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> AtomId {
        self.store.id()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        (*self.store.get_state()).clone()
    }

    /// Get the current value without cloning it out of its snapshot.
    pub fn snapshot(&self) -> Arc<T> {
        self.store.get_state()
    }

    /// Replace the value. Listeners fire only if it changed.
    pub fn set(&self, value: T) {
        self.store.replace_state(Patch::value(value));
    }

    /// Replace the value with a function of the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.store.replace_state(Patch::with(f));
    }

    /// Register a listener that runs after every change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store.subscribe(move |_, _| listener())
    }

    /// Get the number of listeners, including derived atoms wired to this one.
    pub fn listener_count(&self) -> usize {
        self.store.listener_count()
    }
}

impl<T> Observable for Atom<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn id(&self) -> AtomId {
        self.store.id()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Primitive
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn dependencies(&self) -> &[AtomId] {
        &[]
    }

    fn observe(&self, listener: Arc<Notify>) -> Subscription {
        self.store.subscribe(move |_, _| listener())
    }
}

impl<T> Readable<T> for Atom<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn get(&self) -> T {
        Atom::get(self)
    }
}

impl<T> Clone for Atom<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T> Debug for Atom<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom")
            .field("id", &self.id())
            .field("name", &self.name)
            .field("value", &self.snapshot())
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn atom_get_and_set() {
        let atom = Atom::new(5);
        assert_eq!(atom.get(), 5);

        atom.set(7);
        assert_eq!(atom.get(), 7);
    }

    #[test]
    fn atom_update() {
        let atom = Atom::new(10);
        atom.update(|v| v + 5);
        assert_eq!(atom.get(), 15);
    }

    #[test]
    fn atom_notifies_once_per_change() {
        let atom = Atom::new(5);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let _sub = atom.subscribe(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        atom.set(7);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        // Same value again: no notification.
        atom.set(7);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        atom.set(8);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn atom_unsubscribe() {
        let atom = Atom::new(0);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let sub = atom.subscribe(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        atom.set(1);
        sub.unsubscribe();
        atom.set(2);

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(atom.listener_count(), 0);
    }

    #[test]
    fn atom_clone_shares_state() {
        let atom1 = Atom::new(0);
        let atom2 = atom1.clone();

        atom1.set(42);
        assert_eq!(atom2.get(), 42);

        atom2.set(100);
        assert_eq!(atom1.get(), 100);
        assert_eq!(atom1.id(), atom2.id());
    }

    #[test]
    fn atom_describes_itself_as_primitive_node() {
        let atom = Atom::new("x".to_string()).with_name("label");
        let node = atom.node();

        assert_eq!(node.id(), atom.id());
        assert_eq!(node.kind(), NodeKind::Primitive);
        assert_eq!(node.name(), Some("label"));
        assert!(node.dependencies().is_empty());
    }

    #[test]
    fn observe_is_argument_less_subscribe() {
        let atom = Atom::new(1);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let dyn_atom: &dyn Observable = &atom;
        let _sub = dyn_atom.observe(Arc::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        atom.set(2);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
