//! Update shapes.
//!
//! A write is described by a [`Patch`]: either a ready value or a function
//! of the current state that produces one. What the value *is* depends on
//! the write mode:
//!
//! - `replace_state` takes a `Patch<T, T>`: the resolved value becomes the
//!   next state verbatim.
//! - `set_state` takes a `Patch<T, T::Partial>` and requires `T: Merge`: the
//!   resolved partial is shallow-merged over the current state.
//!
//! Handing a partial to `replace_state`, or a full state to `set_state` on a
//! type whose partial differs, does not type-check.

use std::hash::Hash;

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A pending write: a value, or a function of the current state.
pub enum Patch<'a, T, P = T> {
    /// Use this value as-is.
    Value(P),

    /// Compute the value from the current state.
    With(Box<dyn FnOnce(&T) -> P + 'a>),
}

impl<'a, T, P> Patch<'a, T, P> {
    pub fn value(value: P) -> Self {
        Patch::Value(value)
    }

    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> P + 'a,
    {
        Patch::With(Box::new(f))
    }

    /// Produce the patch value against `current`.
    ///
    /// Functions run exactly once.
    pub fn resolve(self, current: &T) -> P {
        match self {
            Patch::Value(value) => value,
            Patch::With(f) => f(current),
        }
    }
}

impl<T, P: std::fmt::Debug> std::fmt::Debug for Patch<'_, T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Patch::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Patch::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

/// State types that accept partial updates.
///
/// `merge` is a *shallow* merge: every field present in the partial
/// replaces the corresponding field of `self`, everything else is carried
/// over, and nested values are replaced wholesale rather than merged
/// recursively. It must build a new value; `self` is a snapshot other
/// readers may still hold.
pub trait Merge: Sized {
    /// The shape of a partial update.
    type Partial;

    fn merge(&self, partial: Self::Partial) -> Self;
}

/// Objects merge key by key. Merging into a non-object discards it and
/// yields an object holding only the patch keys.
impl Merge for Value {
    type Partial = Map<String, Value>;

    fn merge(&self, partial: Self::Partial) -> Self {
        let mut merged = match self {
            Value::Object(fields) => fields.clone(),
            _ => Map::new(),
        };
        for (key, value) in partial {
            merged.insert(key, value);
        }
        Value::Object(merged)
    }
}

/// Keyed maps merge entry by entry; existing keys keep their position.
impl<K, V> Merge for IndexMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    type Partial = IndexMap<K, V>;

    fn merge(&self, partial: Self::Partial) -> Self {
        let mut merged = self.clone();
        merged.extend(partial);
        merged
    }
}
