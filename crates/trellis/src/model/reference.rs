//! Asynchronously resolved values.
//!
//! A [`Reference`] stands in for a value that arrives later, typically a
//! model fetched by id. Models store references like any other value; once a
//! stored reference resolves to a model, the holder starts tracking that
//! model for deep modification as if it had been set directly.

use std::fmt;

use trellis_core::{Subscription, Varying};

use super::Model;
use super::value::Value;

/// A placeholder for a value that may not have arrived yet.
///
/// References are shared handles and compare by identity.
#[derive(Clone)]
pub struct Reference {
    state: Varying<Option<Value>>,
}

impl Reference {
    /// A reference that has not resolved yet.
    pub fn pending() -> Self {
        Self {
            state: Varying::new(None),
        }
    }

    /// A reference that is already resolved to `value`.
    pub fn resolved(value: impl Into<Value>) -> Self {
        Self {
            state: Varying::new(Some(value.into())),
        }
    }

    /// Resolve (or re-resolve) to `value`, notifying watchers.
    pub fn resolve(&self, value: impl Into<Value>) {
        tracing::debug!(target: "trellis::model", reference = self.state.id(), "reference resolved");
        self.state.set_value(Some(value.into()));
    }

    /// The resolved value, if any.
    pub fn value(&self) -> Option<Value> {
        self.state.get()
    }

    pub fn is_resolved(&self) -> bool {
        self.state.with(Option::is_some)
    }

    /// The resolved value with nested references followed through, or
    /// `Null` while anything along the chain is pending.
    pub fn flat_value(&self) -> Value {
        match self.value() {
            Some(Value::Reference(inner)) => inner.flat_value(),
            Some(value) => value,
            None => Value::Null,
        }
    }

    /// A reference that resolves to `f` of this one's value.
    pub fn map<F>(&self, f: F) -> Reference
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Reference {
            state: self.state.map(move |value| value.as_ref().map(&f)),
        }
    }

    /// Call `handler` with the current state now and on every resolution.
    pub fn react_now<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        self.state.react_now(move |value| handler(value.as_ref()))
    }

    /// Call `handler` on every future resolution.
    pub fn react<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        self.state.react(move |value| handler(value.as_ref()))
    }

    pub(crate) fn id(&self) -> usize {
        self.state.id()
    }

    /// The resolution state as a cell.
    pub fn watch(&self) -> Varying<Option<Value>> {
        self.state.clone()
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("id", &self.state.id())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// How a model is tracking one reference it stores.
#[derive(Clone, Debug, PartialEq)]
pub enum ReferenceSlot {
    /// Waiting for the reference to resolve to a model.
    Pending(Reference),
    /// The reference resolved; the model is tracked as a sub-model.
    Resolved(Model),
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_resolve_and_react() {
        let reference = Reference::pending();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = reference.react_now(move |value| s.lock().push(value.cloned()));

        assert!(!reference.is_resolved());
        assert_eq!(reference.flat_value(), Value::Null);
        reference.resolve(3);

        assert_eq!(reference.value(), Some(Value::Int(3)));
        assert_eq!(*seen.lock(), vec![None, Some(Value::Int(3))]);
    }

    #[test]
    fn test_map_follows_resolution() {
        let reference = Reference::pending();
        let doubled = reference.map(|v| Value::from(v.as_i64().unwrap_or(0) * 2));
        assert_eq!(doubled.value(), None);

        reference.resolve(21);
        assert_eq!(doubled.value(), Some(Value::Int(42)));
    }

    #[test]
    fn test_flat_value_follows_nested_references() {
        let inner = Reference::pending();
        let outer = Reference::resolved(inner.clone());
        assert_eq!(outer.flat_value(), Value::Null);
        inner.resolve("x");
        assert_eq!(outer.flat_value(), Value::from("x"));
    }
}
