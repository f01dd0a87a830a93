//! Reactive value cells.
//!
//! A [`Varying<T>`] holds a current value and notifies observers when that
//! value changes. It is the observable-value primitive used for watched model
//! attributes, list lengths, validity and modified-state.
//!
//! # Ownership
//!
//! Derived cells hold their sources strongly; sources only reach derived
//! cells through weak handles captured in their listeners. A derived cell
//! therefore keeps its whole upstream chain alive, and dropping it removes the
//! listeners it installed on its sources.
//!
//! # Example
//!
//! ```
//! use trellis_core::Varying;
//!
//! let count = Varying::new(2);
//! let doubled = count.map(|n| n * 2);
//! assert_eq!(doubled.get(), 4);
//!
//! count.set_value(5);
//! assert_eq!(doubled.get(), 10);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::event::Listenable;
use crate::signal::Signal;
use crate::subscription::Subscription;

/// Events a [`Varying`] emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VaryingEvent {
    /// The value changed. Handlers receive the new value.
    Changed,
}

struct VaryingInner<T> {
    value: RwLock<T>,
    changed: Signal<T>,
    /// Listeners this cell installed through `listen_to`, keyed by source.
    listening: Mutex<Vec<(usize, Subscription)>>,
    /// Strong references to upstream sources.
    upstream: Mutex<Vec<Arc<dyn Any + Send + Sync>>>,
}

impl<T> Drop for VaryingInner<T> {
    fn drop(&mut self) {
        for (_, subscription) in self.listening.get_mut().drain(..) {
            subscription.cancel();
        }
    }
}

/// A mutable reactive cell.
pub struct Varying<T> {
    inner: Arc<VaryingInner<T>>,
}

impl<T> Clone for Varying<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for Varying<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for Varying<T> {}

impl<T: Clone + Send + Sync + 'static> Varying<T> {
    /// Create a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(VaryingInner {
                value: RwLock::new(value),
                changed: Signal::new(),
                listening: Mutex::new(Vec::new()),
                upstream: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Access the current value without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.inner.value.read())
    }

    /// Store `value` and notify observers unconditionally.
    pub fn set_value_forced(&self, value: T) {
        *self.inner.value.write() = value.clone();
        tracing::trace!(target: "trellis_core::varying", "varying changed (forced)");
        self.inner.changed.emit(value);
    }

    /// Map this cell through a pure function into a new derived cell.
    ///
    /// The derived cell recomputes whenever this one changes and only
    /// notifies its own observers when the mapped result differs.
    pub fn map<U, F>(&self, f: F) -> Varying<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let derived = Varying::new(self.with(&f));
        let weak = derived.downgrade();
        derived.listen_to(self, VaryingEvent::Changed, move |value: &T| {
            if let Some(derived) = weak.upgrade() {
                derived.set_value(f(value));
            }
        });
        derived.keep_alive(self.clone());
        derived
    }

    /// Subscribe `handler` to `event` on `source` for as long as this cell
    /// lives. Returns `self` for chaining.
    pub fn listen_to<E, A, S, F>(&self, source: &S, event: E, handler: F) -> &Self
    where
        S: Listenable<E, A>,
        F: Fn(&A) + Send + Sync + 'static,
    {
        let subscription = source.subscribe_shared(event, Arc::new(handler));
        self.inner
            .listening
            .lock()
            .push((source.source_key(), subscription));
        self
    }

    /// Remove every listener this cell installed on `source`.
    ///
    /// Returns the number of listeners removed.
    pub fn unlisten_to<E, A, S>(&self, source: &S) -> usize
    where
        S: Listenable<E, A>,
    {
        let key = source.source_key();
        let removed: Vec<Subscription> = {
            let mut listening = self.inner.listening.lock();
            let (matching, rest): (Vec<_>, Vec<_>) =
                listening.drain(..).partition(|(source, _)| *source == key);
            *listening = rest;
            matching.into_iter().map(|(_, sub)| sub).collect()
        };
        for subscription in &removed {
            subscription.cancel();
        }
        removed.len()
    }

    /// Keep `owner` alive for as long as this cell lives.
    pub fn keep_alive<O: Any + Send + Sync>(&self, owner: O) {
        self.inner.upstream.lock().push(Arc::new(owner));
    }

    /// Call `handler` on every future change.
    pub fn react<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_shared(VaryingEvent::Changed, Arc::new(handler))
    }

    /// Call `handler` with the current value now, then on every change.
    pub fn react_now<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let handler: Arc<dyn Fn(&T) + Send + Sync> = Arc::new(handler);
        let subscription = self.subscribe_shared(VaryingEvent::Changed, handler.clone());
        let current = self.get();
        handler(&current);
        subscription
    }

    /// Number of observers currently attached.
    pub fn observer_count(&self) -> usize {
        self.inner.changed.connection_count()
    }

    /// Create a weak handle that does not keep the cell alive.
    pub fn downgrade(&self) -> WeakVarying<T> {
        WeakVarying {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Stable identity of this cell.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Varying<T> {
    /// Store `value`, notifying observers only if it differs from the
    /// current value. Returns whether a change happened.
    pub fn set_value(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.write();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        tracing::trace!(target: "trellis_core::varying", "varying changed");
        self.inner.changed.emit(value);
        true
    }
}

impl<T: Clone + Send + Sync + 'static> Listenable<VaryingEvent, T> for Varying<T> {
    fn source_key(&self) -> usize {
        self.id()
    }

    fn subscribe_shared(
        &self,
        _event: VaryingEvent,
        handler: Arc<dyn Fn(&T) + Send + Sync>,
    ) -> Subscription {
        let id = self.inner.changed.connect_shared(handler);
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.changed.disconnect(id);
            }
        })
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for Varying<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Varying<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Varying")
            .field("value", &*self.inner.value.read())
            .field("observers", &self.inner.changed.connection_count())
            .finish()
    }
}

/// A non-owning handle to a [`Varying`].
pub struct WeakVarying<T> {
    inner: Weak<VaryingInner<T>>,
}

impl<T> Clone for WeakVarying<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> WeakVarying<T> {
    /// Recover the cell if it is still alive.
    pub fn upgrade(&self) -> Option<Varying<T>> {
        self.inner.upgrade().map(|inner| Varying { inner })
    }
}
