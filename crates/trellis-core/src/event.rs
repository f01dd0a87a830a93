//! Keyed publish/subscribe.
//!
//! [`EventBus`] maps an event identifier to its own [`Signal`]. Identifiers
//! are structured values (an enum, or a `(kind, path)` pair) rather than
//! concatenated strings, so there is no delimiter that a key could collide
//! with.
//!
//! ```
//! use trellis_core::EventBus;
//!
//! #[derive(Clone, PartialEq, Eq, Hash, Debug)]
//! enum Door { Opened, Closed }
//!
//! let bus = EventBus::<Door, u32>::new();
//! let listener = bus.on(Door::Opened, |who| println!("opened by {who}"));
//! bus.emit(&Door::Opened, 7);
//! bus.emit(&Door::Closed, 7); // nobody listening
//! assert!(bus.off(&listener));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::signal::{ConnectionId, Signal, Slot};
use crate::subscription::Subscription;

/// Identifies one handler registered through [`EventBus::on`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener<E> {
    event: E,
    id: ConnectionId,
}

impl<E> Listener<E> {
    /// The event this listener was registered for.
    pub fn event(&self) -> &E {
        &self.event
    }
}

/// Something a [`Varying`](crate::Varying) can listen to for its lifetime.
pub trait Listenable<E, A> {
    /// Stable identity of the source, used by `unlisten_to`.
    fn source_key(&self) -> usize;

    /// Install `handler` for `event`.
    fn subscribe_shared(&self, event: E, handler: Arc<dyn Fn(&A) + Send + Sync>) -> Subscription;
}

struct BusInner<E, A> {
    channels: RwLock<HashMap<E, Arc<Signal<A>>>>,
}

/// Per-instance named-event publish/subscribe.
///
/// Emission is synchronous: every handler for the event runs, in the order it
/// was registered, before [`emit`](Self::emit) returns.
pub struct EventBus<E, A> {
    inner: Arc<BusInner<E, A>>,
}

impl<E, A> Clone for EventBus<E, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E, A> Default for EventBus<E, A>
where
    E: Eq + Hash + Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, A> EventBus<E, A>
where
    E: Eq + Hash + Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register `handler` for `event`.
    pub fn on<F>(&self, event: E, handler: F) -> Listener<E>
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.on_shared(event, Arc::new(handler))
    }

    fn on_shared(&self, event: E, handler: Slot<A>) -> Listener<E> {
        // Connect under the write lock so `off` cannot drop the channel
        // between lookup and connect.
        let id = self
            .inner
            .channels
            .write()
            .entry(event.clone())
            .or_insert_with(|| Arc::new(Signal::new()))
            .connect_shared(handler);
        Listener { event, id }
    }

    /// Remove a handler. Returns `false` if it was not registered.
    ///
    /// A channel left without handlers is dropped from the bus.
    pub fn off(&self, listener: &Listener<E>) -> bool {
        let signal = self.inner.channels.read().get(&listener.event).cloned();
        let Some(signal) = signal else {
            return false;
        };
        // The slot is dropped outside the bus lock: it may own handles
        // whose teardown calls back into this bus.
        if !signal.disconnect(listener.id) {
            return false;
        }
        let mut channels = self.inner.channels.write();
        let empty = channels
            .get(&listener.event)
            .is_some_and(|current| Arc::ptr_eq(current, &signal) && current.connection_count() == 0);
        if empty {
            channels.remove(&listener.event);
        }
        true
    }

    /// Register `handler` and return a [`Subscription`] that removes it.
    pub fn subscribe<F>(&self, event: E, handler: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.subscribe_shared(event, Arc::new(handler))
    }

    /// Deliver `args` to every handler registered for `event`.
    pub fn emit(&self, event: &E, args: A) {
        let signal = self.inner.channels.read().get(event).cloned();
        if let Some(signal) = signal {
            signal.emit(args);
        }
    }

    /// Number of handlers registered for `event`.
    pub fn listener_count(&self, event: &E) -> usize {
        self.inner
            .channels
            .read()
            .get(event)
            .map_or(0, |signal| signal.connection_count())
    }

    /// Number of events with at least one handler.
    pub fn channel_count(&self) -> usize {
        self.inner.channels.read().len()
    }

    /// Number of handlers across all events.
    pub fn total_listener_count(&self) -> usize {
        self.inner
            .channels
            .read()
            .values()
            .map(|signal| signal.connection_count())
            .sum()
    }

    fn downgrade(&self) -> Weak<BusInner<E, A>> {
        Arc::downgrade(&self.inner)
    }
}

impl<E, A> Listenable<E, A> for EventBus<E, A>
where
    E: Eq + Hash + Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    fn source_key(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    fn subscribe_shared(&self, event: E, handler: Arc<dyn Fn(&A) + Send + Sync>) -> Subscription {
        let listener = self.on_shared(event, handler);
        let weak = self.downgrade();
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                EventBus { inner }.off(&listener);
            }
        })
    }
}

impl<E, A> fmt::Debug for EventBus<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("channels", &self.inner.channels.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    enum Ev {
        A,
        B(String),
    }

    #[test]
    fn test_events_are_isolated_by_identifier() {
        let bus = EventBus::<Ev, i32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        bus.on(Ev::B("x.y".into()), move |v| l.lock().push(("x.y", *v)));
        let l = log.clone();
        bus.on(Ev::B("x".into()), move |v| l.lock().push(("x", *v)));

        bus.emit(&Ev::B("x.y".into()), 1);
        bus.emit(&Ev::B("x".into()), 2);
        bus.emit(&Ev::A, 3);

        assert_eq!(*log.lock(), vec![("x.y", 1), ("x", 2)]);
    }

    #[test]
    fn test_off_and_subscription_cancel() {
        let bus = EventBus::<Ev, i32>::new();
        let hits = Arc::new(Mutex::new(0));

        let h = hits.clone();
        let listener = bus.on(Ev::A, move |_| *h.lock() += 1);
        let h = hits.clone();
        let sub = bus.subscribe(Ev::A, move |_| *h.lock() += 10);
        assert_eq!(bus.listener_count(&Ev::A), 2);

        bus.emit(&Ev::A, 0);
        assert!(bus.off(&listener));
        assert!(sub.cancel());
        bus.emit(&Ev::A, 0);

        assert_eq!(*hits.lock(), 11);
        assert_eq!(bus.total_listener_count(), 0);
        assert_eq!(bus.channel_count(), 0);
    }

    #[test]
    fn test_channels_are_dropped_once_empty() {
        let bus = EventBus::<Ev, i32>::new();
        let first = bus.on(Ev::A, |_| {});
        let second = bus.on(Ev::A, |_| {});
        let sub = bus.subscribe(Ev::B("k".into()), |_| {});
        assert_eq!(bus.channel_count(), 2);

        assert!(bus.off(&first));
        assert_eq!(bus.channel_count(), 2);
        assert!(bus.off(&second));
        assert_eq!(bus.channel_count(), 1);
        assert!(!bus.off(&second));

        assert!(sub.cancel());
        assert_eq!(bus.channel_count(), 0);

        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        bus.on(Ev::A, move |v| *h.lock() += *v);
        bus.emit(&Ev::A, 3);
        assert_eq!(*hits.lock(), 3);
    }

    #[test]
    fn test_handler_may_register_on_same_bus() {
        let bus = EventBus::<Ev, i32>::new();
        let b = bus.clone();
        bus.on(Ev::A, move |_| {
            b.on(Ev::A, |_| {});
        });
        bus.emit(&Ev::A, 0);
        assert_eq!(bus.listener_count(&Ev::A), 2);
    }
}
