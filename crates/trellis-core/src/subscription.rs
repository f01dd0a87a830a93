//! Manually cancelled listener handles.

use std::fmt;

use parking_lot::Mutex;

type Canceller = Box<dyn FnOnce() + Send>;

/// A handle to an installed listener.
///
/// Dropping a `Subscription` does **not** remove the listener; call
/// [`cancel`](Self::cancel). Structures that install listeners on their
/// sources keep these handles and cancel them when they tear down.
pub struct Subscription {
    canceller: Mutex<Option<Canceller>>,
}

impl Subscription {
    /// Wrap a cancellation closure.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            canceller: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// A subscription with nothing to cancel.
    pub fn inert() -> Self {
        Self {
            canceller: Mutex::new(None),
        }
    }

    /// Remove the listener. Returns `false` if it was already cancelled.
    pub fn cancel(&self) -> bool {
        let canceller = self.canceller.lock().take();
        match canceller {
            Some(cancel) => {
                cancel();
                true
            }
            None => false,
        }
    }

    /// Whether [`cancel`](Self::cancel) has not run yet.
    pub fn is_active(&self) -> bool {
        self.canceller.lock().is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cancel_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let sub = Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(sub.is_active());
        assert!(sub.cancel());
        assert!(!sub.cancel());
        assert!(!sub.is_active());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_does_not_cancel() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        drop(Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
