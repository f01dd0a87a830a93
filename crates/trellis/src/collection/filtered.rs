//! Live filtering.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::{Subscription, Varying};

use super::derived::{DerivedList, delegate_observable};
use super::list::{Element, ListArgs, ListEvent, ObservableList};

type Predicate<T> = Arc<dyn Fn(&T) -> Varying<bool> + Send + Sync>;

/// Per source element bookkeeping, aligned positionally with the source.
struct Entry {
    key: u64,
    included: bool,
    /// Held so the predicate cell outlives the subscription on it.
    _predicate: Varying<bool>,
    subscription: Subscription,
}

struct FilteredInner<T> {
    source: Arc<dyn ObservableList<T>>,
    output: DerivedList<T>,
    predicate: Predicate<T>,
    entries: Mutex<Vec<Entry>>,
    next_key: AtomicU64,
    source_subscriptions: Mutex<Vec<Subscription>>,
}

impl<T> Drop for FilteredInner<T> {
    fn drop(&mut self) {
        for subscription in self.source_subscriptions.get_mut().drain(..) {
            subscription.cancel();
        }
        for entry in self.entries.get_mut().drain(..) {
            entry.subscription.cancel();
        }
    }
}

/// The elements of a source list whose predicate is currently true, in
/// source order.
///
/// Each element's predicate is a [`Varying<bool>`]; when it flips the element
/// is inserted into or removed from this view at the translated index.
pub struct FilteredList<T> {
    inner: Arc<FilteredInner<T>>,
}

impl<T> Clone for FilteredList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Element> FilteredList<T> {
    pub fn new<S, F>(source: S, predicate: F) -> Self
    where
        S: ObservableList<T> + 'static,
        F: Fn(&T) -> Varying<bool> + Send + Sync + 'static,
    {
        let inner = Arc::new(FilteredInner {
            source: Arc::new(source),
            output: DerivedList::new(),
            predicate: Arc::new(predicate),
            entries: Mutex::new(Vec::new()),
            next_key: AtomicU64::new(0),
            source_subscriptions: Mutex::new(Vec::new()),
        });

        let weak = Arc::downgrade(&inner);
        let added = inner.source.events().subscribe(ListEvent::Added, {
            let weak = weak.clone();
            move |(element, idx): &ListArgs<T>| {
                if let Some(inner) = weak.upgrade() {
                    FilteredInner::source_added(&inner, element.clone(), *idx);
                }
            }
        });
        let removed = inner.source.events().subscribe(ListEvent::Removed, {
            move |(_, idx): &ListArgs<T>| {
                if let Some(inner) = weak.upgrade() {
                    inner.source_removed(*idx);
                }
            }
        });
        inner.source_subscriptions.lock().extend([added, removed]);

        for (idx, element) in inner.source.items().into_iter().enumerate() {
            FilteredInner::source_added(&inner, element, idx);
        }

        Self { inner }
    }

    /// The list this view is computed from.
    pub fn source(&self) -> &Arc<dyn ObservableList<T>> {
        &self.inner.source
    }
}

impl<T: Element> FilteredInner<T> {
    fn output_index(entries: &[Entry], source_idx: usize) -> usize {
        entries[..source_idx.min(entries.len())]
            .iter()
            .filter(|entry| entry.included)
            .count()
    }

    fn source_added(this: &Arc<Self>, element: T, idx: usize) {
        let key = this.next_key.fetch_add(1, Ordering::SeqCst);
        let predicate = (this.predicate)(&element);

        let weak: Weak<Self> = Arc::downgrade(this);
        let flipped_element = element.clone();
        let subscription = predicate.react(move |included: &bool| {
            if let Some(inner) = weak.upgrade() {
                inner.predicate_changed(key, flipped_element.clone(), *included);
            }
        });

        let included = predicate.get();
        let output_idx = {
            let mut entries = this.entries.lock();
            let idx = idx.min(entries.len());
            entries.insert(
                idx,
                Entry {
                    key,
                    included,
                    _predicate: predicate,
                    subscription,
                },
            );
            Self::output_index(&entries, idx)
        };
        if included {
            this.output.add(element, output_idx);
        }
    }

    fn source_removed(&self, idx: usize) {
        let removed = {
            let mut entries = self.entries.lock();
            if idx >= entries.len() {
                return;
            }
            let entry = entries.remove(idx);
            let output_idx = Self::output_index(&entries, idx);
            (entry, output_idx)
        };
        let (entry, output_idx) = removed;
        entry.subscription.cancel();
        if entry.included {
            self.output.remove_at(output_idx);
        }
    }

    fn predicate_changed(&self, key: u64, element: T, included: bool) {
        let output_idx = {
            let mut entries = self.entries.lock();
            let Some(pos) = entries.iter().position(|entry| entry.key == key) else {
                return;
            };
            if entries[pos].included == included {
                return;
            }
            entries[pos].included = included;
            Self::output_index(&entries, pos)
        };
        if included {
            self.output.add(element, output_idx);
        } else {
            self.output.remove_at(output_idx);
        }
    }
}

delegate_observable!(FilteredList<T>, T, |this| &this.inner.output);
