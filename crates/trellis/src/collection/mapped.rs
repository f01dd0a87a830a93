//! Element-wise projection.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::Subscription;

use super::derived::{DerivedList, delegate_observable};
use super::list::{Element, ListArgs, ListEvent, ObservableList};

struct MappedInner<T, U> {
    source: Arc<dyn ObservableList<T>>,
    output: DerivedList<U>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl<T, U> Drop for MappedInner<T, U> {
    fn drop(&mut self) {
        for subscription in self.subscriptions.get_mut().drain(..) {
            subscription.cancel();
        }
    }
}

/// `f` applied to every element of a source list, index for index.
pub struct MappedList<T, U> {
    inner: Arc<MappedInner<T, U>>,
}

impl<T, U> Clone for MappedList<T, U> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Element, U: Element> MappedList<T, U> {
    pub fn new<S, F>(source: S, f: F) -> Self
    where
        S: ObservableList<T> + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let inner = Arc::new(MappedInner {
            source: Arc::new(source),
            output: DerivedList::new(),
            subscriptions: Mutex::new(Vec::new()),
        });
        for (idx, element) in inner.source.items().iter().enumerate() {
            inner.output.add(f(element), idx);
        }

        let weak = Arc::downgrade(&inner);
        let added = inner.source.events().subscribe(ListEvent::Added, {
            let weak = weak.clone();
            move |(element, idx): &ListArgs<T>| {
                if let Some(inner) = weak.upgrade() {
                    inner.output.add(f(element), *idx);
                }
            }
        });
        let removed = inner
            .source
            .events()
            .subscribe(ListEvent::Removed, move |(_, idx): &ListArgs<T>| {
                if let Some(inner) = weak.upgrade() {
                    inner.output.remove_at(*idx);
                }
            });
        inner.subscriptions.lock().extend([added, removed]);

        Self { inner }
    }
}

delegate_observable!(MappedList<T, U>, U, |this| &this.inner.output);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::List;

    #[test]
    fn test_map_follows_source_positions() {
        let source = List::from_vec(vec![1, 2, 3]);
        let labels = source.map(|n| format!("#{n}"));
        assert_eq!(labels.items(), vec!["#1", "#2", "#3"]);

        source.add(0, Some(0));
        source.remove_at(2);
        assert_eq!(labels.items(), vec!["#0", "#1", "#3"]);
    }

    #[test]
    fn test_map_chains_with_filter() {
        let source = List::from_vec(vec![1, 2, 3, 4]);
        let doubled_odds = source.filter(|n| n % 2 == 1).map(|n| n * 2);
        assert_eq!(doubled_odds.items(), vec![2, 6]);

        source.push(5);
        assert_eq!(doubled_odds.items(), vec![2, 6, 10]);
    }
}
