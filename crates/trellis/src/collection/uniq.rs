//! Distinct elements of a list.

use std::sync::Arc;

use parking_lot::Mutex;
use trellis_core::Subscription;

use super::derived::{DerivedList, delegate_observable};
use super::list::{Element, ListArgs, ListEvent, ObservableList};

struct UniqInner<T> {
    source: Arc<dyn ObservableList<T>>,
    output: DerivedList<T>,
    /// Occurrence counts, aligned with `output`.
    counts: Mutex<Vec<(T, usize)>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl<T> Drop for UniqInner<T> {
    fn drop(&mut self) {
        for subscription in self.subscriptions.get_mut().drain(..) {
            subscription.cancel();
        }
    }
}

/// Each distinct element of a source list once, in order of first arrival.
///
/// An element appears while at least one equal element is present in the
/// source and leaves when the last one is removed.
pub struct UniqList<T> {
    inner: Arc<UniqInner<T>>,
}

impl<T> Clone for UniqList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Element> UniqList<T> {
    pub fn new<S>(source: S) -> Self
    where
        S: ObservableList<T> + 'static,
    {
        let inner = Arc::new(UniqInner {
            source: Arc::new(source),
            output: DerivedList::new(),
            counts: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
        });
        for element in inner.source.items() {
            inner.added(element);
        }

        let weak = Arc::downgrade(&inner);
        let added = inner.source.events().subscribe(ListEvent::Added, {
            let weak = weak.clone();
            move |(element, _): &ListArgs<T>| {
                if let Some(inner) = weak.upgrade() {
                    inner.added(element.clone());
                }
            }
        });
        let removed = inner
            .source
            .events()
            .subscribe(ListEvent::Removed, move |(element, _): &ListArgs<T>| {
                if let Some(inner) = weak.upgrade() {
                    inner.removed(element);
                }
            });
        inner.subscriptions.lock().extend([added, removed]);

        Self { inner }
    }
}

impl<T: Element> UniqInner<T> {
    fn added(&self, element: T) {
        let appended_at = {
            let mut counts = self.counts.lock();
            match counts.iter_mut().find(|(e, _)| *e == element) {
                Some((_, count)) => {
                    *count += 1;
                    None
                }
                None => {
                    counts.push((element.clone(), 1));
                    Some(counts.len() - 1)
                }
            }
        };
        if let Some(idx) = appended_at {
            self.output.add(element, idx);
        }
    }

    fn removed(&self, element: &T) {
        let vacated = {
            let mut counts = self.counts.lock();
            let Some(pos) = counts.iter().position(|(e, _)| e == element) else {
                return;
            };
            counts[pos].1 -= 1;
            if counts[pos].1 == 0 {
                counts.remove(pos);
                Some(pos)
            } else {
                None
            }
        };
        if let Some(idx) = vacated {
            self.output.remove_at(idx);
        }
    }
}

delegate_observable!(UniqList<T>, T, |this| &this.inner.output);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::List;

    #[test]
    fn test_uniq_counts_duplicates() {
        let source = List::from_vec(vec!["a", "b", "a"]);
        let distinct = source.uniq();
        assert_eq!(distinct.items(), vec!["a", "b"]);

        source.remove_at(0);
        assert_eq!(distinct.items(), vec!["a", "b"]);

        source.remove(&"a");
        assert_eq!(distinct.items(), vec!["b"]);

        source.push("c");
        source.push("b");
        assert_eq!(distinct.items(), vec!["b", "c"]);
    }
}
