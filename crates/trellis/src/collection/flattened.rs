//! Live concatenation of a list of lists.
//!
//! A [`FlattenedList`] presents the elements of every inner list, in outer
//! order and then inner order, as one observable sequence. It listens to the
//! outer list for inner lists arriving and leaving, and to each inner list
//! for element mutations, translating local indices into flat ones.
//!
//! The flat index of an inner list's element is recomputed from the current
//! outer list on every event: the lengths of all inner lists before it, plus
//! its local index. That is linear in the number of inner lists but cannot
//! drift when the outer list is reordered.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use trellis_core::Subscription;

use super::derived::{DerivedList, delegate_observable};
use super::list::{Element, List, ListArgs, ListEvent, ObservableList, WeakList};

/// Listener pair installed on one inner list.
struct Tracked<T> {
    list: List<T>,
    subscriptions: [Subscription; 2],
}

impl<T> Tracked<T> {
    fn cancel(&self) {
        for subscription in &self.subscriptions {
            subscription.cancel();
        }
    }
}

struct FlattenedInner<T> {
    source: Arc<dyn ObservableList<List<T>>>,
    output: DerivedList<T>,
    /// Aligned positionally with `source`.
    tracked: Mutex<Vec<Tracked<T>>>,
    source_subscriptions: Mutex<Vec<Subscription>>,
}

impl<T> Drop for FlattenedInner<T> {
    fn drop(&mut self) {
        for subscription in self.source_subscriptions.get_mut().drain(..) {
            subscription.cancel();
        }
        for tracked in self.tracked.get_mut().drain(..) {
            tracked.cancel();
        }
    }
}

/// An observable flat view over a list of lists.
///
/// # Example
///
/// ```
/// use trellis::collection::{FlattenedList, List, ObservableList};
///
/// let first = List::from_vec(vec![1, 2]);
/// let second = List::from_vec(vec![3]);
/// let outer = List::from_vec(vec![first.clone(), second.clone()]);
/// let flat = FlattenedList::new(outer.clone());
/// assert_eq!(flat.items(), vec![1, 2, 3]);
///
/// second.add(4, Some(0));
/// assert_eq!(flat.items(), vec![1, 2, 4, 3]);
///
/// outer.remove_at(0);
/// assert_eq!(flat.items(), vec![4, 3]);
/// ```
pub struct FlattenedList<T> {
    inner: Arc<FlattenedInner<T>>,
}

impl<T> Clone for FlattenedList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Element> FlattenedList<T> {
    /// Flatten `source`, replaying every inner list it already holds.
    pub fn new<S>(source: S) -> Self
    where
        S: ObservableList<List<T>> + 'static,
    {
        let inner = Arc::new(FlattenedInner {
            source: Arc::new(source),
            output: DerivedList::new(),
            tracked: Mutex::new(Vec::new()),
            source_subscriptions: Mutex::new(Vec::new()),
        });

        let weak = Arc::downgrade(&inner);
        let added = inner.source.events().subscribe(ListEvent::Added, {
            let weak = weak.clone();
            move |(list, idx): &ListArgs<List<T>>| {
                if let Some(inner) = weak.upgrade() {
                    FlattenedInner::add_list(&inner, list.clone(), *idx);
                }
            }
        });
        let removed = inner.source.events().subscribe(
            ListEvent::Removed,
            move |(list, idx): &ListArgs<List<T>>| {
                if let Some(inner) = weak.upgrade() {
                    inner.remove_list(list, *idx);
                }
            },
        );
        inner.source_subscriptions.lock().extend([added, removed]);

        for (idx, list) in inner.source.items().into_iter().enumerate() {
            FlattenedInner::add_list(&inner, list, idx);
        }

        tracing::trace!(
            target: "trellis::collection",
            lists = inner.source.len(),
            len = inner.output.len(),
            "flattened list attached"
        );
        Self { inner }
    }

    /// The flat index of position `offset` within `list`.
    ///
    /// Returns `None` if `list` is not currently in the outer list.
    pub fn overall_index(&self, list: &List<T>, offset: usize) -> Option<usize> {
        self.inner.overall_index(list, offset)
    }

    /// The outer list.
    pub fn source(&self) -> &Arc<dyn ObservableList<List<T>>> {
        &self.inner.source
    }
}

impl<T: Element> FlattenedInner<T> {
    fn overall_index(&self, list: &List<T>, offset: usize) -> Option<usize> {
        let lists = self.source.items();
        let position = lists.iter().position(|candidate| candidate == list)?;
        Some(Self::span_before(&lists, position) + offset)
    }

    fn span_before(lists: &[List<T>], position: usize) -> usize {
        lists[..position.min(lists.len())]
            .iter()
            .map(|list| list.len())
            .sum()
    }

    fn add_list(this: &Arc<Self>, list: List<T>, idx: usize) {
        let weak: Weak<Self> = Arc::downgrade(this);
        let added = list.events().subscribe(ListEvent::Added, {
            let weak = weak.clone();
            let owner: WeakList<T> = list.downgrade();
            move |(element, local): &ListArgs<T>| {
                let (Some(inner), Some(list)) = (weak.upgrade(), owner.upgrade()) else {
                    return;
                };
                if let Some(overall) = inner.overall_index(&list, *local) {
                    inner.output.add(element.clone(), overall);
                }
            }
        });
        let removed = list.events().subscribe(ListEvent::Removed, {
            let owner: WeakList<T> = list.downgrade();
            move |(_, local): &ListArgs<T>| {
                let (Some(inner), Some(list)) = (weak.upgrade(), owner.upgrade()) else {
                    return;
                };
                if let Some(overall) = inner.overall_index(&list, *local) {
                    inner.output.remove_at(overall);
                }
            }
        });

        {
            let mut tracked = this.tracked.lock();
            let idx = idx.min(tracked.len());
            tracked.insert(
                idx,
                Tracked {
                    list: list.clone(),
                    subscriptions: [added, removed],
                },
            );
        }

        let start = Self::span_before(&this.source.items(), idx);
        for (local, element) in list.items().into_iter().enumerate() {
            this.output.add(element, start + local);
        }
    }

    fn remove_list(&self, list: &List<T>, idx: usize) {
        // The list has already left the source, so its span starts where the
        // lists still before `idx` end.
        let start = Self::span_before(&self.source.items(), idx);
        for _ in 0..list.len() {
            self.output.remove_at(start);
        }

        let tracked = {
            let mut tracked = self.tracked.lock();
            (idx < tracked.len()).then(|| tracked.remove(idx))
        };
        if let Some(tracked) = tracked {
            debug_assert!(tracked.list == *list);
            tracked.cancel();
        }
    }
}

delegate_observable!(FlattenedList<T>, T, |this| &this.inner.output);

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(groups: &[&[i32]]) -> (List<List<i32>>, Vec<List<i32>>) {
        let inners: Vec<List<i32>> = groups.iter().map(|g| List::from_vec(g.to_vec())).collect();
        (List::from_vec(inners.clone()), inners)
    }

    #[test]
    fn test_flatten_existing_lists() {
        let (outer, _) = nested(&[&[1, 2], &[], &[3]]);
        let flat = FlattenedList::new(outer);
        assert_eq!(flat.items(), vec![1, 2, 3]);
    }

    #[test]
    fn test_inner_mutations_translate_indices() {
        let (outer, inners) = nested(&[&[1, 2], &[3]]);
        let flat = FlattenedList::new(outer);

        inners[1].add(4, Some(0));
        assert_eq!(flat.items(), vec![1, 2, 4, 3]);

        inners[0].remove_at(1);
        assert_eq!(flat.items(), vec![1, 4, 3]);

        inners[0].push(9);
        assert_eq!(flat.items(), vec![1, 9, 4, 3]);
    }

    #[test]
    fn test_outer_insert_replays_elements() {
        let (outer, _) = nested(&[&[1], &[4]]);
        let flat = FlattenedList::new(outer.clone());

        let middle = List::from_vec(vec![2, 3]);
        outer.add(middle.clone(), Some(1));
        assert_eq!(flat.items(), vec![1, 2, 3, 4]);

        middle.push(5);
        assert_eq!(flat.items(), vec![1, 2, 3, 5, 4]);
    }

    #[test]
    fn test_removed_inner_list_is_detached() {
        let (outer, inners) = nested(&[&[1, 2], &[3]]);
        let flat = FlattenedList::new(outer.clone());
        assert_eq!(inners[0].events().total_listener_count(), 2);

        outer.remove_at(0);
        assert_eq!(flat.items(), vec![3]);
        assert_eq!(inners[0].events().total_listener_count(), 0);

        inners[0].push(7);
        inners[0].remove_at(0);
        assert_eq!(flat.items(), vec![3]);
    }

    #[test]
    fn test_emptied_inner_list_has_zero_span() {
        let (outer, inners) = nested(&[&[1], &[2], &[3]]);
        let flat = FlattenedList::new(outer);

        inners[1].clear();
        assert_eq!(flat.items(), vec![1, 3]);
        assert_eq!(flat.overall_index(&inners[2], 0), Some(1));

        inners[1].push(8);
        assert_eq!(flat.items(), vec![1, 8, 3]);
    }

    #[test]
    fn test_overall_index() {
        let (outer, inners) = nested(&[&[1, 2], &[3, 4, 5], &[6]]);
        let flat = FlattenedList::new(outer);

        assert_eq!(flat.overall_index(&inners[0], 1), Some(1));
        assert_eq!(flat.overall_index(&inners[1], 2), Some(4));
        assert_eq!(flat.overall_index(&inners[2], 0), Some(5));
        assert_eq!(flat.overall_index(&List::new(), 0), None);
    }

    #[test]
    fn test_dropping_flattened_detaches_everything() {
        let (outer, inners) = nested(&[&[1], &[2]]);
        let flat = FlattenedList::new(outer.clone());
        drop(flat);

        assert_eq!(outer.events().total_listener_count(), 0);
        assert!(inners.iter().all(|l| l.events().total_listener_count() == 0));
    }
}
