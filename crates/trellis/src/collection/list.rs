//! Observable ordered list.
//!
//! `List<T>` is an insertion-ordered, mutable sequence that emits an
//! [`ListEvent::Added`] or [`ListEvent::Removed`] event, carrying the element
//! and its index, after every mutation.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use trellis_core::{EventBus, Listener, Varying};

use super::filtered::FilteredList;
use super::mapped::MappedList;
use super::uniq::UniqList;

/// Bound shared by every element type stored in an observable list.
///
/// Equality is what `remove` and `index_of` match on; handle types such as
/// [`List`] and [`Model`](crate::Model) compare by identity.
pub trait Element: Clone + PartialEq + Send + Sync + 'static {}

impl<T: Clone + PartialEq + Send + Sync + 'static> Element for T {}

/// Structural events emitted by observable lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListEvent {
    /// An element was inserted. Args: (element, index it now occupies).
    Added,
    /// An element was removed. Args: (element, index it occupied).
    Removed,
}

/// Handler arguments for [`ListEvent`]s.
pub type ListArgs<T> = (T, usize);

/// Read-and-subscribe contract shared by [`List`] and every derived list.
///
/// Derived lists take their sources through this trait, so combinators chain:
/// a filtered view of a flattened list is just another observable list.
pub trait ObservableList<T: Element>: Send + Sync {
    /// Snapshot of the current elements, in order.
    fn items(&self) -> Vec<T>;

    /// Current number of elements.
    fn len(&self) -> usize;

    /// Element at `index`, if in range.
    fn get(&self, index: usize) -> Option<T>;

    /// Position of the first element equal to `element`.
    fn index_of(&self, element: &T) -> Option<usize>;

    /// The bus `added`/`removed` events are delivered on.
    fn events(&self) -> &EventBus<ListEvent, ListArgs<T>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, element: &T) -> bool {
        self.index_of(element).is_some()
    }

    /// Subscribe to structural changes.
    fn on<F>(&self, event: ListEvent, handler: F) -> Listener<ListEvent>
    where
        Self: Sized,
        F: Fn(&ListArgs<T>) + Send + Sync + 'static,
    {
        self.events().on(event, handler)
    }

    /// Remove a handler installed with [`on`](Self::on).
    fn off(&self, listener: &Listener<ListEvent>) -> bool
    where
        Self: Sized,
    {
        self.events().off(listener)
    }

    /// A cell tracking the current length.
    fn watch_length(&self) -> Varying<usize>
    where
        Self: Sized + Clone + 'static,
    {
        let length = Varying::new(self.len());
        // The cell owns the source; handlers only reach either one weakly.
        let source: Arc<dyn ObservableList<T>> = Arc::new(self.clone());
        for event in [ListEvent::Added, ListEvent::Removed] {
            let weak = length.downgrade();
            let reader = Arc::downgrade(&source);
            length.listen_to(self.events(), event, move |_: &ListArgs<T>| {
                if let (Some(length), Some(source)) = (weak.upgrade(), reader.upgrade()) {
                    length.set_value(source.len());
                }
            });
        }
        length.keep_alive(source);
        length
    }

    /// A live view of the elements that currently satisfy `predicate`.
    fn filter<F>(&self, predicate: F) -> FilteredList<T>
    where
        Self: Sized + Clone + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        FilteredList::new(self.clone(), move |element: &T| Varying::new(predicate(element)))
    }

    /// A live filter whose per-element predicate is itself reactive; the
    /// element enters and leaves the view as its cell flips.
    fn filter_varying<F>(&self, predicate: F) -> FilteredList<T>
    where
        Self: Sized + Clone + 'static,
        F: Fn(&T) -> Varying<bool> + Send + Sync + 'static,
    {
        FilteredList::new(self.clone(), predicate)
    }

    /// A live element-wise projection.
    fn map<U, F>(&self, f: F) -> MappedList<T, U>
    where
        Self: Sized + Clone + 'static,
        U: Element,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        MappedList::new(self.clone(), f)
    }

    /// A live view holding each distinct element once.
    fn uniq(&self) -> UniqList<T>
    where
        Self: Sized + Clone + 'static,
    {
        UniqList::new(self.clone())
    }
}

struct ListInner<T> {
    items: RwLock<Vec<T>>,
    events: EventBus<ListEvent, ListArgs<T>>,
}

/// An observable, insertion-ordered, mutable sequence.
///
/// `List` is a shared handle: clones refer to the same sequence, and two
/// handles are equal only if they refer to the same sequence.
///
/// # Example
///
/// ```
/// use trellis::collection::{List, ListEvent, ObservableList};
///
/// let list = List::from_vec(vec!["a", "b"]);
/// list.on(ListEvent::Added, |(item, idx)| println!("{item} at {idx}"));
/// list.add("c", None);
/// assert_eq!(list.items(), vec!["a", "b", "c"]);
/// ```
pub struct List<T> {
    inner: Arc<ListInner<T>>,
}

impl<T> Clone for List<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for List<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for List<T> {}

impl<T: Element> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> List<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Creates a list holding `items`. No events are emitted.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(ListInner {
                items: RwLock::new(items),
                events: EventBus::new(),
            }),
        }
    }

    /// Inserts `element` at `index` (appending when `None` or past the end)
    /// and emits `Added`. Returns the index the element landed at.
    pub fn add(&self, element: T, index: Option<usize>) -> usize {
        let index = {
            let mut items = self.inner.items.write();
            let index = index.map_or(items.len(), |i| i.min(items.len()));
            items.insert(index, element.clone());
            index
        };
        tracing::trace!(target: "trellis::collection", index, "list element added");
        self.inner.events.emit(&ListEvent::Added, (element, index));
        index
    }

    /// Appends `element`.
    pub fn push(&self, element: T) -> usize {
        self.add(element, None)
    }

    /// Appends every element, emitting one `Added` per element.
    pub fn add_all<I: IntoIterator<Item = T>>(&self, elements: I) {
        for element in elements {
            self.push(element);
        }
    }

    /// Removes the element at `index` and emits `Removed`.
    ///
    /// Returns `None` without emitting if `index` is out of range.
    pub fn remove_at(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = self.inner.items.write();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        tracing::trace!(target: "trellis::collection", index, "list element removed");
        self.inner
            .events
            .emit(&ListEvent::Removed, (removed.clone(), index));
        Some(removed)
    }

    /// Removes the first element equal to `element`.
    pub fn remove(&self, element: &T) -> Option<T> {
        let index = self.index_of(element)?;
        self.remove_at(index)
    }

    /// Removes every element from the back, emitting `Removed` for each.
    pub fn clear(&self) {
        while let Some(last) = self.len().checked_sub(1) {
            self.remove_at(last);
        }
    }

    /// Snapshot of the current elements.
    pub fn items(&self) -> Vec<T> {
        self.inner.items.read().clone()
    }

    /// Access the elements without cloning them.
    pub fn with_items<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[T]) -> R,
    {
        f(&self.inner.items.read())
    }

    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.read().get(index).cloned()
    }

    pub fn index_of(&self, element: &T) -> Option<usize> {
        self.inner.items.read().iter().position(|e| e == element)
    }

    pub fn contains(&self, element: &T) -> bool {
        self.index_of(element).is_some()
    }

    /// Create a weak handle that does not keep the list alive.
    pub fn downgrade(&self) -> WeakList<T> {
        WeakList {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<T: Element> ObservableList<T> for List<T> {
    fn items(&self) -> Vec<T> {
        List::items(self)
    }

    fn len(&self) -> usize {
        List::len(self)
    }

    fn get(&self, index: usize) -> Option<T> {
        List::get(self, index)
    }

    fn index_of(&self, element: &T) -> Option<usize> {
        List::index_of(self, element)
    }

    fn events(&self) -> &EventBus<ListEvent, ListArgs<T>> {
        &self.inner.events
    }
}

impl<T: Element> From<Vec<T>> for List<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.read().iter()).finish()
    }
}

/// A non-owning handle to a [`List`].
pub struct WeakList<T> {
    inner: Weak<ListInner<T>>,
}

impl<T> Clone for WeakList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> WeakList<T> {
    pub fn upgrade(&self) -> Option<List<T>> {
        self.inner.upgrade().map(|inner| List { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    static_assertions::assert_impl_all!(List<i32>: Send, Sync, Clone);

    fn record<T: Element>(list: &List<T>) -> Arc<Mutex<Vec<(ListEvent, T, usize)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for event in [ListEvent::Added, ListEvent::Removed] {
            let l = log.clone();
            list.on(event, move |(item, idx): &ListArgs<T>| {
                l.lock().push((event, item.clone(), *idx));
            });
        }
        log
    }

    #[test]
    fn test_add_appends_and_inserts() {
        let list = List::new();
        let log = record(&list);

        list.add(1, None);
        list.add(3, None);
        list.add(2, Some(1));
        list.add(9, Some(100));

        assert_eq!(list.items(), vec![1, 2, 3, 9]);
        assert_eq!(
            *log.lock(),
            vec![
                (ListEvent::Added, 1, 0),
                (ListEvent::Added, 3, 1),
                (ListEvent::Added, 2, 1),
                (ListEvent::Added, 9, 3),
            ]
        );
    }

    #[test]
    fn test_remove_at_and_remove() {
        let list = List::from_vec(vec!["a", "b", "c", "b"]);
        let log = record(&list);

        assert_eq!(list.remove_at(0), Some("a"));
        assert_eq!(list.remove(&"b"), Some("b"));
        assert_eq!(list.remove_at(10), None);
        assert_eq!(list.remove(&"z"), None);

        assert_eq!(list.items(), vec!["c", "b"]);
        assert_eq!(
            *log.lock(),
            vec![(ListEvent::Removed, "a", 0), (ListEvent::Removed, "b", 0)]
        );
    }

    #[test]
    fn test_clear_emits_per_element() {
        let list = List::from_vec(vec![1, 2, 3]);
        let log = record(&list);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn test_watch_length() {
        let list = List::new();
        let length = list.watch_length();
        assert_eq!(length.get(), 0);

        list.push('x');
        list.push('y');
        assert_eq!(length.get(), 2);

        list.remove_at(0);
        assert_eq!(length.get(), 1);
    }

    #[test]
    fn test_lists_compare_by_identity() {
        let a = List::from_vec(vec![1]);
        let b = List::from_vec(vec![1]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_weak_list() {
        let list = List::<u8>::new();
        let weak = list.downgrade();
        assert!(weak.upgrade().is_some());
        drop(list);
        assert!(weak.upgrade().is_none());
    }
}
