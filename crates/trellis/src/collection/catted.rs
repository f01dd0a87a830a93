//! Concatenation of a fixed set of lists.

use super::derived::delegate_observable;
use super::flattened::FlattenedList;
use super::list::{Element, List};

/// The live concatenation of a fixed sequence of lists.
///
/// The set of lists is fixed at construction; their contents stay live.
pub struct CattedList<T> {
    flat: FlattenedList<T>,
    lists: List<List<T>>,
}

impl<T> Clone for CattedList<T> {
    fn clone(&self) -> Self {
        Self {
            flat: self.flat.clone(),
            lists: self.lists.clone(),
        }
    }
}

impl<T: Element> CattedList<T> {
    pub fn new<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = List<T>>,
    {
        let lists = List::from_vec(lists.into_iter().collect());
        Self {
            flat: FlattenedList::new(lists.clone()),
            lists,
        }
    }

    /// The concatenated lists, in order.
    pub fn lists(&self) -> Vec<List<T>> {
        self.lists.items()
    }
}

delegate_observable!(CattedList<T>, T, |this| &this.flat);
