//! Base for lists computed from other lists.

use std::fmt;

use trellis_core::EventBus;

use super::list::{Element, List, ListArgs, ListEvent, ObservableList};

/// The output sequence of a computed list.
///
/// A `DerivedList` has the same observable contract as [`List`], but only the
/// transformation that owns it can mutate it, through the crate-private
/// [`add`](Self::add) and [`remove_at`](Self::remove_at) entry points.
/// Consumers read and subscribe.
pub struct DerivedList<T> {
    output: List<T>,
}

impl<T> Clone for DerivedList<T> {
    fn clone(&self) -> Self {
        Self {
            output: self.output.clone(),
        }
    }
}

impl<T> PartialEq for DerivedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.output == other.output
    }
}

impl<T: Element> DerivedList<T> {
    pub(crate) fn new() -> Self {
        Self { output: List::new() }
    }

    pub(crate) fn add(&self, element: T, index: usize) {
        self.output.add(element, Some(index));
    }

    pub(crate) fn remove_at(&self, index: usize) -> Option<T> {
        self.output.remove_at(index)
    }
}

impl<T: Element> ObservableList<T> for DerivedList<T> {
    fn items(&self) -> Vec<T> {
        self.output.items()
    }

    fn len(&self) -> usize {
        self.output.len()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.output.get(index)
    }

    fn index_of(&self, element: &T) -> Option<usize> {
        self.output.index_of(element)
    }

    fn events(&self) -> &EventBus<ListEvent, ListArgs<T>> {
        self.output.events()
    }
}

impl<T: fmt::Debug> fmt::Debug for DerivedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.output.fmt(f)
    }
}

/// Implements [`ObservableList`] for a derived list handle by forwarding to
/// the `DerivedList` reachable through `$field`.
macro_rules! delegate_observable {
    ($ty:ident < $($param:ident),+ >, $elem:ident, |$this:ident| $output:expr) => {
        impl<$($param: $crate::collection::Element),+>
            $crate::collection::ObservableList<$elem> for $ty<$($param),+>
        {
            fn items(&self) -> Vec<$elem> {
                let $this = self;
                $crate::collection::ObservableList::items($output)
            }

            fn len(&self) -> usize {
                let $this = self;
                $crate::collection::ObservableList::len($output)
            }

            fn get(&self, index: usize) -> Option<$elem> {
                let $this = self;
                $crate::collection::ObservableList::get($output, index)
            }

            fn index_of(&self, element: &$elem) -> Option<usize> {
                let $this = self;
                $crate::collection::ObservableList::index_of($output, element)
            }

            fn events(
                &self,
            ) -> &trellis_core::EventBus<
                $crate::collection::ListEvent,
                $crate::collection::ListArgs<$elem>,
            > {
                let $this = self;
                $crate::collection::ObservableList::events($output)
            }
        }
    };
}

pub(crate) use delegate_observable;

#[cfg(test)]
mod tests {
    use super::*;

    // Outputs are only built by the views that own them.
    static_assertions::assert_not_impl_any!(DerivedList<i32>: Default);

    #[test]
    fn test_writes_go_through_the_owner() {
        let derived = DerivedList::new();
        derived.add(1, 0);
        derived.add(0, 0);
        assert_eq!(derived.output.items(), vec![0, 1]);
        assert_eq!(derived.remove_at(1), Some(1));
    }
}
