//! Observable ordered collections.
//!
//! [`List`] is the mutable base. Every other list type here is computed from
//! one or more source lists and kept consistent with them as they mutate:
//!
//! - [`FilteredList`]: elements whose (possibly reactive) predicate holds
//! - [`MappedList`]: element-wise projection
//! - [`UniqList`]: distinct elements
//! - [`FlattenedList`]: live concatenation of a list of lists
//! - [`CattedList`]: live concatenation of a fixed set of lists
//!
//! All of them implement [`ObservableList`], so they chain.

mod catted;
mod derived;
mod filtered;
mod flattened;
mod list;
mod mapped;
mod uniq;

pub use catted::CattedList;
pub use derived::DerivedList;
pub use filtered::FilteredList;
pub use flattened::FlattenedList;
pub use list::{Element, List, ListArgs, ListEvent, ObservableList, WeakList};
pub use mapped::MappedList;
pub use uniq::UniqList;
