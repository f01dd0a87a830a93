//! Prelude module for Trellis.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use trellis::prelude::*;
//! ```
//!
//! This provides access to:
//! - Reactive primitives (`Varying`, `EventBus`, `Subscription`)
//! - Observable collections (`List`, `ObservableList`, derived lists)
//! - The model layer (`Model`, `Schema`, `Value`, `Binder`)

// ============================================================================
// Reactive Core
// ============================================================================

pub use crate::{EventBus, IntoKeyPath, KeyPath, Listener, Subscription, Varying};

// ============================================================================
// Collections
// ============================================================================

pub use crate::collection::{
    CattedList, FilteredList, FlattenedList, List, ListEvent, MappedList, ObservableList, UniqList,
};

// ============================================================================
// Models
// ============================================================================

pub use crate::model::{
    Attribute, AttributeClass, Binder, Change, Depth, Issue, Map, Model, ModelEvent, Reference, Schema,
    SimpleAttribute, Value,
};

#[cfg(test)]
mod tests {
    #![allow(unused)]
    use super::*;

    /// Verify that all prelude exports are accessible and the types exist.
    #[test]
    fn test_prelude_types_exist() {
        let _cell: Varying<i32> = Varying::new(0);
        let _list: List<i32> = List::new();
        let _flat: FlattenedList<i32> = FlattenedList::new(List::<List<i32>>::new());
        let _model = Model::new(&Schema::plain(), Map::new());
        let _reference = Reference::pending();
        let _key: KeyPath = "a.b".into_key_path();
    }
}
