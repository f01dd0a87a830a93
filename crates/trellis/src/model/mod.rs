//! Hierarchical observable models.
//!
//! A [`Model`] is a key/value attribute store whose values may be plain data,
//! nested models or [`Reference`]s. Models form shadow chains: a shadow reads
//! through to its parent for anything it has not set, which makes it a draft
//! layer that can be inspected ([`Model::modified`]), discarded
//! ([`Model::revert`]) or committed ([`Model::merge`]).
//!
//! # Core Types
//!
//! - [`Model`]: the store, its change events and its watch cells
//! - [`Schema`]: the per-kind registry of attribute classes and binders
//! - [`Attribute`] / [`AttributeClass`]: per-key behaviour hooks
//! - [`Binder`]: a key computed from other keys
//! - [`Issue`]: validation feedback aggregated by [`Model::issues`]
//! - [`Value`]: the dynamic value type
//! - [`Depth`]: how far dirty checks descend into nested models
//!
//! # Change Events
//!
//! Every write emits [`ModelEvent::Changed`] for the full path, then
//! [`ModelEvent::SubKeyChanged`] for each enclosing path (innermost first),
//! then [`ModelEvent::AnyChanged`]. Observers subscribe at whichever
//! granularity they need.

mod binder;
mod debug;
mod depth;
mod issue;
mod reference;
mod schema;
mod store;
mod value;

pub use binder::Binder;
pub use debug::ShadowTreeDebug;
pub use depth::{Depth, DepthPredicate};
pub use issue::Issue;
pub use reference::{Reference, ReferenceSlot};
pub use schema::{
    Attribute, AttributeClass, AttributeContext, Initializer, IssueSource, Options, Schema,
    SchemaBuilder, SimpleAttribute,
};
pub use store::{Change, Model, ModelEvent, ModelOptions, WeakModel};
pub use value::{Map, Value};

#[doc(hidden)]
pub use value::deep_set;
