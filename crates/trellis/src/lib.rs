//! Trellis - hierarchical observable models and live derived collections.
//!
//! This is the main crate; it re-exports the reactive core from
//! `trellis-core` and adds:
//!
//! - [`collection`]: observable lists and the lists derived from them
//!   (filtered, mapped, distinct, flattened, concatenated)
//! - [`model`]: attribute stores with shadowing, change events, binders,
//!   validation issues and serialization
//!
//! # Example
//!
//! ```
//! use trellis::prelude::*;
//! use trellis::attrs;
//!
//! let schema = Schema::plain();
//! let saved = Model::new(&schema, attrs! { "name" => "Ada" });
//! let draft = saved.shadow();
//!
//! let dirty = draft.watch_modified(true);
//! draft.set("name", "Grace");
//! assert!(dirty.get());
//!
//! draft.revert("name");
//! assert!(!dirty.get());
//! ```

pub use trellis_core::*;

pub mod collection;
pub mod model;
pub mod prelude;

pub use model::{Model, Value};
