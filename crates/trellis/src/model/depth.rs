//! How far modification checks descend into nested models.

use std::fmt;
use std::sync::Arc;

use trellis_core::KeyPath;

use super::store::Model;
use super::value::Value;

/// Chooses per attribute whether a nested model's own edits count.
///
/// Called with the model doing the check, the attribute's key and the value
/// stored under it.
pub type DepthPredicate = Arc<dyn Fn(&Model, &KeyPath, &Value) -> bool + Send + Sync>;

/// Depth argument to [`Model::modified`], [`Model::attr_modified`] and
/// [`Model::watch_modified`].
///
/// `bool` converts into `Deep` / `Shallow`.
///
/// ```
/// use trellis::model::{Depth, Model, Schema};
/// use trellis::attrs;
///
/// let schema = Schema::plain();
/// let saved = Model::new(&schema, attrs! {
///     "owner" => Model::new(&schema, attrs! { "name" => "Ada" }),
/// });
/// let draft = saved.shadow();
/// let owner = draft.get("owner").as_model().cloned().unwrap();
/// owner.set("name", "Grace");
///
/// let only_address = Depth::predicate(|_, key, _| key.leaf() == Some("address"));
/// assert!(draft.modified(true));
/// assert!(!draft.modified(only_address));
/// ```
#[derive(Clone)]
pub enum Depth {
    /// Only this model's own values count.
    Shallow,
    /// Nested shadow models count when they are modified themselves.
    Deep,
    /// Descend only where the predicate says so.
    Predicate(DepthPredicate),
}

impl Depth {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Model, &KeyPath, &Value) -> bool + Send + Sync + 'static,
    {
        Depth::Predicate(Arc::new(f))
    }

    /// Whether the nested model stored at `key` is checked for its own edits.
    pub(crate) fn descends(&self, model: &Model, key: &KeyPath, value: &Value) -> bool {
        match self {
            Depth::Shallow => false,
            Depth::Deep => true,
            Depth::Predicate(predicate) => predicate(model, key, value),
        }
    }

    /// Whether sub-model changes need to be observed at all.
    pub(crate) fn watches_submodels(&self) -> bool {
        !matches!(self, Depth::Shallow)
    }
}

impl From<bool> for Depth {
    fn from(deep: bool) -> Self {
        if deep { Depth::Deep } else { Depth::Shallow }
    }
}

impl fmt::Debug for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Depth::Shallow => f.write_str("Shallow"),
            Depth::Deep => f.write_str("Deep"),
            Depth::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Schema;

    #[test]
    fn test_bool_conversion() {
        assert!(matches!(Depth::from(true), Depth::Deep));
        assert!(matches!(Depth::from(false), Depth::Shallow));
    }

    #[test]
    fn test_predicate_sees_key() {
        let model = Model::new(&Schema::plain(), crate::attrs! {});
        let depth = Depth::predicate(|_, key, _| key.leaf() == Some("a"));
        let a = KeyPath::from_segments(["a"]);
        let b = KeyPath::from_segments(["b"]);
        assert!(depth.descends(&model, &a, &Value::Null));
        assert!(!depth.descends(&model, &b, &Value::Null));
        assert!(!Depth::Shallow.watches_submodels());
    }
}
