//! Computed attributes.

use std::fmt;
use std::sync::Arc;

use trellis_core::{IntoKeyPath, KeyPath, Subscription};

use super::store::Model;
use super::value::Value;

type Compute = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Declares that one attribute is computed from others.
///
/// ```
/// use trellis::model::{Binder, Model, Schema, Value};
/// use trellis::attrs;
///
/// let schema = Schema::builder("Name")
///     .bind(Binder::new("full").from(["first", "last"]).compute(|parts| {
///         let words: Vec<&str> = parts.iter().filter_map(Value::as_str).collect();
///         Value::from(words.join(" "))
///     }))
///     .build();
///
/// let model = Model::new(&schema, attrs! { "first" => "Ada", "last" => "Lovelace" });
/// assert_eq!(model.get("full").as_str(), Some("Ada Lovelace"));
///
/// model.set("first", "Augusta");
/// assert_eq!(model.get("full").as_str(), Some("Augusta Lovelace"));
/// ```
#[derive(Clone)]
pub struct Binder {
    key: KeyPath,
    from: Vec<KeyPath>,
    compute: Option<Compute>,
}

impl Binder {
    pub fn new(key: impl IntoKeyPath) -> Self {
        Self {
            key: key.into_key_path(),
            from: Vec::new(),
            compute: None,
        }
    }

    /// Keys whose values feed the computation, in argument order.
    pub fn from<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoKeyPath,
    {
        self.from.extend(keys.into_iter().map(IntoKeyPath::into_key_path));
        self
    }

    /// Without a compute function the first source value is copied.
    pub fn compute<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.compute = Some(Arc::new(f));
        self
    }

    pub fn key(&self) -> &KeyPath {
        &self.key
    }

    pub fn sources(&self) -> &[KeyPath] {
        &self.from
    }

    /// Recompute and store the bound value.
    pub(crate) fn apply(&self, model: &Model) {
        let values: Vec<Value> = self.from.iter().map(|key| model.get(key)).collect();
        let value = match &self.compute {
            Some(compute) => compute(&values),
            None => values.into_iter().next().unwrap_or_default(),
        };
        model.set(&self.key, value);
    }

    /// Start keeping `model`'s key up to date, applying once immediately.
    pub(crate) fn bind(&self, model: &Model) -> BoundBinder {
        let subscriptions = self
            .from
            .iter()
            .map(|source| {
                let binder = self.clone();
                let weak = model.downgrade();
                model.watch(source).react(move |_| {
                    if let Some(model) = weak.upgrade() {
                        binder.apply(&model);
                    }
                })
            })
            .collect();
        self.apply(model);
        BoundBinder {
            binder: self.clone(),
            subscriptions,
        }
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("key", &self.key)
            .field("from", &self.from)
            .finish()
    }
}

/// A binder attached to one model. Detaches when dropped.
pub(crate) struct BoundBinder {
    binder: Binder,
    subscriptions: Vec<Subscription>,
}

impl BoundBinder {
    pub(crate) fn key(&self) -> &KeyPath {
        &self.binder.key
    }

    pub(crate) fn binder(&self) -> &Binder {
        &self.binder
    }
}

impl Drop for BoundBinder {
    fn drop(&mut self) {
        for subscription in &self.subscriptions {
            subscription.cancel();
        }
    }
}
