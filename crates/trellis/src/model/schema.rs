//! Per-type attribute and binder registries.
//!
//! A [`Schema`] describes a kind of model: which keys carry attribute
//! descriptors, which keys are computed by binders, and what model-level
//! hooks run. Schemas are built once with [`Schema::builder`]. A schema that
//! [`extends`](SchemaBuilder::extends) another starts from a copy of the
//! parent's registry and its own declarations win on collision, so lookups
//! on an instance never walk a chain.
//!
//! ```
//! use trellis::model::{Model, Schema, SimpleAttribute};
//! use trellis::attrs;
//!
//! let base = Schema::builder("Person")
//!     .attribute("name", SimpleAttribute::new().with_default("anonymous"))
//!     .build();
//! let staff = Schema::builder("Staff")
//!     .extends(&base)
//!     .attribute("role", SimpleAttribute::new().with_default("engineer"))
//!     .build();
//!
//! let model = Model::new(&staff, attrs! {});
//! assert_eq!(model.get("name").as_str(), Some("anonymous"));
//! assert_eq!(model.get("role").as_str(), Some("engineer"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use trellis_core::{IntoKeyPath, KeyPath, Result};

use super::binder::Binder;
use super::issue::Issue;
use super::store::{Model, WeakModel};
use super::value::Value;
use crate::collection::List;

/// Options handed to serialize and extract hooks, passed through verbatim.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Produces the model-level issue list for a model.
pub type IssueSource = Arc<dyn Fn(&Model) -> List<Issue> + Send + Sync>;

/// A once-per-model hook. See [`SchemaBuilder::preinitialize`] and
/// [`SchemaBuilder::initialize`] for when each runs.
pub type Initializer = Arc<dyn Fn(&Model) + Send + Sync>;

/// Where an attribute instance lives.
#[derive(Clone)]
pub struct AttributeContext {
    model: WeakModel,
    key: KeyPath,
}

impl AttributeContext {
    pub(crate) fn new(model: &Model, key: KeyPath) -> Self {
        Self {
            model: model.downgrade(),
            key,
        }
    }

    /// The owning model, while it is alive.
    pub fn model(&self) -> Option<Model> {
        self.model.upgrade()
    }

    pub fn key(&self) -> &KeyPath {
        &self.key
    }

    /// The attribute's current value, ignoring its own default.
    pub fn value(&self) -> Value {
        self.model()
            .map_or(Value::Null, |model| model.get_with(&self.key, true))
    }
}

impl fmt::Debug for AttributeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeContext")
            .field("key", &self.key)
            .finish()
    }
}

/// A per-model attribute descriptor.
///
/// Every hook is optional. A hook returning `None` means "not declared", and
/// the model falls back to its generic behaviour for that key.
pub trait Attribute: Send + Sync {
    /// Value reported when the key resolves to nothing.
    fn default_value(&self) -> Option<Value> {
        None
    }

    /// Whether the default is stored on first read.
    fn write_default(&self) -> bool {
        false
    }

    /// Transient attributes never count as modifications and stored
    /// references under them are not tracked.
    fn transient(&self) -> bool {
        false
    }

    /// Serialized form of this attribute's value.
    fn serialize(&self, _options: &Options) -> Option<serde_json::Value> {
        None
    }

    /// Extracted form of this attribute's value.
    fn extract(&self, _options: &Options) -> Option<serde_json::Value> {
        None
    }

    /// Validation issues for this attribute.
    fn issues(&self) -> Option<List<Issue>> {
        None
    }
}

/// A registered attribute type: creates per-model descriptors and converts
/// serialized input for its key.
pub trait AttributeClass: Send + Sync {
    fn instantiate(&self, context: AttributeContext) -> Arc<dyn Attribute>;

    /// Convert serialized input for `key` into a stored value.
    fn deserialize(&self, _key: &KeyPath, data: &serde_json::Value) -> Result<Value> {
        Ok(Value::from_json(data))
    }
}

/// A stateless attribute configured with a default and flags.
#[derive(Clone, Debug, Default)]
pub struct SimpleAttribute {
    default: Option<Value>,
    write_default: bool,
    transient: bool,
}

impl SimpleAttribute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn write_default(mut self, write: bool) -> Self {
        self.write_default = write;
        self
    }

    pub fn transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }
}

impl Attribute for SimpleAttribute {
    fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    fn write_default(&self) -> bool {
        self.write_default
    }

    fn transient(&self) -> bool {
        self.transient
    }
}

impl AttributeClass for SimpleAttribute {
    fn instantiate(&self, _context: AttributeContext) -> Arc<dyn Attribute> {
        Arc::new(self.clone())
    }
}

/// The registry shared by every model of one kind.
pub struct Schema {
    name: String,
    parent: Option<Arc<Schema>>,
    own_attributes: BTreeMap<KeyPath, Arc<dyn AttributeClass>>,
    attributes: BTreeMap<KeyPath, Arc<dyn AttributeClass>>,
    binders: Vec<Binder>,
    issues: Option<IssueSource>,
    preinitialize: Option<Initializer>,
    initialize: Option<Initializer>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            parent: None,
            attributes: BTreeMap::new(),
            binders: Vec::new(),
            issues: None,
            preinitialize: None,
            initialize: None,
        }
    }

    /// A schema with no declarations.
    pub fn plain() -> Arc<Schema> {
        Self::builder("Model").build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Schema>> {
        self.parent.as_ref()
    }

    /// The attribute class for `key`, declared here or inherited.
    pub fn attribute_class(&self, key: &KeyPath) -> Option<Arc<dyn AttributeClass>> {
        self.attributes.get(key).cloned()
    }

    /// The attribute class for `key` if declared on this schema itself.
    pub fn own_attribute_class(&self, key: &KeyPath) -> Option<Arc<dyn AttributeClass>> {
        self.own_attributes.get(key).cloned()
    }

    /// Every key with an attribute class, inherited ones included.
    pub fn attribute_keys(&self) -> impl Iterator<Item = &KeyPath> {
        self.attributes.keys()
    }

    /// Binders, most derived schema first. A key may appear more than once;
    /// the first occurrence is the one that binds.
    pub fn binders(&self) -> &[Binder] {
        &self.binders
    }

    pub(crate) fn issue_source(&self) -> Option<&IssueSource> {
        self.issues.as_ref()
    }

    pub(crate) fn preinitializer(&self) -> Option<&Initializer> {
        self.preinitialize.as_ref()
    }

    pub(crate) fn initializer(&self) -> Option<&Initializer> {
        self.initialize.as_ref()
    }

    /// Whether this schema is `other` or extends it.
    pub fn is(&self, other: &Arc<Schema>) -> bool {
        std::ptr::eq(self, Arc::as_ptr(other)) || self.parent.as_ref().is_some_and(|p| p.is(other))
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field("binders", &self.binders.len())
            .finish()
    }
}

/// Builder for [`Schema`].
pub struct SchemaBuilder {
    name: String,
    parent: Option<Arc<Schema>>,
    attributes: BTreeMap<KeyPath, Arc<dyn AttributeClass>>,
    binders: Vec<Binder>,
    issues: Option<IssueSource>,
    preinitialize: Option<Initializer>,
    initialize: Option<Initializer>,
}

impl SchemaBuilder {
    /// Inherit attributes, binders and hooks from `parent`.
    pub fn extends(mut self, parent: &Arc<Schema>) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn attribute(self, key: impl IntoKeyPath, class: impl AttributeClass + 'static) -> Self {
        self.attribute_shared(key, Arc::new(class))
    }

    pub fn attribute_shared(mut self, key: impl IntoKeyPath, class: Arc<dyn AttributeClass>) -> Self {
        self.attributes.insert(key.into_key_path(), class);
        self
    }

    pub fn bind(mut self, binder: Binder) -> Self {
        self.binders.push(binder);
        self
    }

    /// Model-level issues, listed ahead of attribute issues.
    pub fn issues<F>(mut self, source: F) -> Self
    where
        F: Fn(&Model) -> List<Issue> + Send + Sync + 'static,
    {
        self.issues = Some(Arc::new(source));
        self
    }

    /// Hook run on the empty model, before initial attributes are set.
    pub fn preinitialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Model) + Send + Sync + 'static,
    {
        self.preinitialize = Some(Arc::new(f));
        self
    }

    /// Hook run after initial attributes are set and before binders bind.
    pub fn initialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Model) + Send + Sync + 'static,
    {
        self.initialize = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Arc<Schema> {
        let parent = self.parent;

        let mut attributes = parent
            .as_ref()
            .map(|p| p.attributes.clone())
            .unwrap_or_default();
        attributes.extend(self.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut binders = self.binders;
        if let Some(p) = &parent {
            binders.extend(p.binders.iter().cloned());
        }

        let issues = self.issues.or_else(|| parent.as_ref().and_then(|p| p.issues.clone()));
        let preinitialize = self
            .preinitialize
            .or_else(|| parent.as_ref().and_then(|p| p.preinitialize.clone()));
        let initialize = self
            .initialize
            .or_else(|| parent.as_ref().and_then(|p| p.initialize.clone()));

        tracing::debug!(
            target: "trellis::model",
            schema = %self.name,
            attributes = attributes.len(),
            binders = binders.len(),
            "schema built"
        );

        Arc::new(Schema {
            name: self.name,
            parent,
            own_attributes: self.attributes,
            attributes,
            binders,
            issues,
            preinitialize,
            initialize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_declarations_win() {
        let base = Schema::builder("Base")
            .attribute("a", SimpleAttribute::new().with_default(1))
            .attribute("b", SimpleAttribute::new().with_default(2))
            .build();
        let derived = Schema::builder("Derived")
            .extends(&base)
            .attribute("b", SimpleAttribute::new().with_default(20))
            .build();

        let b = KeyPath::from_segments(["b"]);
        let a = KeyPath::from_segments(["a"]);
        assert_eq!(derived.attribute_keys().count(), 2);
        assert!(derived.attribute_class(&a).is_some());
        assert!(derived.own_attribute_class(&a).is_none());
        assert!(derived.own_attribute_class(&b).is_some());
        assert!(derived.is(&base));
        assert!(!base.is(&derived));
    }

    #[test]
    fn test_binders_most_derived_first() {
        let base = Schema::builder("Base").bind(Binder::new("x")).build();
        let derived = Schema::builder("Derived")
            .extends(&base)
            .bind(Binder::new("y"))
            .build();

        let keys: Vec<String> = derived.binders().iter().map(|b| b.key().to_string()).collect();
        assert_eq!(keys, vec!["y", "x"]);
    }
}
