//! The hierarchical attribute store.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use trellis_core::{
    EventBus, IntoKeyPath, KeyPath, Listener, Result, Subscription, TrellisError, Varying,
    VaryingEvent,
};

use super::binder::BoundBinder;
use super::depth::{Depth, DepthPredicate};
use super::issue::Issue;
use super::reference::{Reference, ReferenceSlot};
use super::schema::{Attribute, AttributeClass, AttributeContext, Options, Schema};
use super::value::{Map, Value, deep_get, deep_remove, deep_set, for_each_leaf, leaf_paths};
use crate::collection::{CattedList, FilteredList, List, ListArgs, ListEvent, ObservableList};

/// Change notifications a [`Model`] emits.
///
/// For a write to `a.b.c` the model emits, in order, `Changed(a.b.c)`,
/// `SubKeyChanged(a.b)`, `SubKeyChanged(a)` and finally `AnyChanged`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelEvent {
    /// The value at exactly this path changed.
    Changed(KeyPath),
    /// Something underneath this path changed.
    SubKeyChanged(KeyPath),
    /// Any attribute changed.
    AnyChanged,
}

/// Payload delivered with every [`ModelEvent`].
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    /// The full path that was written.
    pub key: KeyPath,
    pub new_value: Value,
    pub old_value: Value,
    /// The path this particular event was emitted for.
    pub part: KeyPath,
}

/// Construction options for [`Model::with_options`].
#[derive(Clone, Debug, Default)]
pub struct ModelOptions {
    /// The model this one shadows.
    pub parent: Option<Model>,
}

#[derive(Clone, Copy)]
enum Walk {
    Serialize,
    Extract,
}

enum WatchState {
    Pending(Subscription),
    Resolved(Model),
}

/// A stored reference the model is waiting on.
struct ReferenceWatch {
    reference: Reference,
    state: WatchState,
}

struct ModelInner {
    schema: Arc<Schema>,
    parent: Option<Model>,
    attributes: RwLock<Map>,
    events: EventBus<ModelEvent, Change>,
    watches: Mutex<HashMap<KeyPath, Varying<Value>>>,
    attribute_cache: Mutex<HashMap<KeyPath, Option<Arc<dyn Attribute>>>>,
    binders: Mutex<Vec<BoundBinder>>,
    submodels: List<Model>,
    subreferences: List<Reference>,
    reference_watches: Mutex<Vec<ReferenceWatch>>,
    modified_deep: Mutex<Option<Varying<bool>>>,
    modified_shallow: Mutex<Option<Varying<bool>>>,
    modified_by: Mutex<Vec<(DepthPredicate, Varying<bool>)>>,
    issues: Mutex<Option<FilteredList<Issue>>>,
}

impl Drop for ModelInner {
    fn drop(&mut self) {
        for watch in self.reference_watches.get_mut().drain(..) {
            if let WatchState::Pending(subscription) = watch.state {
                subscription.cancel();
            }
        }
    }
}

/// An observable key/value store that can shadow a parent.
///
/// A shadow starts empty and reads through to its parent for every key it
/// has not set itself. Writing to a shadow never touches the parent until
/// [`merge`](Self::merge) is called, and [`modified`](Self::modified)
/// reports whether the shadow's own values differ from what it would
/// inherit.
///
/// # Example
///
/// ```
/// use trellis::model::{Model, Schema};
/// use trellis::attrs;
///
/// let schema = Schema::plain();
/// let saved = Model::new(&schema, attrs! { "title" => "Draft" });
/// let draft = saved.shadow();
///
/// assert_eq!(draft.get("title").as_str(), Some("Draft"));
/// draft.set("title", "Final");
/// assert!(draft.modified(true));
/// assert_eq!(saved.get("title").as_str(), Some("Draft"));
///
/// draft.merge();
/// assert_eq!(saved.get("title").as_str(), Some("Final"));
/// ```
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Model {}

impl Model {
    /// Create a root model holding `attributes`.
    pub fn new(schema: &Arc<Schema>, attributes: Map) -> Model {
        Self::with_options(schema, attributes, ModelOptions::default())
    }

    /// Create a model with explicit options.
    ///
    /// The schema's preinitializer runs on the empty model, then initial
    /// attributes are written, then the initializer runs, then binders are
    /// bound (most derived schema first, one per key).
    pub fn with_options(schema: &Arc<Schema>, attributes: Map, options: ModelOptions) -> Model {
        let model = Model {
            inner: Arc::new(ModelInner {
                schema: schema.clone(),
                parent: options.parent,
                attributes: RwLock::new(Map::new()),
                events: EventBus::new(),
                watches: Mutex::new(HashMap::new()),
                attribute_cache: Mutex::new(HashMap::new()),
                binders: Mutex::new(Vec::new()),
                submodels: List::new(),
                subreferences: List::new(),
                reference_watches: Mutex::new(Vec::new()),
                modified_deep: Mutex::new(None),
                modified_shallow: Mutex::new(None),
                modified_by: Mutex::new(Vec::new()),
                issues: Mutex::new(None),
            }),
        };

        if let Some(preinitialize) = schema.preinitializer() {
            preinitialize(&model);
        }
        model.set_map(&attributes);
        if let Some(initialize) = schema.initializer() {
            initialize(&model);
        }

        let mut bound: Vec<BoundBinder> = Vec::new();
        for binder in schema.binders() {
            if bound.iter().all(|b| b.key() != binder.key()) {
                bound.push(binder.bind(&model));
            }
        }
        *model.inner.binders.lock() = bound;

        tracing::trace!(
            target: "trellis::model",
            schema = schema.name(),
            shadow = model.inner.parent.is_some(),
            "model created"
        );
        model
    }

    /// Build a model of `schema` from serialized data, passing each declared
    /// attribute's input through its class's `deserialize`.
    pub fn deserialize(schema: &Arc<Schema>, data: &serde_json::Value) -> Result<Model> {
        let _span = tracing::debug_span!("trellis::model::serialize", schema = schema.name()).entered();
        let serde_json::Value::Object(fields) = data else {
            return Err(TrellisError::NotAnObject {
                found: json_kind(data),
            });
        };

        let mut attributes: Map = fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect();
        for key in schema.attribute_keys() {
            let Some(prop) = json_deep_get(fields, key) else {
                continue;
            };
            if prop.is_null() {
                continue;
            }
            if let Some(class) = schema.attribute_class(key) {
                let value = class.deserialize(key, prop)?;
                deep_set(&mut attributes, key, value);
            }
        }
        Ok(Model::new(schema, attributes))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    pub fn parent(&self) -> Option<&Model> {
        self.inner.parent.as_ref()
    }

    /// Stable identity of this model.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn downgrade(&self) -> WeakModel {
        WeakModel {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ------------------------------------------------------------------
    // Reading and writing
    // ------------------------------------------------------------------

    /// The value at `key`, resolved through the parent chain and the
    /// attribute default. Never fails; unresolvable keys are `Null`.
    pub fn get(&self, key: impl IntoKeyPath) -> Value {
        self.get_with(key, false)
    }

    /// Like [`get`](Self::get); with `bypass_attribute` set the attribute
    /// default is not consulted.
    ///
    /// When the value comes from the parent and is itself a model, a shadow
    /// of it is stored locally and returned instead, so edits to nested
    /// models stay on this side too. Inherited references are mapped the
    /// same way.
    pub fn get_with(&self, key: impl IntoKeyPath, bypass_attribute: bool) -> Value {
        let key = key.into_key_path();
        let local = deep_get(&self.inner.attributes.read(), &key).cloned();

        let value = match (local, &self.inner.parent) {
            (Some(value), _) => value,
            (None, None) => Value::Null,
            (None, Some(parent)) => match parent.get(&key) {
                Value::Model(inherited) => {
                    tracing::debug!(target: "trellis::model", key = %key, "materializing nested shadow");
                    self.set(&key, inherited.shadow())
                }
                Value::Reference(inherited) => {
                    let mapped = inherited.map(|resolved| match resolved {
                        Value::Model(model) => Value::Model(model.shadow()),
                        other => other.clone(),
                    });
                    self.set(&key, mapped)
                }
                other => other,
            },
        };

        if !value.is_null() || bypass_attribute {
            return value;
        }
        match self.attribute(&key) {
            Some(attribute) => match attribute.default_value() {
                Some(default) if attribute.write_default() => self.set(&key, default),
                Some(default) => default,
                None => Value::Null,
            },
            None => Value::Null,
        }
    }

    /// Store `value` at `key` and emit change events. Writing the value
    /// already stored locally does nothing. Returns the value.
    ///
    /// Storing `Null` is an explicit override: the key then reads as null
    /// (or its default) instead of falling through to the parent.
    pub fn set(&self, key: impl IntoKeyPath, value: impl Into<Value>) -> Value {
        let key = key.into_key_path();
        let value = value.into();
        if key.is_empty() {
            return value;
        }
        let old = {
            let mut attributes = self.inner.attributes.write();
            if deep_get(&attributes, &key) == Some(&value) {
                return value;
            }
            deep_set(&mut attributes, &key, value.clone())
        };
        self.emit_change(&key, value.clone(), old.unwrap_or_default());
        value
    }

    /// Write every leaf of `attributes`.
    pub fn set_map(&self, attributes: &Map) {
        let mut leaves = Vec::new();
        for_each_leaf(attributes, &KeyPath::root(), &mut |path, value| {
            leaves.push((path, value.clone()));
        });
        for (path, value) in leaves {
            self.set(path, value);
        }
    }

    /// Make the local attributes match `attributes`: local leaves missing
    /// from it are unset, then every leaf of it is written.
    pub fn set_all(&self, attributes: &Map) {
        for path in self.local_leaf_paths() {
            if !deep_get(attributes, &path).is_some_and(|value| !value.is_null()) {
                self.unset(&path);
            }
        }
        self.set_map(attributes);
    }

    /// Clear `key`. On a shadow this stores an explicit null override so
    /// the parent's value is hidden; on a root model the key is removed.
    /// Returns the previous value.
    pub fn unset(&self, key: impl IntoKeyPath) -> Value {
        let key = key.into_key_path();
        if self.inner.parent.is_none() {
            return self.delete_attr(&key).unwrap_or_default();
        }
        let old = self.get(&key);
        deep_set(&mut self.inner.attributes.write(), &key, Value::Null);
        if !old.is_null() {
            let new = self.get(&key);
            self.emit_change(&key, new, old.clone());
        }
        old
    }

    /// Drop this shadow's own value for `key` so it reads through to the
    /// parent again. Does nothing on a root model.
    pub fn revert(&self, key: impl IntoKeyPath) -> Option<Value> {
        self.inner.parent.as_ref()?;
        self.delete_attr(&key.into_key_path())
    }

    fn delete_attr(&self, key: &KeyPath) -> Option<Value> {
        let old = deep_remove(&mut self.inner.attributes.write(), key)?;
        let new = self.get(key);
        if new != old {
            self.emit_change(key, new, old.clone());
        }
        Some(old)
    }

    /// A copy of the locally stored attributes.
    pub fn attributes(&self) -> Map {
        self.inner.attributes.read().clone()
    }

    fn local_leaf_paths(&self) -> Vec<KeyPath> {
        leaf_paths(&self.inner.attributes.read())
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn events(&self) -> &EventBus<ModelEvent, Change> {
        &self.inner.events
    }

    pub fn on<F>(&self, event: ModelEvent, handler: F) -> Listener<ModelEvent>
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        self.inner.events.on(event, handler)
    }

    pub fn off(&self, listener: &Listener<ModelEvent>) -> bool {
        self.inner.events.off(listener)
    }

    /// A cell tracking [`get`](Self::get) for `key`, including changes that
    /// arrive through the parent. One cell per key is kept for the model's
    /// lifetime.
    pub fn watch(&self, key: impl IntoKeyPath) -> Varying<Value> {
        let key = key.into_key_path();
        if let Some(existing) = self.inner.watches.lock().get(&key) {
            return existing.clone();
        }

        let cell = Varying::new(self.get(&key));
        if let Some(parent) = &self.inner.parent {
            let weak = cell.downgrade();
            let model = self.downgrade();
            let path = key.clone();
            cell.listen_to(parent.events(), ModelEvent::Changed(key.clone()), move |_: &Change| {
                if let (Some(cell), Some(model)) = (weak.upgrade(), model.upgrade()) {
                    cell.set_value(model.get(&path));
                }
            });
        }
        let weak = cell.downgrade();
        cell.listen_to(self.events(), ModelEvent::Changed(key.clone()), move |change: &Change| {
            if let Some(cell) = weak.upgrade() {
                cell.set_value(change.new_value.clone());
            }
        });

        self.inner.watches.lock().entry(key).or_insert(cell).clone()
    }

    /// A cell holding this model that notifies on every attribute change.
    pub fn watch_all(&self) -> Varying<Model> {
        let cell = Varying::new(self.clone());
        let weak = cell.downgrade();
        cell.listen_to(self.events(), ModelEvent::AnyChanged, move |_: &Change| {
            if let Some(cell) = weak.upgrade() {
                let model = cell.get();
                cell.set_value_forced(model);
            }
        });
        cell
    }

    // ------------------------------------------------------------------
    // Attribute descriptors and binders
    // ------------------------------------------------------------------

    /// The attribute instance for `key`, created on first use.
    pub fn attribute(&self, key: impl IntoKeyPath) -> Option<Arc<dyn Attribute>> {
        let key = key.into_key_path();
        if let Some(cached) = self.inner.attribute_cache.lock().get(&key) {
            return cached.clone();
        }
        let instance = self
            .inner
            .schema
            .attribute_class(&key)
            .map(|class| class.instantiate(AttributeContext::new(self, key.clone())));
        self.inner
            .attribute_cache
            .lock()
            .entry(key)
            .or_insert(instance)
            .clone()
    }

    /// Instances for every attribute the schema declares or inherits.
    pub fn all_attributes(&self) -> Vec<Arc<dyn Attribute>> {
        let keys: Vec<KeyPath> = self.inner.schema.attribute_keys().cloned().collect();
        keys.into_iter().filter_map(|key| self.attribute(key)).collect()
    }

    /// The attribute class declared for `key` on this model's own schema.
    pub fn attribute_class(&self, key: impl IntoKeyPath) -> Option<Arc<dyn AttributeClass>> {
        self.inner.schema.own_attribute_class(&key.into_key_path())
    }

    /// Re-run the binder for `key`, if one is bound.
    pub fn rebind(&self, key: impl IntoKeyPath) {
        let key = key.into_key_path();
        let binder = self
            .inner
            .binders
            .lock()
            .iter()
            .find(|bound| *bound.key() == key)
            .map(|bound| bound.binder().clone());
        if let Some(binder) = binder {
            binder.apply(self);
        }
    }

    // ------------------------------------------------------------------
    // Shadows and modification
    // ------------------------------------------------------------------

    /// A new, empty model of the same schema reading through to this one.
    pub fn shadow(&self) -> Model {
        Model::with_options(
            &self.inner.schema,
            Map::new(),
            ModelOptions {
                parent: Some(self.clone()),
            },
        )
    }

    /// The root of the shadow chain (this model if it has no parent).
    pub fn original(&self) -> Model {
        match &self.inner.parent {
            Some(parent) => parent.original(),
            None => self.clone(),
        }
    }

    /// Every ancestor, nearest first.
    pub fn originals(&self) -> Vec<Model> {
        let mut ancestors = Vec::new();
        let mut current = self.inner.parent.clone();
        while let Some(model) = current {
            current = model.inner.parent.clone();
            ancestors.push(model);
        }
        ancestors
    }

    /// Write this shadow's own attributes into its parent.
    pub fn merge(&self) {
        if let Some(parent) = &self.inner.parent {
            parent.set_map(&self.attributes());
        }
    }

    /// Whether any local value differs from what would be inherited.
    ///
    /// With a deep [`Depth`], nested shadow models count as modified when
    /// their own attributes are. `bool` converts into a depth.
    pub fn modified(&self, depth: impl Into<Depth>) -> bool {
        self.modified_with(&depth.into())
    }

    fn modified_with(&self, depth: &Depth) -> bool {
        if self.inner.parent.is_none() {
            return false;
        }
        self.local_leaf_paths()
            .iter()
            .any(|path| self.attr_modified_with(path, depth))
    }

    /// Whether the local value at `key` differs from the inherited one.
    pub fn attr_modified(&self, key: impl IntoKeyPath, depth: impl Into<Depth>) -> bool {
        self.attr_modified_with(&key.into_key_path(), &depth.into())
    }

    fn attr_modified_with(&self, key: &KeyPath, depth: &Depth) -> bool {
        let Some(parent) = &self.inner.parent else {
            return false;
        };
        let Some(value) = deep_get(&self.inner.attributes.read(), key).cloned() else {
            return false;
        };
        if self.attribute(key).is_some_and(|attribute| attribute.transient()) {
            return false;
        }

        let value = value.settled();
        let inherited = parent.get(key).settled();
        match &value {
            Value::Model(model) => {
                let shadows_inherited = matches!(
                    &inherited,
                    Value::Model(original) if model.originals().contains(original)
                );
                !shadows_inherited
                    || (depth.descends(self, key, &value) && model.modified_with(depth))
            }
            _ => inherited != value,
        }
    }

    /// A live [`modified`](Self::modified). One cell per depth is kept for
    /// the model's lifetime; predicate depths are told apart by identity.
    pub fn watch_modified(&self, depth: impl Into<Depth>) -> Varying<bool> {
        let depth = depth.into();
        if let Depth::Predicate(predicate) = &depth {
            return self.watch_modified_by(predicate.clone());
        }
        let cell = {
            let mut memo = if matches!(depth, Depth::Deep) {
                self.inner.modified_deep.lock()
            } else {
                self.inner.modified_shallow.lock()
            };
            if let Some(existing) = memo.as_ref() {
                return existing.clone();
            }
            // Stored before wiring: a sub-model that reaches back here must
            // find this cell rather than build another.
            let cell = Varying::new(false);
            *memo = Some(cell.clone());
            cell
        };
        self.wire_modified(&cell, depth);
        cell
    }

    fn watch_modified_by(&self, predicate: DepthPredicate) -> Varying<bool> {
        let cell = {
            let mut memo = self.inner.modified_by.lock();
            if let Some((_, existing)) = memo.iter().find(|(p, _)| Arc::ptr_eq(p, &predicate)) {
                return existing.clone();
            }
            let cell = Varying::new(false);
            memo.push((predicate.clone(), cell.clone()));
            cell
        };
        self.wire_modified(&cell, Depth::Predicate(predicate));
        cell
    }

    fn wire_modified(&self, cell: &Varying<bool>, depth: Depth) {
        cell.set_value(self.modified_with(&depth));

        let weak = cell.downgrade();
        let model = self.downgrade();
        let on_change = depth.clone();
        cell.listen_to(self.events(), ModelEvent::AnyChanged, move |change: &Change| {
            let (Some(cell), Some(model)) = (weak.upgrade(), model.upgrade()) else {
                return;
            };
            if model.attr_modified_with(&change.key, &on_change) {
                cell.set_value(true);
            } else {
                cell.set_value(model.modified_with(&on_change));
            }
        });

        if !depth.watches_submodels() {
            return;
        }
        let submodels = self.inner.submodels.uniq();
        for submodel in submodels.items() {
            watch_submodel(cell, &submodel, self.downgrade(), depth.clone());
        }

        let weak = cell.downgrade();
        let model = self.downgrade();
        let on_added = depth.clone();
        cell.listen_to(submodels.events(), ListEvent::Added, move |(submodel, _): &ListArgs<Model>| {
            if let Some(cell) = weak.upgrade() {
                watch_submodel(&cell, submodel, model.clone(), on_added.clone());
            }
        });
        let weak = cell.downgrade();
        cell.listen_to(submodels.events(), ListEvent::Removed, move |(submodel, _): &ListArgs<Model>| {
            if let Some(cell) = weak.upgrade() {
                cell.unlisten_to(&submodel.watch_modified(depth.clone()));
            }
        });
        cell.keep_alive(submodels);
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Every currently active issue: model-level issues first, then each
    /// attribute's, in key order.
    pub fn issues(&self) -> FilteredList<Issue> {
        if let Some(existing) = self.inner.issues.lock().as_ref() {
            return existing.clone();
        }
        let mut sources: Vec<List<Issue>> = Vec::new();
        if let Some(source) = self.inner.schema.issue_source() {
            sources.push(source(self));
        }
        sources.extend(self.all_attributes().iter().filter_map(|attribute| attribute.issues()));

        let active = CattedList::new(sources).filter_varying(|issue: &Issue| issue.active().clone());
        self.inner.issues.lock().get_or_insert(active).clone()
    }

    /// True while no active issue has a severity at or below `severity`.
    pub fn valid(&self, severity: i64) -> Varying<bool> {
        self.issues()
            .filter_varying(move |issue: &Issue| issue.severity().map(move |s| *s <= severity))
            .watch_length()
            .map(|count| *count == 0)
    }

    // ------------------------------------------------------------------
    // Sub-model tracking
    // ------------------------------------------------------------------

    /// Models stored directly as attribute values, plus resolved references.
    pub fn submodels(&self) -> List<Model> {
        self.inner.submodels.clone()
    }

    /// Non-transient references stored as attribute values that have not
    /// resolved to a model yet.
    pub fn subreferences(&self) -> List<Reference> {
        self.inner.subreferences.clone()
    }

    /// The state of every stored reference this model is tracking.
    pub fn reference_slots(&self) -> Vec<ReferenceSlot> {
        self.inner
            .reference_watches
            .lock()
            .iter()
            .map(|watch| match &watch.state {
                WatchState::Pending(_) => ReferenceSlot::Pending(watch.reference.clone()),
                WatchState::Resolved(model) => ReferenceSlot::Resolved(model.clone()),
            })
            .collect()
    }

    fn track_reference(&self, reference: &Reference) {
        if self
            .inner
            .reference_watches
            .lock()
            .iter()
            .any(|watch| watch.reference == *reference)
        {
            return;
        }

        let weak = self.downgrade();
        let id = reference.id();
        let subscription = reference.react(move |value| {
            if let (Some(model), Some(Value::Model(resolved))) = (weak.upgrade(), value) {
                model.upgrade_reference(id, resolved.clone());
            }
        });
        self.inner.reference_watches.lock().push(ReferenceWatch {
            reference: reference.clone(),
            state: WatchState::Pending(subscription),
        });

        if let Some(Value::Model(resolved)) = reference.value() {
            self.upgrade_reference(id, resolved);
        }
    }

    fn upgrade_reference(&self, id: usize, resolved: Model) {
        let (reference, subscription) = {
            let mut watches = self.inner.reference_watches.lock();
            let Some(watch) = watches.iter_mut().find(|watch| watch.reference.id() == id) else {
                return;
            };
            if !matches!(watch.state, WatchState::Pending(_)) {
                return;
            }
            let WatchState::Pending(subscription) =
                std::mem::replace(&mut watch.state, WatchState::Resolved(resolved.clone()))
            else {
                return;
            };
            (watch.reference.clone(), subscription)
        };
        subscription.cancel();

        if self.inner.subreferences.remove(&reference).is_some() {
            tracing::debug!(target: "trellis::model", model = self.id(), "reference resolved to sub-model");
            self.inner.submodels.push(resolved);
        }
    }

    fn release_reference(&self, reference: &Reference) {
        if self.inner.subreferences.contains(reference) {
            return;
        }
        let watch = {
            let mut watches = self.inner.reference_watches.lock();
            let Some(pos) = watches.iter().position(|watch| watch.reference == *reference) else {
                return;
            };
            watches.remove(pos)
        };
        match watch.state {
            WatchState::Pending(subscription) => {
                subscription.cancel();
            }
            WatchState::Resolved(model) => {
                self.inner.submodels.remove(&model);
            }
        }
    }

    fn emit_change(&self, key: &KeyPath, new_value: Value, old_value: Value) {
        if let Value::Model(old) = &old_value {
            self.inner.submodels.remove(old);
        }
        if let Value::Model(new) = &new_value {
            self.inner.submodels.push(new.clone());
        }
        if let Value::Reference(old) = &old_value {
            self.inner.subreferences.remove(old);
            self.release_reference(old);
        }
        if let Value::Reference(new) = &new_value {
            if !self.attribute(key).is_some_and(|attribute| attribute.transient()) {
                self.inner.subreferences.push(new.clone());
                self.track_reference(new);
            }
        }

        let _span = tracing::trace_span!("trellis::model::change", key = %key).entered();
        tracing::trace!(target: "trellis::model", model = self.id(), "attribute changed");
        let change = |part: &KeyPath| Change {
            key: key.clone(),
            new_value: new_value.clone(),
            old_value: old_value.clone(),
            part: part.clone(),
        };
        self.inner.events.emit(&ModelEvent::Changed(key.clone()), change(key));
        for prefix in key.strict_prefixes() {
            self.inner
                .events
                .emit(&ModelEvent::SubKeyChanged(prefix.clone()), change(&prefix));
        }
        self.inner.events.emit(&ModelEvent::AnyChanged, change(key));
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Plain data for this model: the parent's serialization with this
    /// model's own values layered on top. Attributes with a serialize hook
    /// supply their own form; explicit nulls remove the key.
    pub fn serialize(&self) -> serde_json::Value {
        self.serialize_with(&Options::new())
    }

    pub fn serialize_with(&self, options: &Options) -> serde_json::Value {
        let _span = tracing::trace_span!("trellis::model::serialize", model = self.id()).entered();
        serde_json::Value::Object(self.plain_object(Walk::Serialize, options))
    }

    /// The same walk as [`serialize`](Self::serialize) using each
    /// attribute's extract hook, handed to `f`.
    pub fn extract<R, F>(&self, f: F, options: &Options) -> R
    where
        F: FnOnce(serde_json::Value) -> R,
    {
        f(self.extract_plain(options))
    }

    pub fn extract_plain(&self, options: &Options) -> serde_json::Value {
        serde_json::Value::Object(self.plain_object(Walk::Extract, options))
    }

    fn plain_object(&self, walk: Walk, options: &Options) -> serde_json::Map<String, serde_json::Value> {
        let mut target = match &self.inner.parent {
            Some(parent) => parent.plain_object(walk, options),
            None => serde_json::Map::new(),
        };
        let local = self.attributes();
        self.walk_attributes(walk, options, &KeyPath::root(), &local, &mut target);
        target
    }

    fn walk_attributes(
        &self,
        walk: Walk,
        options: &Options,
        prefix: &KeyPath,
        source: &Map,
        target: &mut serde_json::Map<String, serde_json::Value>,
    ) {
        for (segment, value) in source {
            let path = prefix.child(segment.clone());
            if value.is_null() {
                target.remove(segment);
                continue;
            }

            let hooked = self.attribute(&path).and_then(|attribute| match walk {
                Walk::Serialize => attribute.serialize(options),
                Walk::Extract => attribute.extract(options),
            });
            let result = match (hooked, value) {
                (Some(result), _) => result,
                (None, Value::Map(nested)) => {
                    let mut inner = match target.remove(segment) {
                        Some(serde_json::Value::Object(existing)) => existing,
                        _ => serde_json::Map::new(),
                    };
                    self.walk_attributes(walk, options, &path, nested, &mut inner);
                    serde_json::Value::Object(inner)
                }
                (None, Value::Model(model)) => match walk {
                    Walk::Serialize => model.serialize_with(options),
                    Walk::Extract => model.extract_plain(options),
                },
                (None, other) => other.to_json(),
            };
            target.insert(segment.clone(), result);
        }
    }
}

fn watch_submodel(cell: &Varying<bool>, submodel: &Model, owner: WeakModel, depth: Depth) {
    let weak = cell.downgrade();
    let upstream = submodel.watch_modified(depth.clone());
    cell.listen_to(&upstream, VaryingEvent::Changed, move |changed: &bool| {
        let (Some(cell), Some(owner)) = (weak.upgrade(), owner.upgrade()) else {
            return;
        };
        // A predicate may rule this sub-model out, so only plain deep
        // tracking can take the shortcut.
        if *changed && matches!(depth, Depth::Deep) {
            cell.set_value(true);
        } else {
            cell.set_value(owner.modified_with(&depth));
        }
    });
}

fn json_deep_get<'a>(
    fields: &'a serde_json::Map<String, serde_json::Value>,
    key: &KeyPath,
) -> Option<&'a serde_json::Value> {
    let (last, parents) = key.segments().split_last()?;
    let mut current = fields;
    for segment in parents {
        current = current.get(segment)?.as_object()?;
    }
    current.get(last)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl serde::Serialize for Model {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&Model::serialize(self), serializer)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("schema", &self.inner.schema.name())
            .field("id", &self.id())
            .field("shadow", &self.inner.parent.is_some())
            .finish()
    }
}

/// A non-owning handle to a [`Model`].
#[derive(Clone)]
pub struct WeakModel {
    inner: Weak<ModelInner>,
}

impl WeakModel {
    pub fn upgrade(&self) -> Option<Model> {
        self.inner.upgrade().map(|inner| Model { inner })
    }
}

impl fmt::Debug for WeakModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakModel")
    }
}
