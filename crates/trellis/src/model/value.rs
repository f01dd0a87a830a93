//! Dynamic attribute values.

use std::collections::BTreeMap;

use trellis_core::KeyPath;

use super::Model;
use super::reference::Reference;

/// A nested map of attribute values, keyed by segment.
pub type Map = BTreeMap<String, Value>;

/// A value stored in a [`Model`] attribute.
///
/// Plain data compares structurally. `Model` and `Reference` are handles and
/// compare by identity.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    /// No value. Stored locally, it overrides a parent's value with null.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    /// Nested plain data; its leaves are addressable by dotted key.
    Map(Map),
    Model(Model),
    Reference(Reference),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Value::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Model(_) => "model",
            Value::Reference(_) => "reference",
        }
    }

    /// A resolved reference's value, or the reference's flat value while it
    /// is pending. Other values are returned as is.
    pub(crate) fn settled(self) -> Value {
        match self {
            Value::Reference(reference) => reference.value().unwrap_or_else(|| reference.flat_value()),
            other => other,
        }
    }

    /// Convert JSON into plain data.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into JSON. Models serialize themselves and references
    /// contribute their flat value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Model(model) => model.serialize(),
            Value::Reference(reference) => reference.flat_value().to_json(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Model> for Value {
    fn from(model: Model) -> Self {
        Value::Model(model)
    }
}

impl From<Reference> for Value {
    fn from(reference: Reference) -> Self {
        Value::Reference(reference)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Build a [`Map`] from `key => value` pairs. Keys may be dotted.
///
/// ```
/// use trellis::attrs;
///
/// let map = attrs! { "name" => "Ada", "address.city" => "London" };
/// assert!(map["address"].as_map().is_some());
/// ```
#[macro_export]
macro_rules! attrs {
    () => { $crate::model::Map::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::model::Map::new();
        $(
            $crate::model::deep_set(
                &mut map,
                &$crate::IntoKeyPath::into_key_path($key),
                $crate::model::Value::from($value),
            );
        )+
        map
    }};
}

/// The value at `path`, if every segment along it exists.
pub(crate) fn deep_get<'a>(map: &'a Map, path: &KeyPath) -> Option<&'a Value> {
    let (last, parents) = path.segments().split_last()?;
    let mut current = map;
    for segment in parents {
        current = current.get(segment)?.as_map()?;
    }
    current.get(last)
}

/// Store `value` at `path`, creating (or replacing non-map values with)
/// intermediate maps. Returns the previous value.
pub fn deep_set(map: &mut Map, path: &KeyPath, value: Value) -> Option<Value> {
    let (last, parents) = path.segments().split_last()?;
    let mut current = map;
    for segment in parents {
        let slot = current.entry(segment.clone()).or_insert_with(|| Value::Map(Map::new()));
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(Map::new());
        }
        current = match slot {
            Value::Map(next) => next,
            _ => return None,
        };
    }
    current.insert(last.clone(), value)
}

/// Remove the value at `path`, returning it. Parent maps left empty by the
/// removal are removed too.
pub(crate) fn deep_remove(map: &mut Map, path: &KeyPath) -> Option<Value> {
    remove_segments(map, path.segments())
}

fn remove_segments(map: &mut Map, segments: &[String]) -> Option<Value> {
    let (first, rest) = segments.split_first()?;
    if rest.is_empty() {
        return map.remove(first);
    }
    let Value::Map(next) = map.get_mut(first)? else {
        return None;
    };
    let removed = remove_segments(next, rest)?;
    if next.is_empty() {
        map.remove(first);
    }
    Some(removed)
}

/// Visit every leaf under `map`, depth first in key order. Empty maps are
/// leaves.
pub(crate) fn for_each_leaf<F>(map: &Map, prefix: &KeyPath, f: &mut F)
where
    F: FnMut(KeyPath, &Value),
{
    for (key, value) in map {
        let path = prefix.child(key.clone());
        match value {
            Value::Map(inner) if !inner.is_empty() => for_each_leaf(inner, &path, f),
            other => f(path, other),
        }
    }
}

/// Every leaf path under `map`.
pub(crate) fn leaf_paths(map: &Map) -> Vec<KeyPath> {
    let mut paths = Vec::new();
    for_each_leaf(map, &KeyPath::root(), &mut |path, _| paths.push(path));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_set_and_get() {
        let mut map = Map::new();
        let path = KeyPath::from_segments(["a", "b", "c"]);
        assert_eq!(deep_set(&mut map, &path, Value::Int(1)), None);
        assert_eq!(deep_get(&map, &path), Some(&Value::Int(1)));
        assert_eq!(deep_get(&map, &KeyPath::from_segments(["a", "x"])), None);

        // A scalar in the way is replaced by a map.
        deep_set(&mut map, &KeyPath::from_segments(["a", "b", "c", "d"]), Value::Bool(true));
        assert!(deep_get(&map, &path).is_some_and(|v| v.as_map().is_some()));
    }

    #[test]
    fn test_deep_remove() {
        let mut map = attrs! { "a.b" => 1, "a.c" => 2 };
        assert_eq!(deep_remove(&mut map, &KeyPath::from_segments(["a", "b"])), Some(Value::Int(1)));
        assert_eq!(deep_remove(&mut map, &KeyPath::from_segments(["a", "b", "z"])), None);
        assert_eq!(leaf_paths(&map), vec![KeyPath::from_segments(["a", "c"])]);

        deep_remove(&mut map, &KeyPath::from_segments(["a", "c"]));
        assert!(map.is_empty());
    }

    #[test]
    fn test_empty_map_is_a_leaf() {
        let mut map = attrs! { "a.b" => 1 };
        map.insert("meta".into(), Value::Map(Map::new()));
        assert_eq!(
            leaf_paths(&map),
            vec![KeyPath::from_segments(["a", "b"]), KeyPath::from_segments(["meta"])]
        );
    }

    #[test]
    fn test_json_conversion() {
        let json = json!({ "n": 1, "f": 1.5, "s": "x", "l": [true, null], "m": { "k": 2 } });
        let value = Value::from_json(&json);
        let map = value.as_map().cloned().unwrap_or_default();
        assert_eq!(map["n"], Value::Int(1));
        assert_eq!(map["f"], Value::Float(1.5));
        assert_eq!(map["l"], Value::List(vec![Value::Bool(true), Value::Null]));
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(Value::Float(f64::INFINITY).to_json(), serde_json::Value::Null);
    }
}
