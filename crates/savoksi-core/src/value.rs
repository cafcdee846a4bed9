//! Dynamic value types
//!
//! A [`Value`] is what flows through path lookups, settings and message
//! templates: scalars (null, bool, integer, float, string, raw bytes),
//! containers (sequences and mappings), property bags ([`Object`]) and
//! zero-argument callables ([`Thunk`]).

use indexmap::IndexMap;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::path::{self, Path};
use crate::stringify::stringify;

/// A property bag readable by key
///
/// Objects are leaves as far as path assignment is concerned, but path
/// lookups descend into them through [`Object::property`].
pub trait Object: Send + Sync {
    /// Read a property by key
    fn property(&self, key: &str) -> Option<Value>;

    /// Custom text conversion, used by stringification when present
    fn text(&self) -> Option<String> {
        None
    }

    /// Serializable form of the object (empty mapping by default)
    fn to_value(&self) -> Value {
        Value::Mapping(IndexMap::new())
    }
}

/// A zero-argument callable producing a value on demand
#[derive(Clone)]
pub struct Thunk(Arc<dyn Fn() -> Value + Send + Sync>);

impl Thunk {
    /// Wrap a closure
    pub fn new(func: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(func))
    }

    /// Invoke the callable
    pub fn call(&self) -> Value {
        (self.0)()
    }
}

/// A dynamic value
#[derive(Clone, Default)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Raw bytes, not necessarily valid UTF-8
    Bytes(Vec<u8>),
    /// Sequence of values
    Sequence(Vec<Value>),
    /// Mapping of string keys to values
    Mapping(IndexMap<String, Value>),
    /// Property bag
    Object(Arc<dyn Object>),
    /// Zero-argument callable
    Thunk(Thunk),
}

impl Value {
    /// Create a thunk value from a closure
    pub fn thunk(func: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Value::Thunk(Thunk::new(func))
    }

    /// Create an object value
    pub fn object(object: impl Object + 'static) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Check if this value is a sequence or a mapping
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Sequence(_) | Value::Mapping(_))
    }

    /// Check if this value is a container or an object
    pub fn is_aggregate(&self) -> bool {
        self.is_container() || matches!(self, Value::Object(_))
    }

    /// Check if this value is an empty container
    pub fn is_empty_container(&self) -> bool {
        match self {
            Value::Sequence(s) => s.is_empty(),
            Value::Mapping(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Check if this value is a falsy scalar (null, false, zero)
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Integer(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            _ => false,
        }
    }

    /// Get as boolean if this is a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float or Integer
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as str if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as slice if this is a Sequence
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Get as mapping if this is a Mapping
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a direct child of a container by key
    ///
    /// Sequence elements are addressed by canonical decimal indices only
    /// ("1", not "01" or "+1").
    pub fn child(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get(key),
            Value::Sequence(seq) => sequence_index(key).and_then(|i| seq.get(i)),
            _ => None,
        }
    }

    /// Read a property of an object value
    pub fn property(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.property(key),
            _ => None,
        }
    }

    /// Get a value by path (e.g., "tietokanta.osoite" or "palvelimet[0].nimi")
    ///
    /// Returns `Ok(None)` when the path does not exist.
    pub fn get_path<'a>(&'a self, path: impl Into<Path>) -> Result<Option<Cow<'a, Value>>> {
        path::get(path, self)
    }

    /// Set a value at a path, creating intermediate mappings and merging
    /// containers
    pub fn set_path(&mut self, path: impl Into<Path>, value: Value) -> Result<()> {
        path::set(self, path, value)
    }

    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Object(_) => "object",
            Value::Thunk(_) => "thunk",
        }
    }
}

/// Parse a sequence index in canonical decimal form
pub(crate) fn sequence_index(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    (index.to_string() == key).then_some(index)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stringify(self))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Value::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Value::Sequence(seq) => f.debug_tuple("Sequence").field(seq).finish(),
            Value::Mapping(map) => f.debug_tuple("Mapping").field(map).finish(),
            Value::Object(_) => write!(f, "Object(..)"),
            Value::Thunk(_) => write!(f, "Thunk(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            // Objects and thunks have identity, not structure
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Thunk(a), Value::Thunk(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Float(_) => Err(S::Error::custom("non-finite float")),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => serializer.serialize_str(s),
                Err(_) => Err(S::Error::custom("malformed UTF-8 in byte string")),
            },
            Value::Sequence(seq) => {
                let mut out = serializer.serialize_seq(Some(seq.len()))?;
                for item in seq {
                    out.serialize_element(item)?;
                }
                out.end()
            }
            Value::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Object(object) => object.to_value().serialize(serializer),
            Value::Thunk(_) => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        i64::try_from(i).map_or(Value::Float(i as f64), Value::Integer)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Mapping(m)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Mapping(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Henkilo;

    impl Object for Henkilo {
        fn property(&self, key: &str) -> Option<Value> {
            (key == "nimi").then(|| Value::from("Aino"))
        }
    }

    #[test]
    fn test_value_type_checks() {
        assert!(Value::Null.is_null());
        assert!(Value::String("hello".into()).is_string());
        assert!(Value::Sequence(vec![]).is_container());
        assert!(Value::Mapping(IndexMap::new()).is_container());
        assert!(!Value::Integer(1).is_container());
        assert!(Value::object(Henkilo).is_aggregate());
        assert!(!Value::object(Henkilo).is_container());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(42).as_i64(), Some(42));
        assert_eq!(Value::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Integer(42).as_f64(), Some(42.0));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(7usize), Value::Integer(7));
    }

    #[test]
    fn test_falsy_scalars() {
        assert!(Value::Null.is_falsy());
        assert!(Value::Bool(false).is_falsy());
        assert!(Value::Integer(0).is_falsy());
        assert!(Value::Float(0.0).is_falsy());
        assert!(!Value::from("").is_falsy());
        assert!(!Value::Integer(3).is_falsy());
    }

    #[test]
    fn test_child_by_key_and_index() {
        let value: Value = [("a", Value::from(vec!["x", "y"]))].into_iter().collect();

        let seq = value.child("a").unwrap();
        assert_eq!(seq.child("1"), Some(&Value::from("y")));
        assert_eq!(seq.child("01"), None);
        assert_eq!(seq.child("2"), None);
        assert_eq!(value.child("b"), None);
    }

    #[test]
    fn test_get_and_set_path() {
        let mut value = Value::Null;
        value
            .set_path("tietokanta.osoite", Value::from("localhost"))
            .unwrap();
        value
            .set_path("tietokanta", [("portti", 5432)].into_iter().collect())
            .unwrap();

        assert_eq!(
            value.get_path("tietokanta.osoite").unwrap().as_deref(),
            Some(&Value::from("localhost"))
        );
        assert_eq!(value.get_path("tietokanta.salasana").unwrap(), None);

        let db = value.child("tietokanta").and_then(Value::as_mapping).unwrap();
        assert_eq!(db.keys().map(String::as_str).collect::<Vec<_>>(), vec!["osoite", "portti"]);
        assert!(Value::from(1).as_mapping().is_none());

        let err = value
            .set_path("tietokanta.osoite.katu", Value::from("x"))
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::TypeConflict);
    }

    #[test]
    fn test_object_property() {
        let value = Value::object(Henkilo);

        assert_eq!(value.property("nimi"), Some(Value::from("Aino")));
        assert_eq!(value.property("ika"), None);
        assert_eq!(Value::from("nimi").property("nimi"), None);
    }

    #[test]
    fn test_object_and_thunk_identity() {
        let object = Value::object(Henkilo);
        assert_eq!(object.clone(), object);
        assert_ne!(Value::object(Henkilo), object);

        let thunk = Value::thunk(|| Value::Null);
        assert_eq!(thunk.clone(), thunk);
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let value: Value = serde_yaml::from_str("a:\n  b: [1, 2.5, true, ~]\n").unwrap();

        let expected: Value = [(
            "a",
            [(
                "b",
                Value::Sequence(vec![
                    Value::Integer(1),
                    Value::Float(2.5),
                    Value::Bool(true),
                    Value::Null,
                ]),
            )]
            .into_iter()
            .collect::<Value>(),
        )]
        .into_iter()
        .collect();
        assert_eq!(value, expected);
    }

    #[test]
    fn test_serialize_rejects_malformed_bytes() {
        assert!(serde_json::to_string(&Value::Bytes(vec![0xff, 0xfe])).is_err());
        assert_eq!(
            serde_json::to_string(&Value::Bytes(b"ok".to_vec())).unwrap(),
            "\"ok\""
        );
    }

    #[test]
    fn test_serialize_rejects_non_finite_float() {
        assert!(serde_json::to_string(&Value::Float(f64::NAN)).is_err());
        assert!(serde_json::to_string(&Value::Float(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_serialize_thunk_as_empty_object() {
        let value = Value::from(vec![Value::thunk(|| Value::from("x"))]);
        assert_eq!(serde_json::to_string(&value).unwrap(), "[{}]");
    }
}
