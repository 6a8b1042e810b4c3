//! In-memory values read by encoders and produced by decoders

use crate::types::Type;
use indexmap::IndexMap;
use std::fmt;

/// A dict key; keys are always scalar
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    String(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::String(value.to_string())
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

/// An instance of a class: field values keyed by source name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    pub class: String,
    pub fields: IndexMap<String, Value>,
}

impl Object {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }
}

/// A dynamically shaped value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Dict(IndexMap<Key, Value>),
    Object(Object),
    Enum { class: String, value: Box<Value> },
}

impl Value {
    /// Short name of the value's kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Object(_) => "object",
            Value::Enum { .. } => "enum",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Whether the value's own shape is an instance of `ty`.
    ///
    /// Only the outermost layer is checked: a list matches any `list<T>`,
    /// an object matches when its class is exactly the type's class.
    pub fn is_instance_of(&self, ty: &Type) -> bool {
        match (self, ty) {
            (_, Type::Mixed) => true,
            (Value::Null, Type::Null | Type::Nullable(_)) => true,
            (_, Type::Nullable(inner)) => self.is_instance_of(inner),
            (_, Type::Union(members)) => members.iter().any(|m| self.is_instance_of(m)),
            (Value::Bool(_), Type::Bool) => true,
            (Value::Int(_), Type::Int) => true,
            (Value::Float(_), Type::Float) => true,
            (Value::String(_), Type::String) => true,
            (Value::List(_), Type::List(_)) => true,
            (Value::Dict(_), Type::Dict { .. }) => true,
            (Value::Object(o), Type::Object { class, .. }) => &o.class == class,
            (Value::Enum { class: c, .. }, Type::Enum { class, .. }) => c == class,
            _ => false,
        }
    }

    /// Build a list from anything convertible to values
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Convert a generic JSON tree. Objects become string-keyed dicts.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Dict(
                map.into_iter()
                    .map(|(k, v)| (Key::String(k), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to a generic JSON tree for display purposes.
    ///
    /// Objects become JSON objects keyed by source field name and enums
    /// collapse to their backing value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Dict(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect(),
            ),
            Value::Object(o) => serde_json::Value::Object(
                o.fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Enum { value, .. } => value.to_json(),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
#[path = "value/value_tests.rs"]
mod value_tests;
