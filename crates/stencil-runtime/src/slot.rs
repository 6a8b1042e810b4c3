//! Runtime values held in template variables

use indexmap::IndexMap;
use stencil_core::{Key, ScalarKind, StencilError, StencilResult, Value};
use stencil_json::{Boundary, SplitCursor};

/// Content of one template variable.
///
/// Eager templates only ever see [`Slot::Value`]; lazy templates also pass
/// around raw boundaries and the iteration state built from them.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(Value),
    /// Unparsed byte range of the input resource
    Boundary(Boundary),
    /// Wire name -> boundary of one object's fields
    Fields(IndexMap<String, Boundary>),
    /// List iteration state; `None` for a `null` list
    List(Option<SplitCursor>),
    /// Dict iteration state and the kind keys decode to
    Dict(Option<SplitCursor>, ScalarKind),
}

impl Slot {
    pub fn kind(&self) -> &'static str {
        match self {
            Slot::Value(value) => value.kind(),
            Slot::Boundary(_) => "boundary",
            Slot::Fields(_) => "fields",
            Slot::List(_) | Slot::Dict(..) => "cursor",
        }
    }

    /// The held value; anything else is a template error
    pub fn into_value(self) -> StencilResult<Value> {
        match self {
            Slot::Value(value) => Ok(value),
            other => Err(StencilError::Template(format!(
                "expected a value, found a {}",
                other.kind()
            ))),
        }
    }

    pub fn as_value(&self) -> StencilResult<&Value> {
        match self {
            Slot::Value(value) => Ok(value),
            other => Err(StencilError::Template(format!(
                "expected a value, found a {}",
                other.kind()
            ))),
        }
    }

    pub fn as_str(&self) -> StencilResult<&str> {
        match self.as_value()? {
            Value::String(s) => Ok(s),
            other => Err(StencilError::Template(format!(
                "expected a string argument, found {}",
                other.kind()
            ))),
        }
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Value(value)
    }
}

/// Dict key as a value, for loop variables
pub fn key_value(key: Key) -> Value {
    match key {
        Key::Int(i) => Value::Int(i),
        Key::String(s) => Value::String(s),
    }
}

/// Value used as a dict key
pub fn value_key(value: &Value) -> StencilResult<Key> {
    match value {
        Value::Int(i) => Ok(Key::Int(*i)),
        Value::String(s) => Ok(Key::String(s.clone())),
        Value::Enum { value, .. } => value_key(value),
        other => Err(StencilError::unexpected("int or string key", other.kind())),
    }
}
