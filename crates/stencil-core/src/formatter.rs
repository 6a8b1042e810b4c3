//! Named formatter table
//!
//! Generated templates refer to formatters by name; the table resolves those
//! names to concrete functions when the template runs.

use crate::config::Config;
use crate::error::{StencilError, StencilResult};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Formatter signature: the previous value in the chain, then the ambient config
pub type FormatterFn = dyn Fn(Value, &Config) -> StencilResult<Value> + Send + Sync;

/// Table of formatters keyed by name
#[derive(Clone, Default)]
pub struct Formatters {
    table: HashMap<String, Arc<FormatterFn>>,
}

impl Formatters {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding the built-in formatters:
    /// `identity`, `null`, `trim`, `upper`, `lower`, `to_string`, `length`
    pub fn with_builtins() -> Self {
        let mut formatters = Self::new();
        formatters.register("identity", |value, _| Ok(value));
        formatters.register("null", |_, _| Ok(Value::Null));
        formatters.register("trim", |value, _| map_string("trim", value, |s| s.trim().to_string()));
        formatters.register("upper", |value, _| map_string("upper", value, |s| s.to_uppercase()));
        formatters.register("lower", |value, _| map_string("lower", value, |s| s.to_lowercase()));
        formatters.register("to_string", |value, _| match value {
            Value::String(s) => Ok(Value::String(s)),
            Value::Int(i) => Ok(Value::String(i.to_string())),
            Value::Float(f) => Ok(Value::String(f.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(formatter_error("to_string", &other)),
        });
        formatters.register("length", |value, _| {
            let len = match &value {
                Value::List(items) => items.len(),
                Value::Dict(map) => map.len(),
                Value::String(s) => s.chars().count(),
                Value::Object(o) => o.fields.len(),
                Value::Null => 0,
                other => return Err(formatter_error("length", other)),
            };
            Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
        });
        formatters
    }

    /// Register a formatter, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, formatter: F) -> &mut Self
    where
        F: Fn(Value, &Config) -> StencilResult<Value> + Send + Sync + 'static,
    {
        self.table.insert(name.into(), Arc::new(formatter));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Run the formatter `name`
    pub fn apply(&self, name: &str, value: Value, config: &Config) -> StencilResult<Value> {
        let formatter = self.table.get(name).ok_or_else(|| StencilError::Formatter {
            name: name.to_string(),
            message: "not registered".to_string(),
        })?;
        formatter(value, config)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Formatters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatters")
            .field("names", &self.names())
            .finish()
    }
}

fn map_string(name: &str, value: Value, f: impl Fn(&str) -> String) -> StencilResult<Value> {
    match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        Value::Null => Ok(Value::Null),
        other => Err(formatter_error(name, &other)),
    }
}

fn formatter_error(name: &str, value: &Value) -> StencilError {
    StencilError::Formatter {
        name: name.to_string(),
        message: format!("cannot format a {} value", value.kind()),
    }
}

#[cfg(test)]
#[path = "formatter/formatter_tests.rs"]
mod formatter_tests;
