//! Configuration threaded through model building and template execution

use crate::mode::Strategy;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

bitflags! {
    /// Numeric edge-case handling for the JSON format
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct JsonFlags: u8 {
        /// Write floats with an integral value as `1.0` instead of `1`
        const PRESERVE_ZERO_FRACTION = 0b0000_0001;
        /// Decode integers outside the `i64` range as strings instead of floats
        const BIGINT_AS_STRING = 0b0000_0010;
    }
}

impl Default for JsonFlags {
    fn default() -> Self {
        JsonFlags::empty()
    }
}

/// Configuration passed to every encode/decode call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Open string-keyed data, passed to formatters untouched
    #[serde(default)]
    pub data: serde_json::Value,

    /// Only fields tagged with one of these groups are converted
    #[serde(default)]
    pub groups: Option<BTreeSet<String>>,

    /// Bound on object nesting for any single class at run time
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// JSON numeric edge-case flags
    #[serde(default)]
    pub json_flags: JsonFlags,

    /// Explicit member choice per union site (union type string -> member type string)
    #[serde(default)]
    pub union_selectors: BTreeMap<String, String>,

    /// Eager or lazy decoding
    #[serde(default)]
    pub strategy: Strategy,

    /// Regenerate templates even when a cached file exists
    #[serde(default)]
    pub force_regenerate: bool,

    /// Record element-level failures instead of aborting the call
    #[serde(default)]
    pub collect_errors: bool,

    /// Directory holding generated templates
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

fn default_max_depth() -> usize {
    512
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: serde_json::Value::Null,
            groups: None,
            max_depth: default_max_depth(),
            json_flags: JsonFlags::default(),
            union_selectors: BTreeMap::new(),
            strategy: Strategy::default(),
            force_regenerate: false,
            collect_errors: false,
            cache_dir: None,
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from JSON bytes
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes)
    }

    /// Get a typed value from the open data map
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in the open data map
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), serde_json::Error> {
        if !self.data.is_object() {
            self.data = serde_json::json!({});
        }
        if let Some(obj) = self.data.as_object_mut() {
            obj.insert(key.to_string(), serde_json::to_value(value)?);
        }
        Ok(())
    }

    /// Restrict conversion to fields in the given groups
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    /// Pick `member` whenever the union `union` must be decoded
    pub fn with_union_selector(
        mut self,
        union: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        self.union_selectors.insert(union.into(), member.into());
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_collect_errors(mut self, collect: bool) -> Self {
        self.collect_errors = collect;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_json_flags(mut self, flags: JsonFlags) -> Self {
        self.json_flags = flags;
        self
    }

    /// Whether a field tagged with `groups` passes the group filter
    pub fn accepts_groups(&self, groups: &[String]) -> bool {
        match &self.groups {
            None => true,
            Some(filter) => {
                filter.contains("*") || groups.iter().any(|g| filter.contains(g))
            }
        }
    }

    /// Stable tag for the options that change generated code.
    ///
    /// Two configs with the same tag produce interchangeable templates.
    /// Group names and selectors are written as JSON, so names holding
    /// separators cannot collide.
    pub fn variation_tag(&self) -> String {
        let mut parts = Vec::new();
        if let Some(groups) = &self.groups {
            let names = groups.iter().cloned().map(serde_json::Value::String).collect();
            parts.push(format!("groups={}", serde_json::Value::Array(names)));
        }
        if !self.union_selectors.is_empty() {
            let pairs: serde_json::Map<String, serde_json::Value> = self
                .union_selectors
                .iter()
                .map(|(union, member)| (union.clone(), serde_json::Value::String(member.clone())))
                .collect();
            parts.push(format!("select={}", serde_json::Value::Object(pairs)));
        }
        if self.collect_errors {
            parts.push("collect".to_string());
        }
        if parts.is_empty() {
            "default".to_string()
        } else {
            parts.join(";")
        }
    }
}
