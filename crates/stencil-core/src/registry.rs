//! Declarative class schemas implementing [`MetadataLoader`]
//!
//! A schema lists classes and enums. It can be built in code or read from
//! TOML or JSON:
//!
//! ```toml
//! [classes.Entity]
//! fields = [{ name = "id", type = "int" }]
//!
//! [classes.User]
//! parent = "Entity"
//! fields = [
//!     { name = "name", type = "string", wire_name = "userName", groups = ["public"] },
//!     { name = "friends", type = "list<User>", max_depth = 2, overflow = "length", overflow_type = "int" },
//! ]
//!
//! [enums.Suit]
//! backing = "string"
//! cases = ["H", "S", "D", "C"]
//! ```

use crate::config::Config;
use crate::error::{StencilError, StencilResult};
use crate::metadata::{FieldMetadata, MaxDepth, MetadataLoader, Overflow};
use crate::types::{ScalarKind, Type};
use crate::value::Value;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// One declared field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: Type,

    #[serde(default)]
    pub wire_name: Option<String>,

    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(default)]
    pub formatters: Vec<String>,

    #[serde(default)]
    pub decode_formatters: Vec<String>,

    #[serde(default)]
    pub formatted_type: Option<Type>,

    #[serde(default)]
    pub max_depth: Option<usize>,

    #[serde(default)]
    pub overflow: Option<String>,

    #[serde(default)]
    pub overflow_type: Option<Type>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            wire_name: None,
            groups: Vec::new(),
            formatters: Vec::new(),
            decode_formatters: Vec::new(),
            formatted_type: None,
            max_depth: None,
            overflow: None,
            overflow_type: None,
        }
    }

    pub fn wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = Some(wire_name.into());
        self
    }

    pub fn groups<I: IntoIterator<Item = S>, S: Into<String>>(mut self, groups: I) -> Self {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn formatters<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        formatters: I,
        formatted_type: Type,
    ) -> Self {
        self.formatters = formatters.into_iter().map(Into::into).collect();
        self.formatted_type = Some(formatted_type);
        self
    }

    pub fn decode_formatters<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        formatters: I,
    ) -> Self {
        self.decode_formatters = formatters.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_depth(mut self, depth: usize, overflow: Option<(&str, Type)>) -> Self {
        self.max_depth = Some(depth);
        if let Some((formatter, ty)) = overflow {
            self.overflow = Some(formatter.to_string());
            self.overflow_type = Some(ty);
        }
        self
    }

    fn to_metadata(&self, params: &[String], args: &[Type]) -> StencilResult<FieldMetadata> {
        let max_depth = match self.max_depth {
            None => None,
            Some(depth) => {
                let overflow = match (&self.overflow, &self.overflow_type) {
                    (Some(formatter), Some(ty)) => Some(Overflow {
                        formatter: formatter.clone(),
                        ty: ty.substitute(params, args),
                    }),
                    (Some(formatter), None) => {
                        return Err(StencilError::Config(format!(
                            "field {} has overflow formatter {formatter} but no overflow_type",
                            self.name
                        )));
                    }
                    (None, _) => None,
                };
                Some(MaxDepth { depth, overflow })
            }
        };

        Ok(FieldMetadata {
            name: self.name.clone(),
            wire_name: self.wire_name.clone().unwrap_or_else(|| self.name.clone()),
            ty: self.ty.substitute(params, args),
            formatters: self.formatters.clone(),
            decode_formatters: self.decode_formatters.clone(),
            formatted_type: self
                .formatted_type
                .as_ref()
                .map(|t| t.substitute(params, args)),
            groups: self.groups.clone(),
            max_depth,
        })
    }
}

/// One declared class
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassDef {
    #[serde(default)]
    pub parent: Option<String>,

    /// Generic parameter names, substituted by type arguments
    #[serde(default)]
    pub params: Vec<String>,

    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl ClassDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn params<I: IntoIterator<Item = S>, S: Into<String>>(mut self, params: I) -> Self {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

/// One declared enum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDef {
    pub backing: ScalarKind,

    #[serde(default)]
    pub cases: Vec<serde_json::Value>,
}

/// Complete declarative schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub classes: BTreeMap<String, ClassDef>,

    #[serde(default)]
    pub enums: BTreeMap<String, EnumDef>,
}

/// In-memory [`MetadataLoader`] backed by a [`Schema`].
///
/// Resolved field lists are memoized per (class, args, groups) in a cache
/// owned by the registry.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    schema: Schema,
    resolved: Mutex<HashMap<String, IndexMap<String, FieldMetadata>>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_schema(schema: Schema) -> Self {
        Self {
            schema,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Parse a TOML schema
    pub fn from_toml_str(source: &str) -> StencilResult<Self> {
        Ok(Self::from_schema(toml::from_str(source)?))
    }

    /// Parse a JSON schema
    pub fn from_json_str(source: &str) -> StencilResult<Self> {
        Ok(Self::from_schema(serde_json::from_str(source)?))
    }

    /// Read a schema file; `.json` files are JSON, anything else TOML
    pub fn from_path(path: &Path) -> StencilResult<Self> {
        let source = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&source)
        } else {
            Self::from_toml_str(&source)
        }
    }

    /// Add or replace a class
    pub fn with_class(mut self, name: impl Into<String>, class: ClassDef) -> Self {
        self.schema.classes.insert(name.into(), class);
        self.resolved.get_mut().clear();
        self
    }

    /// Add or replace an enum
    pub fn with_enum<I, V>(mut self, name: impl Into<String>, backing: ScalarKind, cases: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        self.schema.enums.insert(
            name.into(),
            EnumDef {
                backing,
                cases: cases.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Fields of `class` and its ancestors, root first, children overriding
    fn collect_fields(
        &self,
        class: &str,
        args: &[Type],
    ) -> StencilResult<IndexMap<String, FieldMetadata>> {
        let mut chain = Vec::new();
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            if chain.iter().any(|(n, _): &(String, &ClassDef)| *n == name) {
                return Err(StencilError::Config(format!(
                    "inheritance cycle through {name}"
                )));
            }
            let def = self
                .schema
                .classes
                .get(&name)
                .ok_or_else(|| StencilError::UnknownClass(name.clone()))?;
            current = def.parent.clone();
            chain.push((name, def));
        }

        let mut fields = IndexMap::new();
        for (index, (name, def)) in chain.iter().rev().enumerate() {
            let is_target = index + 1 == chain.len();
            // Only the requested class receives the type arguments.
            let class_args: &[Type] = if is_target { args } else { &[] };
            if is_target && !def.params.is_empty() && def.params.len() != args.len() {
                return Err(StencilError::Config(format!(
                    "class {name} expects {} type arguments, got {}",
                    def.params.len(),
                    args.len()
                )));
            }
            for field in &def.fields {
                let meta = field.to_metadata(&def.params, class_args)?;
                fields.insert(meta.wire_name.clone(), meta);
            }
        }
        Ok(fields)
    }
}

impl MetadataLoader for ClassRegistry {
    fn fields(
        &self,
        class: &str,
        args: &[Type],
        config: &Config,
    ) -> StencilResult<IndexMap<String, FieldMetadata>> {
        let memo_key = format!(
            "{}|{}",
            Type::generic(class, args.to_vec()),
            config.variation_tag()
        );
        if let Some(fields) = self.resolved.lock().get(&memo_key) {
            return Ok(fields.clone());
        }

        let mut fields = self.collect_fields(class, args)?;
        fields.retain(|_, field| config.accepts_groups(&field.groups));
        tracing::debug!(class, count = fields.len(), "resolved class fields");

        self.resolved.lock().insert(memo_key, fields.clone());
        Ok(fields)
    }

    fn parent(&self, class: &str) -> Option<String> {
        self.schema.classes.get(class)?.parent.clone()
    }

    fn enum_cases(&self, class: &str) -> Option<Vec<Value>> {
        let def = self.schema.enums.get(class)?;
        Some(def.cases.iter().cloned().map(Value::from_json).collect())
    }
}
