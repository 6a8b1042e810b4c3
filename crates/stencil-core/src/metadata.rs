//! Field metadata and the loader contract

use crate::config::Config;
use crate::error::StencilResult;
use crate::types::Type;
use crate::value::Value;
use indexmap::IndexMap;

/// Replacement used when a field nests deeper than its bound
#[derive(Debug, Clone, PartialEq)]
pub struct Overflow {
    /// Formatter applied to the field value instead of converting it
    pub formatter: String,
    /// Type of the formatter's result
    pub ty: Type,
}

/// Nesting bound for one field
#[derive(Debug, Clone, PartialEq)]
pub struct MaxDepth {
    pub depth: usize,
    pub overflow: Option<Overflow>,
}

/// One object field as seen by the data model builder
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMetadata {
    /// Field name on the in-memory object
    pub name: String,

    /// Name on the wire (defaults to `name`)
    pub wire_name: String,

    /// Declared type of the field
    pub ty: Type,

    /// Formatters applied in order before encoding
    pub formatters: Vec<String>,

    /// Formatters applied in order after decoding
    pub decode_formatters: Vec<String>,

    /// Wire type once formatters ran; `ty` when absent
    pub formatted_type: Option<Type>,

    /// Group tags for group filtering
    pub groups: Vec<String>,

    pub max_depth: Option<MaxDepth>,
}

impl FieldMetadata {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        let name = name.into();
        Self {
            wire_name: name.clone(),
            name,
            ty,
            formatters: Vec::new(),
            decode_formatters: Vec::new(),
            formatted_type: None,
            groups: Vec::new(),
            max_depth: None,
        }
    }

    pub fn with_wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    /// Set the encode formatter chain and the type it produces
    pub fn with_formatters<I, S>(mut self, formatters: I, formatted_type: Type) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formatters = formatters.into_iter().map(Into::into).collect();
        self.formatted_type = Some(formatted_type);
        self
    }

    pub fn with_decode_formatters<I, S>(mut self, formatters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.decode_formatters = formatters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_depth(mut self, depth: usize, overflow: Option<Overflow>) -> Self {
        self.max_depth = Some(MaxDepth { depth, overflow });
        self
    }

    /// The type found on the wire for this field
    pub fn wire_type(&self) -> &Type {
        self.formatted_type.as_ref().unwrap_or(&self.ty)
    }
}

/// Source of class-level information the builder needs.
///
/// How names, formatters and groups were declared is up to the
/// implementation; the builder only sees the resolved result.
pub trait MetadataLoader: Send + Sync {
    /// Ordered wire name -> field metadata for `class`, with generic
    /// parameters substituted by `args` and group filters applied.
    fn fields(
        &self,
        class: &str,
        args: &[Type],
        config: &Config,
    ) -> StencilResult<IndexMap<String, FieldMetadata>>;

    /// Direct parent class, if any
    fn parent(&self, class: &str) -> Option<String>;

    /// Allowed backing values of an enum class, when known
    fn enum_cases(&self, class: &str) -> Option<Vec<Value>>;

    /// Inheritance chain of `class`, root first and `class` last
    fn ancestry(&self, class: &str) -> Vec<String> {
        let mut chain = vec![class.to_string()];
        while let Some(parent) = chain.last().and_then(|c| self.parent(c)) {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
        }
        chain.reverse();
        chain
    }
}
