//! Data model graph: how to convert one value shape

use stencil_core::{ScalarKind, Type, Value};

/// One node of the encode/decode plan
#[derive(Debug, Clone, PartialEq)]
pub enum DataModelNode {
    /// `null`, bool, int, float or string
    Scalar(ScalarShape),

    /// Any value, converted by its runtime shape
    Mixed,

    /// Backed enum; `cases` lists the allowed backing values when known
    Enum {
        class: String,
        backing: ScalarKind,
        cases: Option<Vec<Value>>,
    },

    /// List or dict of `item`
    Collection {
        ty: Type,
        kind: CollectionKind,
        item: Box<DataModelNode>,
    },

    /// Object with fields in declaration order
    Object {
        ty: Type,
        class: String,
        properties: Vec<PropertyNode>,
    },

    /// Alternatives in decode precedence order
    Union {
        ty: Type,
        alternatives: Vec<DataModelNode>,
    },

    Nullable(Box<DataModelNode>),

    /// Cut edge to an object type already being built on this path
    Ghost(Type),
}

/// Scalar leaf shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarShape {
    Null,
    Kind(ScalarKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    List,
    Dict { key: ScalarKind },
}

/// One object field in the plan
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyNode {
    pub wire_name: String,
    pub accessor: Accessor,
    pub value: DataModelNode,
    pub guard: Option<DepthGuard>,
}

/// Field read/write plus the formatter calls composed around it.
///
/// Formatters run in order, each receiving the previous result; they are
/// turned into call expressions during lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub property: String,
    pub formatters: Vec<String>,
}

impl Accessor {
    pub fn direct(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            formatters: Vec::new(),
        }
    }

    pub fn is_direct(&self) -> bool {
        self.formatters.is_empty()
    }
}

/// Nesting bound checked when the field is converted
#[derive(Debug, Clone, PartialEq)]
pub struct DepthGuard {
    /// Class whose nesting is counted
    pub class: String,
    pub depth: usize,
    /// Replacement branch; without one, exceeding the bound fails
    pub overflow: Option<OverflowNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverflowNode {
    pub formatter: String,
    pub value: Box<DataModelNode>,
}

impl DataModelNode {
    /// The type this node converts
    pub fn ty(&self) -> Type {
        match self {
            DataModelNode::Scalar(ScalarShape::Null) => Type::Null,
            DataModelNode::Scalar(ScalarShape::Kind(kind)) => kind.to_type(),
            DataModelNode::Mixed => Type::Mixed,
            DataModelNode::Enum { class, backing, .. } => {
                Type::enumeration(class.clone(), *backing)
            }
            DataModelNode::Collection { ty, .. }
            | DataModelNode::Object { ty, .. }
            | DataModelNode::Union { ty, .. }
            | DataModelNode::Ghost(ty) => ty.clone(),
            DataModelNode::Nullable(inner) => Type::nullable(inner.ty()),
        }
    }

    /// Visit this node and every node below it, pre-order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a DataModelNode)) {
        visit(self);
        match self {
            DataModelNode::Collection { item, .. } => item.walk(visit),
            DataModelNode::Object { properties, .. } => {
                for property in properties {
                    property.value.walk(visit);
                    let overflow = property.guard.as_ref().and_then(|g| g.overflow.as_ref());
                    if let Some(overflow) = overflow {
                        overflow.value.walk(visit);
                    }
                }
            }
            DataModelNode::Union { alternatives, .. } => {
                for alternative in alternatives {
                    alternative.walk(visit);
                }
            }
            DataModelNode::Nullable(inner) => inner.walk(visit),
            DataModelNode::Scalar(_)
            | DataModelNode::Mixed
            | DataModelNode::Enum { .. }
            | DataModelNode::Ghost(_) => {}
        }
    }

    /// Number of ghost nodes in the graph
    pub fn ghost_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |node| {
            if matches!(node, DataModelNode::Ghost(_)) {
                count += 1;
            }
        });
        count
    }
}
