//! Data model builder
//!
//! Turns a [`Type`] plus the field metadata supplied by a
//! [`MetadataLoader`] into a [`DataModelNode`] graph. Recursion into object
//! types is cut with [`DataModelNode::Ghost`] as soon as a type repeats on
//! the current path, so building terminates for any type declaration.

use crate::model::{
    Accessor, CollectionKind, DataModelNode, DepthGuard, OverflowNode, PropertyNode, ScalarShape,
};
use stencil_core::{
    Config, Direction, MetadataLoader, ScalarKind, StencilError, StencilResult, Type,
};
use std::collections::BTreeSet;

/// Object types under construction on the current path, by string form.
///
/// Each object branch works on its own copy, so siblings never see each
/// other's entries and a copy only ever grows.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    visiting: BTreeSet<String>,
}

impl BuildContext {
    pub fn is_visiting(&self, ty: &Type) -> bool {
        self.visiting.contains(&ty.to_string())
    }

    fn entering(&self, ty: &Type) -> Self {
        let mut next = self.clone();
        next.visiting.insert(ty.to_string());
        next
    }
}

/// Builds data model graphs for one direction
pub struct ModelBuilder<'a> {
    loader: &'a dyn MetadataLoader,
    config: &'a Config,
    direction: Direction,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(loader: &'a dyn MetadataLoader, config: &'a Config, direction: Direction) -> Self {
        Self {
            loader,
            config,
            direction,
        }
    }

    /// Build the graph for `ty` with an empty context
    pub fn build(&self, ty: &Type) -> StencilResult<DataModelNode> {
        self.build_in(ty, &BuildContext::default())
    }

    pub fn build_in(&self, ty: &Type, context: &BuildContext) -> StencilResult<DataModelNode> {
        match ty {
            Type::Null => Ok(DataModelNode::Scalar(ScalarShape::Null)),
            Type::Bool => Ok(DataModelNode::Scalar(ScalarShape::Kind(ScalarKind::Bool))),
            Type::Int => Ok(DataModelNode::Scalar(ScalarShape::Kind(ScalarKind::Int))),
            Type::Float => Ok(DataModelNode::Scalar(ScalarShape::Kind(ScalarKind::Float))),
            Type::String => Ok(DataModelNode::Scalar(ScalarShape::Kind(ScalarKind::String))),
            Type::Mixed => Ok(DataModelNode::Mixed),
            Type::Enum { class, backing } => {
                if *backing == ScalarKind::Bool || *backing == ScalarKind::Float {
                    return Err(StencilError::UnsupportedType(ty.to_string()));
                }
                Ok(DataModelNode::Enum {
                    class: class.clone(),
                    backing: *backing,
                    cases: self.loader.enum_cases(class),
                })
            }
            Type::List(item) => Ok(DataModelNode::Collection {
                ty: ty.clone(),
                kind: CollectionKind::List,
                item: Box::new(self.build_in(item, context)?),
            }),
            Type::Dict { key, value } => {
                if !matches!(key, ScalarKind::Int | ScalarKind::String) {
                    return Err(StencilError::UnsupportedType(ty.to_string()));
                }
                Ok(DataModelNode::Collection {
                    ty: ty.clone(),
                    kind: CollectionKind::Dict { key: *key },
                    item: Box::new(self.build_in(value, context)?),
                })
            }
            Type::Nullable(inner) => Ok(DataModelNode::Nullable(Box::new(
                self.build_in(inner, context)?,
            ))),
            Type::Union(members) => self.build_union(ty, members, context),
            Type::Object { class, args } => self.build_object(ty, class, args, context),
        }
    }

    fn build_object(
        &self,
        ty: &Type,
        class: &str,
        args: &[Type],
        context: &BuildContext,
    ) -> StencilResult<DataModelNode> {
        if context.is_visiting(ty) {
            tracing::debug!(ty = %ty, "cycle cut with ghost node");
            return Ok(DataModelNode::Ghost(ty.clone()));
        }
        let inner = context.entering(ty);

        let fields = self.loader.fields(class, args, self.config)?;
        let mut properties = Vec::with_capacity(fields.len());
        for (wire_name, field) in fields {
            let formatters = match self.direction {
                Direction::Encode => field.formatters.clone(),
                Direction::Decode => field.decode_formatters.clone(),
            };
            let value = self.build_in(field.wire_type(), &inner)?;

            let guard = match &field.max_depth {
                None => None,
                Some(bound) => {
                    let overflow = match &bound.overflow {
                        None => None,
                        Some(overflow) => Some(OverflowNode {
                            formatter: overflow.formatter.clone(),
                            value: Box::new(self.build_in(&overflow.ty, &inner)?),
                        }),
                    };
                    Some(DepthGuard {
                        class: first_class(&field.ty).unwrap_or(class).to_string(),
                        depth: bound.depth,
                        overflow,
                    })
                }
            };

            properties.push(PropertyNode {
                wire_name,
                accessor: Accessor {
                    property: field.name.clone(),
                    formatters,
                },
                value,
                guard,
            });
        }

        Ok(DataModelNode::Object {
            ty: ty.clone(),
            class: class.to_string(),
            properties,
        })
    }

    fn build_union(
        &self,
        ty: &Type,
        members: &[Type],
        context: &BuildContext,
    ) -> StencilResult<DataModelNode> {
        if self.direction == Direction::Decode
            && let Some(selected) = self.selector(ty)
        {
            let selected: Type = selected.parse()?;
            if !members.contains(&selected) {
                return Err(StencilError::Config(format!(
                    "union selector {selected} is not a member of {ty}"
                )));
            }
            tracing::debug!(union = %ty, member = %selected, "union member selected");
            return self.build_in(&selected, context);
        }

        let alternatives = members
            .iter()
            .map(|member| self.build_in(member, context))
            .collect::<StencilResult<Vec<_>>>()?;

        let alternatives = match self.direction {
            Direction::Encode => alternatives,
            Direction::Decode => self.order_for_decode(ty, alternatives)?,
        };

        Ok(DataModelNode::Union {
            ty: ty.clone(),
            alternatives,
        })
    }

    fn selector(&self, union: &Type) -> Option<&String> {
        let selectors = &self.config.union_selectors;
        selectors
            .get(&union.to_string())
            .or_else(|| selectors.get(&Type::nullable(union.clone()).to_string()))
    }

    /// Object alternatives first, most derived class first; the rest keep
    /// their declared order.
    fn order_for_decode(
        &self,
        ty: &Type,
        alternatives: Vec<DataModelNode>,
    ) -> StencilResult<Vec<DataModelNode>> {
        let (mut objects, rest): (Vec<_>, Vec<_>) = alternatives
            .into_iter()
            .map(|node| {
                let depth = match &node {
                    DataModelNode::Object { class, .. } => Some(self.depth_of(class)),
                    DataModelNode::Ghost(t) => t.class().map(|class| self.depth_of(class)),
                    _ => None,
                };
                (depth, node)
            })
            .partition(|(depth, _)| depth.is_some());

        if objects.len() > 1 {
            objects.sort_by(|(a, _), (b, _)| b.cmp(a));
            let deepest = objects[0].0;
            let tied: Vec<String> = objects
                .iter()
                .filter(|(depth, _)| *depth == deepest)
                .map(|(_, node)| node.ty().to_string())
                .collect();
            if tied.len() > 1 {
                return Err(StencilError::AmbiguousUnion {
                    union: ty.to_string(),
                    candidates: tied,
                });
            }
            tracing::debug!(
                union = %ty,
                order = ?objects.iter().map(|(_, n)| n.ty().to_string()).collect::<Vec<_>>(),
                "ordered union alternatives"
            );
        }

        Ok(objects
            .into_iter()
            .chain(rest)
            .map(|(_, node)| node)
            .collect())
    }

    /// Depth of `class` in its inheritance chain; roots are 0
    fn depth_of(&self, class: &str) -> usize {
        self.loader.ancestry(class).len().saturating_sub(1)
    }
}

/// First object class reachable through collections, nullables and unions
fn first_class(ty: &Type) -> Option<&str> {
    match ty {
        Type::Object { class, .. } => Some(class),
        Type::List(item) | Type::Nullable(item) => first_class(item),
        Type::Dict { value, .. } => first_class(value),
        Type::Union(members) => members.iter().find_map(first_class),
        _ => None,
    }
}
