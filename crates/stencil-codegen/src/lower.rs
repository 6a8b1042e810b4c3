//! Lowering data model graphs to emission AST
//!
//! Encoding walks an in-memory value through its accessors and writes JSON
//! text. Decoding reads either a parsed tree (eager) or raw boundaries that
//! are split and parsed on demand (lazy), and assigns results into targets.
//!
//! Object types reached through a ghost edge get one routine each; every
//! occurrence of such a type calls the routine instead of inlining it.

use crate::ast::{Branch, Builtin, Callee, EmissionNode, Failure, Literal, Program, Routine};
use crate::model::{Accessor, CollectionKind, DataModelNode, PropertyNode, ScalarShape};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use stencil_core::{
    Config, Direction, Flavor, ScalarKind, StencilError, StencilResult, Strategy, Type, Value,
};

/// Name of the formatter configuration argument in generated code
pub const CONFIG_VAR: &str = "config";

/// Lowers one data model graph into a [`Program`]
pub struct Lowering<'a> {
    direction: Direction,
    strategy: Strategy,
    collect_errors: bool,
    /// Complete object nodes by type string
    objects: HashMap<String, &'a DataModelNode>,
    /// Type string -> routine name, for types reached through a ghost
    routines: BTreeMap<String, String>,
    depth: usize,
}

impl<'a> Lowering<'a> {
    pub fn new(
        root: &'a DataModelNode,
        direction: Direction,
        strategy: Strategy,
        config: &Config,
    ) -> Self {
        let mut objects = HashMap::new();
        let mut ghosts = BTreeSet::new();
        root.walk(&mut |node| match node {
            DataModelNode::Object { ty, .. } => {
                objects.entry(ty.to_string()).or_insert(node);
            }
            DataModelNode::Ghost(ty) => {
                ghosts.insert(ty.to_string());
            }
            _ => {}
        });

        let prefix = match direction {
            Direction::Encode => "encode",
            Direction::Decode => "decode",
        };
        let mut routines = BTreeMap::new();
        let mut taken = BTreeSet::new();
        for ty in ghosts {
            let base = format!("{prefix}_{}", identifier(&ty));
            let mut name = base.clone();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{base}_{n}");
                n += 1;
            }
            routines.insert(ty, name);
        }

        Self {
            direction,
            strategy: match direction {
                Direction::Encode => Strategy::Eager,
                Direction::Decode => strategy,
            },
            collect_errors: config.collect_errors,
            objects,
            routines,
            depth: 0,
        }
    }

    /// Lower the whole graph: entry routine plus ghost target routines
    pub fn lower(mut self, root: &DataModelNode, flavor: Flavor) -> StencilResult<Program> {
        let entry = match self.direction {
            Direction::Encode => Routine {
                name: "encode".to_string(),
                params: vec!["value".to_string()],
                body: self.encode(root, EmissionNode::var("value"))?,
            },
            Direction::Decode => {
                let mut body = Vec::new();
                let source = match self.strategy {
                    Strategy::Eager => {
                        let input = vec![EmissionNode::var("input")];
                        let parsed = EmissionNode::builtin(Builtin::ParseAt, input);
                        body.push(EmissionNode::assign(EmissionNode::var("data"), parsed));
                        EmissionNode::var("data")
                    }
                    Strategy::Lazy => EmissionNode::var("input"),
                };
                body.extend(self.decode(root, source, EmissionNode::var("result"))?);
                body.push(EmissionNode::Return(Some(Box::new(EmissionNode::var("result")))));
                Routine {
                    name: "decode".to_string(),
                    params: vec!["input".to_string()],
                    body,
                }
            }
        };

        let mut routines = Vec::with_capacity(self.routines.len());
        for (ty, name) in self.routines.clone() {
            let node = *self.objects.get(&ty).ok_or_else(|| {
                StencilError::Template(format!("no object definition for ghost type {ty}"))
            })?;
            self.depth = 0;
            let routine = match self.direction {
                Direction::Encode => Routine {
                    name,
                    params: vec!["value".to_string()],
                    body: self.encode_object(node, EmissionNode::var("value"))?,
                },
                Direction::Decode => {
                    let mut body = self.decode_object(
                        node,
                        EmissionNode::var("source"),
                        EmissionNode::var("result"),
                    )?;
                    body.push(EmissionNode::Return(Some(Box::new(EmissionNode::var("result")))));
                    Routine {
                        name,
                        params: vec!["source".to_string()],
                        body,
                    }
                }
            };
            routines.push(routine);
        }

        Ok(Program {
            ty: root.ty(),
            direction: self.direction,
            flavor,
            strategy: self.strategy,
            entry,
            routines,
        })
    }

    fn routine_call(&self, ty: &Type, arg: EmissionNode) -> Option<EmissionNode> {
        self.routines.get(&ty.to_string()).map(|name| EmissionNode::Call {
            callee: Callee::Routine(name.clone()),
            args: vec![arg],
        })
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self, usize) -> StencilResult<T>,
    ) -> StencilResult<T> {
        self.depth += 1;
        let depth = self.depth;
        let result = f(self, depth);
        self.depth -= 1;
        result
    }

    fn wrap_element(
        &self,
        site: &Type,
        key: Option<String>,
        body: Vec<EmissionNode>,
    ) -> Vec<EmissionNode> {
        if self.collect_errors {
            vec![EmissionNode::Try {
                site: site.to_string(),
                key,
                body,
            }]
        } else {
            body
        }
    }

    // ---------------------------------------------------------------------
    // Encode
    // ---------------------------------------------------------------------

    pub fn encode(
        &mut self,
        node: &DataModelNode,
        value: EmissionNode,
    ) -> StencilResult<Vec<EmissionNode>> {
        match node {
            DataModelNode::Scalar(ScalarShape::Null) => Ok(vec![EmissionNode::write("null")]),
            DataModelNode::Scalar(ScalarShape::Kind(_)) | DataModelNode::Enum { .. } => {
                Ok(vec![EmissionNode::builtin(Builtin::WriteScalar, vec![value])])
            }
            DataModelNode::Mixed => {
                Ok(vec![EmissionNode::builtin(Builtin::WriteValue, vec![value])])
            }
            DataModelNode::Nullable(inner) => Ok(vec![EmissionNode::If {
                branches: vec![Branch {
                    condition: EmissionNode::builtin(Builtin::IsNull, vec![value.clone()]),
                    body: vec![EmissionNode::write("null")],
                }],
                otherwise: Some(self.encode(inner, value)?),
            }]),
            DataModelNode::Collection { ty, kind, item } => {
                let (open, close) = match kind {
                    CollectionKind::List => ("[", "]"),
                    CollectionKind::Dict { .. } => ("{", "}"),
                };
                self.nested(|this, depth| {
                    let sep = format!("sep{depth}");
                    let item_var = format!("item{depth}");
                    let key_var = format!("key{depth}");

                    let mut body =
                        vec![EmissionNode::builtin(Builtin::Write, vec![EmissionNode::var(&sep)])];
                    let key = match kind {
                        CollectionKind::List => this.collect_errors.then(|| key_var.clone()),
                        CollectionKind::Dict { .. } => {
                            body.push(EmissionNode::builtin(
                                Builtin::WriteKey,
                                vec![EmissionNode::var(&key_var)],
                            ));
                            body.push(EmissionNode::write(":"));
                            Some(key_var.clone())
                        }
                    };
                    body.extend(this.encode(item, EmissionNode::var(&item_var))?);
                    body.push(EmissionNode::assign(
                        EmissionNode::var(&sep),
                        EmissionNode::string(","),
                    ));

                    Ok(vec![
                        EmissionNode::write(open),
                        EmissionNode::assign(EmissionNode::var(&sep), EmissionNode::string("")),
                        EmissionNode::Foreach {
                            iterable: Box::new(value),
                            key: key.clone(),
                            value: item_var,
                            body: this.wrap_element(ty, key, body),
                        },
                        EmissionNode::write(close),
                    ])
                })
            }
            DataModelNode::Object { ty, .. } => match self.routine_call(ty, value.clone()) {
                Some(call) => Ok(vec![call]),
                None => self.encode_object(node, value),
            },
            DataModelNode::Ghost(ty) => self
                .routine_call(ty, value)
                .map(|call| vec![call])
                .ok_or_else(|| StencilError::Template(format!("ghost type {ty} has no routine"))),
            DataModelNode::Union { ty, alternatives } => {
                let mut branches = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    branches.push(Branch {
                        condition: EmissionNode::builtin(
                            Builtin::IsType,
                            vec![value.clone(), EmissionNode::string(alternative.ty().to_string())],
                        ),
                        body: self.encode(alternative, value.clone())?,
                    });
                }
                Ok(vec![EmissionNode::If {
                    branches,
                    otherwise: Some(vec![EmissionNode::Throw {
                        failure: Failure::UnexpectedValue {
                            expected: ty.to_string(),
                        },
                        subject: Box::new(value),
                    }]),
                }])
            }
        }
    }

    fn encode_object(
        &mut self,
        node: &DataModelNode,
        value: EmissionNode,
    ) -> StencilResult<Vec<EmissionNode>> {
        let DataModelNode::Object { class, properties, .. } = node else {
            return Err(StencilError::Template(format!("{} is not an object", node.ty())));
        };

        self.nested(|this, _| {
            let mut out =
                vec![EmissionNode::builtin(Builtin::Enter, vec![EmissionNode::string(class)])];
            let mut separator = "{";
            for property in properties {
                // Every field is always written, so the separator is known here.
                let name = serde_json::to_string(&property.wire_name)?;
                out.push(EmissionNode::write(format!("{separator}{name}:")));
                separator = ",";
                out.extend(this.encode_property(property, &value)?);
            }
            out.push(EmissionNode::write(if properties.is_empty() { "{}" } else { "}" }));
            out.push(EmissionNode::builtin(Builtin::Leave, vec![EmissionNode::string(class)]));
            Ok(out)
        })
    }

    fn encode_property(
        &mut self,
        property: &PropertyNode,
        object: &EmissionNode,
    ) -> StencilResult<Vec<EmissionNode>> {
        let mut body = Vec::new();
        let accessed = apply_formatters(
            EmissionNode::property(object.clone(), &property.accessor.property),
            &property.accessor,
        );
        let field_value = if property.accessor.is_direct() {
            accessed
        } else {
            let temp = EmissionNode::var(format!("field{}", self.depth));
            body.push(EmissionNode::assign(temp.clone(), accessed));
            temp
        };
        body.extend(self.encode(&property.value, field_value)?);

        let Some(guard) = &property.guard else {
            return Ok(body);
        };
        let raw = EmissionNode::property(object.clone(), &property.accessor.property);
        let exceeded = match &guard.overflow {
            Some(overflow) => self.encode(
                &overflow.value,
                formatter_call(&overflow.formatter, raw),
            )?,
            None => vec![EmissionNode::Throw {
                failure: Failure::MaxDepthExceeded {
                    class: guard.class.clone(),
                    depth: guard.depth,
                },
                subject: Box::new(raw),
            }],
        };
        Ok(vec![EmissionNode::If {
            branches: vec![Branch {
                condition: depth_exceeded(&guard.class, guard.depth),
                body: exceeded,
            }],
            otherwise: Some(body),
        }])
    }

    // ---------------------------------------------------------------------
    // Decode
    // ---------------------------------------------------------------------

    /// Parsed value of `source`; lazy sources are boundaries
    fn value_of(&self, source: EmissionNode) -> EmissionNode {
        match self.strategy {
            Strategy::Eager => source,
            Strategy::Lazy => EmissionNode::builtin(Builtin::ParseAt, vec![source]),
        }
    }

    pub fn decode(
        &mut self,
        node: &DataModelNode,
        source: EmissionNode,
        target: EmissionNode,
    ) -> StencilResult<Vec<EmissionNode>> {
        match node {
            DataModelNode::Scalar(shape) => {
                let kind = match shape {
                    ScalarShape::Null => "null",
                    ScalarShape::Kind(kind) => kind.as_str(),
                };
                Ok(vec![EmissionNode::assign(
                    target,
                    EmissionNode::builtin(
                        Builtin::ReadScalar,
                        vec![self.value_of(source), EmissionNode::string(kind)],
                    ),
                )])
            }
            DataModelNode::Mixed => Ok(vec![EmissionNode::assign(target, self.value_of(source))]),
            DataModelNode::Enum { class, backing, cases } => {
                let cases = match cases {
                    Some(cases) => {
                        Literal::List(cases.iter().map(literal_of).collect::<StencilResult<_>>()?)
                    }
                    None => Literal::Null,
                };
                Ok(vec![EmissionNode::assign(
                    target,
                    EmissionNode::builtin(
                        Builtin::ReadEnum,
                        vec![
                            self.value_of(source),
                            EmissionNode::string(class),
                            EmissionNode::string(backing.as_str()),
                            EmissionNode::Literal(cases),
                        ],
                    ),
                )])
            }
            DataModelNode::Nullable(inner) => Ok(vec![EmissionNode::If {
                branches: vec![Branch {
                    condition: EmissionNode::builtin(Builtin::IsNull, vec![source.clone()]),
                    body: vec![EmissionNode::assign(
                        target.clone(),
                        EmissionNode::Literal(Literal::Null),
                    )],
                }],
                otherwise: Some(self.decode(inner, source, target)?),
            }]),
            DataModelNode::Collection { ty, kind, item } => self.nested(|this, depth| {
                let item_var = format!("item{depth}");
                let key_var = format!("key{depth}");
                match kind {
                    CollectionKind::List => {
                        let list = EmissionNode::var(format!("list{depth}"));
                        let iterable = match this.strategy {
                            Strategy::Eager => source,
                            Strategy::Lazy => {
                                EmissionNode::builtin(Builtin::SplitList, vec![source])
                            }
                        };
                        let body = this.decode(
                            item,
                            EmissionNode::var(&item_var),
                            EmissionNode::append(list.clone()),
                        )?;
                        let key = this.collect_errors.then(|| key_var.clone());
                        let new_list = EmissionNode::builtin(Builtin::NewList, vec![]);
                        Ok(vec![
                            EmissionNode::assign(list.clone(), new_list),
                            EmissionNode::Foreach {
                                iterable: Box::new(iterable),
                                key: key.clone(),
                                value: item_var,
                                body: this.wrap_element(ty, key, body),
                            },
                            EmissionNode::assign(target, list),
                        ])
                    }
                    CollectionKind::Dict { key: key_kind } => {
                        let dict = EmissionNode::var(format!("dict{depth}"));
                        let iterable = match this.strategy {
                            Strategy::Eager => source,
                            Strategy::Lazy => EmissionNode::builtin(
                                Builtin::SplitDict,
                                vec![source, EmissionNode::string(key_kind.as_str())],
                            ),
                        };
                        let slot = EmissionNode::index(
                            dict.clone(),
                            EmissionNode::builtin(
                                Builtin::ReadKey,
                                vec![
                                    EmissionNode::var(&key_var),
                                    EmissionNode::string(key_kind.as_str()),
                                ],
                            ),
                        );
                        let body = this.decode(item, EmissionNode::var(&item_var), slot)?;
                        let new_dict = EmissionNode::builtin(Builtin::NewDict, vec![]);
                        Ok(vec![
                            EmissionNode::assign(dict.clone(), new_dict),
                            EmissionNode::Foreach {
                                iterable: Box::new(iterable),
                                key: Some(key_var.clone()),
                                value: item_var,
                                body: this.wrap_element(ty, Some(key_var), body),
                            },
                            EmissionNode::assign(target, dict),
                        ])
                    }
                }
            }),
            DataModelNode::Object { ty, .. } => match self.routine_call(ty, source.clone()) {
                Some(call) => Ok(vec![EmissionNode::assign(target, call)]),
                None => self.decode_object(node, source, target),
            },
            DataModelNode::Ghost(ty) => self
                .routine_call(ty, source)
                .map(|call| vec![EmissionNode::assign(target, call)])
                .ok_or_else(|| StencilError::Template(format!("ghost type {ty} has no routine"))),
            DataModelNode::Union { ty, alternatives } => {
                let has_int = alternatives.iter().any(|a| {
                    matches!(a, DataModelNode::Scalar(ScalarShape::Kind(ScalarKind::Int)))
                });
                let mut branches = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    branches.push(Branch {
                        condition: self.decode_test(alternative, &source, has_int)?,
                        body: self.decode(alternative, source.clone(), target.clone())?,
                    });
                }
                Ok(vec![EmissionNode::If {
                    branches,
                    otherwise: Some(vec![EmissionNode::Throw {
                        failure: Failure::UnexpectedValue {
                            expected: ty.to_string(),
                        },
                        subject: Box::new(self.value_of(source)),
                    }]),
                }])
            }
        }
    }

    /// Condition selecting a union alternative from the wire shape
    fn decode_test(
        &self,
        node: &DataModelNode,
        source: &EmissionNode,
        has_int: bool,
    ) -> StencilResult<EmissionNode> {
        let kinds: Vec<&str> = match node {
            DataModelNode::Scalar(ScalarShape::Null) => vec!["null"],
            DataModelNode::Scalar(ScalarShape::Kind(ScalarKind::Float)) if !has_int => {
                vec!["float", "int"]
            }
            DataModelNode::Scalar(ScalarShape::Kind(kind)) => vec![kind.as_str()],
            DataModelNode::Enum { backing, .. } => vec![backing.as_str()],
            DataModelNode::Collection { kind: CollectionKind::List, .. } => vec!["list"],
            DataModelNode::Collection { kind: CollectionKind::Dict { .. }, .. } => vec!["dict"],
            DataModelNode::Nullable(inner) => return self.decode_test(inner, source, has_int),
            DataModelNode::Mixed | DataModelNode::Union { .. } => {
                return Ok(EmissionNode::Literal(Literal::Bool(true)));
            }
            DataModelNode::Object { ty, .. } | DataModelNode::Ghost(ty) => {
                let object = self.objects.get(&ty.to_string()).ok_or_else(|| {
                    StencilError::Template(format!("no object definition for {ty}"))
                })?;
                let DataModelNode::Object { properties, .. } = object else {
                    return Err(StencilError::Template(format!("{ty} is not an object")));
                };
                let required = properties
                    .iter()
                    .filter(|p| {
                        !matches!(p.value, DataModelNode::Nullable(_) | DataModelNode::Mixed)
                    })
                    .map(|p| Literal::String(p.wire_name.clone()))
                    .collect();
                return Ok(EmissionNode::builtin(
                    Builtin::HasKeys,
                    vec![source.clone(), EmissionNode::Literal(Literal::List(required))],
                ));
            }
        };
        let mut args = vec![source.clone()];
        args.extend(kinds.into_iter().map(EmissionNode::string));
        Ok(EmissionNode::builtin(Builtin::IsKind, args))
    }

    fn decode_object(
        &mut self,
        node: &DataModelNode,
        source: EmissionNode,
        target: EmissionNode,
    ) -> StencilResult<Vec<EmissionNode>> {
        let DataModelNode::Object { class, properties, .. } = node else {
            return Err(StencilError::Template(format!("{} is not an object", node.ty())));
        };

        self.nested(|this, depth| {
            let object = EmissionNode::var(format!("object{depth}"));
            let fields = EmissionNode::var(format!("fields{depth}"));
            let fields_source = match this.strategy {
                Strategy::Eager => source,
                Strategy::Lazy => EmissionNode::builtin(Builtin::IndexFields, vec![source]),
            };

            let mut out = vec![
                EmissionNode::builtin(Builtin::Enter, vec![EmissionNode::string(class)]),
                EmissionNode::assign(
                    object.clone(),
                    EmissionNode::builtin(Builtin::NewObject, vec![EmissionNode::string(class)]),
                ),
                EmissionNode::assign(fields.clone(), fields_source),
            ];
            for property in properties {
                out.extend(this.decode_property(property, &fields, &object, depth)?);
            }
            out.push(EmissionNode::builtin(Builtin::Leave, vec![EmissionNode::string(class)]));
            out.push(EmissionNode::assign(target, object));
            Ok(out)
        })
    }

    fn decode_property(
        &mut self,
        property: &PropertyNode,
        fields: &EmissionNode,
        object: &EmissionNode,
        depth: usize,
    ) -> StencilResult<Vec<EmissionNode>> {
        let source = EmissionNode::index(fields.clone(), EmissionNode::string(&property.wire_name));
        let target = EmissionNode::property(object.clone(), &property.accessor.property);

        let body = if property.accessor.is_direct() {
            self.decode(&property.value, source.clone(), target.clone())?
        } else {
            let temp = EmissionNode::var(format!("field{depth}"));
            let mut body = self.decode(&property.value, source.clone(), temp.clone())?;
            let formatted = apply_formatters(temp, &property.accessor);
            body.push(EmissionNode::assign(target.clone(), formatted));
            body
        };

        let Some(guard) = &property.guard else {
            return Ok(body);
        };
        let exceeded = match &guard.overflow {
            Some(overflow) => {
                let temp = EmissionNode::var(format!("overflow{depth}"));
                let mut exceeded = self.decode(&overflow.value, source, temp.clone())?;
                let formatted = formatter_call(&overflow.formatter, temp);
                exceeded.push(EmissionNode::assign(target, formatted));
                exceeded
            }
            None => vec![EmissionNode::Throw {
                failure: Failure::MaxDepthExceeded {
                    class: guard.class.clone(),
                    depth: guard.depth,
                },
                subject: Box::new(self.value_of(source)),
            }],
        };
        Ok(vec![EmissionNode::If {
            branches: vec![Branch {
                condition: depth_exceeded(&guard.class, guard.depth),
                body: exceeded,
            }],
            otherwise: Some(body),
        }])
    }
}

fn formatter_call(name: &str, value: EmissionNode) -> EmissionNode {
    EmissionNode::Call {
        callee: Callee::Formatter(name.to_string()),
        args: vec![value, EmissionNode::var(CONFIG_VAR)],
    }
}

/// Compose the accessor's formatters around `value`, in declared order
fn apply_formatters(value: EmissionNode, accessor: &Accessor) -> EmissionNode {
    accessor
        .formatters
        .iter()
        .fold(value, |inner, name| formatter_call(name, inner))
}

fn depth_exceeded(class: &str, depth: usize) -> EmissionNode {
    EmissionNode::builtin(
        Builtin::DepthExceeded,
        vec![
            EmissionNode::string(class),
            EmissionNode::int(i64::try_from(depth).unwrap_or(i64::MAX)),
        ],
    )
}

fn literal_of(value: &Value) -> StencilResult<Literal> {
    Ok(match value {
        Value::Null => Literal::Null,
        Value::Bool(b) => Literal::Bool(*b),
        Value::Int(i) => Literal::Int(*i),
        Value::Float(f) => Literal::Float(*f),
        Value::String(s) => Literal::String(s.clone()),
        Value::List(items) => {
            Literal::List(items.iter().map(literal_of).collect::<StencilResult<_>>()?)
        }
        other => {
            return Err(StencilError::UnsupportedType(format!(
                "{} cannot be a literal",
                other.kind()
            )));
        }
    })
}

/// Routine-name-safe form of a type string
fn identifier(ty: &str) -> String {
    let mut out = String::with_capacity(ty.len());
    for c in ty.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
#[path = "lower/lower_tests.rs"]
mod lower_tests;
