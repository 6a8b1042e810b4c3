//! Builtin operations callable from generated code

use crate::machine::Run;
use crate::slot::{Slot, value_key};
use indexmap::IndexMap;
use stencil_codegen::Builtin;
use stencil_core::{Object, ScalarKind, StencilError, StencilResult, Type, Value};
use stencil_json::{Boundary, SplitCursor};

/// Positional arguments of one builtin call
struct Args {
    builtin: Builtin,
    items: std::vec::IntoIter<Slot>,
}

impl Args {
    fn next(&mut self) -> StencilResult<Slot> {
        self.items.next().ok_or_else(|| {
            StencilError::Template(format!("{} is missing an argument", self.builtin.name()))
        })
    }

    fn value(&mut self) -> StencilResult<Value> {
        self.next()?.into_value()
    }

    fn string(&mut self) -> StencilResult<String> {
        match self.value()? {
            Value::String(s) => Ok(s),
            other => Err(StencilError::Template(format!(
                "{} expects a string argument, got {}",
                self.builtin.name(),
                other.kind()
            ))),
        }
    }

    fn strings(self) -> StencilResult<Vec<String>> {
        let builtin = self.builtin;
        self.items
            .map(|slot| match slot {
                Slot::Value(Value::String(s)) => Ok(s),
                other => Err(StencilError::Template(format!(
                    "{} expects string arguments, got {}",
                    builtin.name(),
                    other.kind()
                ))),
            })
            .collect()
    }
}

impl Run<'_> {
    pub(crate) fn builtin(&mut self, builtin: Builtin, args: Vec<Slot>) -> StencilResult<Slot> {
        let mut args = Args {
            builtin,
            items: args.into_iter(),
        };
        let flags = self.config().json_flags;

        let result = match builtin {
            Builtin::Write => {
                let text = args.string()?;
                self.emit(text.as_bytes())?;
                Value::Null
            }
            Builtin::WriteScalar => {
                let mut bytes = Vec::new();
                stencil_json::write_scalar(&mut bytes, &args.value()?, flags)?;
                self.emit(&bytes)?;
                Value::Null
            }
            Builtin::WriteKey => {
                let mut bytes = Vec::new();
                stencil_json::write_key(&mut bytes, &value_key(&args.value()?)?)?;
                self.emit(&bytes)?;
                Value::Null
            }
            Builtin::WriteValue => {
                let mut bytes = Vec::new();
                stencil_json::write_value(&mut bytes, &args.value()?, flags)?;
                self.emit(&bytes)?;
                Value::Null
            }
            Builtin::IsNull => {
                let is_null = match args.next()? {
                    Slot::Value(value) => value.is_null(),
                    Slot::Boundary(boundary) => self.first_token(boundary)? == "null",
                    Slot::List(cursor) | Slot::Dict(cursor, _) => cursor.is_none(),
                    Slot::Fields(_) => false,
                };
                Value::Bool(is_null)
            }
            Builtin::IsType => {
                let value = args.value()?;
                let ty = self.parsed_type(&args.string()?)?;
                Value::Bool(value.is_instance_of(&ty))
            }
            Builtin::IsKind => {
                let slot = args.next()?;
                let kind = self.wire_kind(&slot)?;
                Value::Bool(args.strings()?.iter().any(|k| k == kind))
            }
            Builtin::HasKeys => {
                let slot = args.next()?;
                let keys = match args.value()? {
                    Value::List(keys) => keys,
                    other => {
                        return Err(StencilError::Template(format!(
                            "has_keys expects a list of names, got {}",
                            other.kind()
                        )));
                    }
                };
                Value::Bool(self.has_keys(slot, &keys)?)
            }
            Builtin::ReadScalar => {
                let value = args.value()?;
                read_scalar(value, &args.string()?)?
            }
            Builtin::ReadKey => {
                let value = args.value()?;
                read_key(value, &args.string()?)?
            }
            Builtin::ReadEnum => {
                let value = args.value()?;
                let class = args.string()?;
                let backing = args.string()?;
                let cases = args.value()?;
                read_enum(value, class, &backing, &cases)?
            }
            Builtin::NewObject => Value::Object(Object::new(args.string()?)),
            Builtin::NewList => Value::List(Vec::new()),
            Builtin::NewDict => Value::Dict(IndexMap::new()),
            Builtin::ParseAt => match args.next()? {
                Slot::Value(value) => value,
                Slot::Boundary(boundary) => {
                    stencil_json::parse_at(self.resource()?, boundary, flags)?
                }
                other => {
                    return Err(StencilError::Template(format!("cannot parse a {}", other.kind())));
                }
            },
            Builtin::SplitList => {
                return match args.next()? {
                    Slot::Boundary(boundary) => Ok(Slot::List(SplitCursor::list(
                        self.resource()?,
                        boundary.offset,
                        Some(boundary.length),
                    )?)),
                    Slot::Value(Value::Null) => Ok(Slot::List(None)),
                    list @ Slot::Value(Value::List(_)) => Ok(list),
                    other => Err(StencilError::unexpected("list", other.kind())),
                };
            }
            Builtin::SplitDict => {
                let slot = args.next()?;
                let kind = key_kind(&args.string()?)?;
                return match slot {
                    Slot::Boundary(boundary) => Ok(Slot::Dict(
                        SplitCursor::dict(
                            self.resource()?,
                            boundary.offset,
                            Some(boundary.length),
                        )?,
                        kind,
                    )),
                    Slot::Value(Value::Null) => Ok(Slot::Dict(None, kind)),
                    dict @ Slot::Value(Value::Dict(_)) => Ok(dict),
                    other => Err(StencilError::unexpected("dict", other.kind())),
                };
            }
            Builtin::IndexFields => {
                return match args.next()? {
                    Slot::Boundary(boundary) => self.index_fields(boundary),
                    other => Ok(other),
                };
            }
            Builtin::Enter => {
                let class = args.string()?;
                let max_depth = self.config().max_depth;
                let count = self.depths.entry(class.clone()).or_insert(0);
                *count += 1;
                if *count > max_depth {
                    return Err(StencilError::MaxDepthExceeded {
                        class,
                        depth: max_depth,
                    });
                }
                Value::Null
            }
            Builtin::Leave => {
                let class = args.string()?;
                if let Some(count) = self.depths.get_mut(&class) {
                    *count = count.saturating_sub(1);
                }
                Value::Null
            }
            Builtin::DepthExceeded => {
                let class = args.string()?;
                let depth = match args.value()? {
                    Value::Int(depth) => usize::try_from(depth).unwrap_or(0),
                    other => {
                        return Err(StencilError::Template(format!(
                            "depth_exceeded expects an int depth, got {}",
                            other.kind()
                        )));
                    }
                };
                let count = self.depths.get(&class).copied().unwrap_or(0);
                Value::Bool(count > depth)
            }
        };
        Ok(Slot::Value(result))
    }

    fn parsed_type(&mut self, text: &str) -> StencilResult<Type> {
        if let Some(ty) = self.types.get(text) {
            return Ok(ty.clone());
        }
        let ty: Type = text.parse()?;
        self.types.insert(text.to_string(), ty.clone());
        Ok(ty)
    }

    fn first_token(&mut self, boundary: Boundary) -> StencilResult<String> {
        let mut lexer =
            stencil_json::tokens(self.resource()?, boundary.offset, Some(boundary.length))?;
        match lexer.next().transpose()? {
            Some(token) => Ok(token.value),
            None => Err(StencilError::MalformedInput(format!(
                "empty value at byte {}",
                boundary.offset
            ))),
        }
    }

    /// Wire kind: `null`, `bool`, `int`, `float`, `string`, `list` or `dict`
    pub(crate) fn wire_kind(&mut self, slot: &Slot) -> StencilResult<&'static str> {
        Ok(match slot {
            Slot::Value(value) => value_wire_kind(value),
            Slot::Boundary(boundary) => token_kind(&self.first_token(*boundary)?),
            Slot::Fields(_) | Slot::Dict(..) => "dict",
            Slot::List(_) => "list",
        })
    }

    fn has_keys(&mut self, slot: Slot, keys: &[Value]) -> StencilResult<bool> {
        let present = |name: &str, slot: &Slot| match slot {
            Slot::Value(Value::Dict(map)) => map.contains_key(&stencil_core::Key::from(name)),
            Slot::Value(Value::Object(object)) => object.get(name).is_some(),
            Slot::Fields(fields) => fields.contains_key(name),
            _ => false,
        };
        let slot = match slot {
            Slot::Boundary(boundary) => {
                if self.wire_kind(&Slot::Boundary(boundary))? != "dict" {
                    return Ok(false);
                }
                self.index_fields(boundary)?
            }
            other => other,
        };
        if !matches!(
            slot,
            Slot::Value(Value::Dict(_)) | Slot::Value(Value::Object(_)) | Slot::Fields(_)
        ) {
            return Ok(false);
        }
        Ok(keys
            .iter()
            .all(|key| key.as_str().is_some_and(|name| present(name, &slot))))
    }

    /// Wire name -> boundary map of the object at `boundary`
    fn index_fields(&mut self, boundary: Boundary) -> StencilResult<Slot> {
        let resource = self.resource()?;
        let cursor = SplitCursor::dict(resource, boundary.offset, Some(boundary.length))?;
        let Some(mut cursor) = cursor else {
            return Ok(Slot::Value(Value::Null));
        };
        let mut fields = IndexMap::new();
        while let Some((key, value)) = cursor.next_entry(resource, ScalarKind::String)? {
            fields.insert(key.to_string(), value);
        }
        Ok(Slot::Fields(fields))
    }
}

fn value_wire_kind(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "dict",
        Value::Enum { value, .. } => value_wire_kind(value),
        other => other.kind(),
    }
}

fn token_kind(token: &str) -> &'static str {
    match token.as_bytes().first() {
        Some(b'[') => "list",
        Some(b'{') => "dict",
        Some(b'"') => "string",
        _ => match token {
            "null" => "null",
            "true" | "false" => "bool",
            number if number.contains(['.', 'e', 'E']) => "float",
            _ => "int",
        },
    }
}

fn key_kind(text: &str) -> StencilResult<ScalarKind> {
    match text {
        "int" => Ok(ScalarKind::Int),
        "string" => Ok(ScalarKind::String),
        other => Err(StencilError::UnsupportedType(format!("dict key kind {other}"))),
    }
}

/// Check a decoded scalar against its declared kind
fn read_scalar(value: Value, kind: &str) -> StencilResult<Value> {
    match (kind, value) {
        ("null", Value::Null) => Ok(Value::Null),
        ("bool", v @ Value::Bool(_))
        | ("int", v @ Value::Int(_))
        | ("float", v @ Value::Float(_))
        | ("string", v @ Value::String(_)) => Ok(v),
        ("float", Value::Int(i)) => Ok(Value::Float(i as f64)),
        (kind, other) => Err(StencilError::unexpected(kind, other.kind())),
    }
}

fn read_key(value: Value, kind: &str) -> StencilResult<Value> {
    match (kind, value) {
        ("int", v @ Value::Int(_)) | ("string", v @ Value::String(_)) => Ok(v),
        ("int", Value::String(s)) => s
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| StencilError::unexpected("int key", format!("{s:?}"))),
        ("string", Value::Int(i)) => Ok(Value::String(i.to_string())),
        (kind, other) => Err(StencilError::unexpected(format!("{kind} key"), other.kind())),
    }
}

fn read_enum(value: Value, class: String, backing: &str, cases: &Value) -> StencilResult<Value> {
    let backed = matches!(
        (backing, &value),
        ("int", Value::Int(_)) | ("string", Value::String(_))
    );
    let allowed = match cases {
        Value::List(cases) => cases.contains(&value),
        _ => true,
    };
    if !(backed && allowed) {
        return Err(StencilError::unexpected(
            format!("a case of {class}"),
            value.to_json().to_string(),
        ));
    }
    Ok(Value::Enum {
        class,
        value: Box::new(value),
    })
}
