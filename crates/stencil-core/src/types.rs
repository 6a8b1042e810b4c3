//! Static shape descriptions
//!
//! A [`Type`] is immutable and structurally comparable. Its [`Display`] form
//! is stable and is used as a cache-key component and as the identity of an
//! object type while a data model is being built. [`FromStr`] parses the same
//! form back, which lets schema files and the CLI name types as text:
//!
//! ```text
//! int                 list<User>          dict<string, float>
//! ?string             int|string|null     Page<Article>
//! enum<Suit, string>  mixed
//! ```

use crate::error::StencilError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Scalar kinds usable as dict keys and enum backings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    String,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::String => "string",
        }
    }

    /// The plain type for this scalar kind
    pub fn to_type(self) -> Type {
        match self {
            ScalarKind::Bool => Type::Bool,
            ScalarKind::Int => Type::Int,
            ScalarKind::Float => Type::Float,
            ScalarKind::String => Type::String,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static shape of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Null,
    Bool,
    Int,
    Float,
    String,
    /// Any value, converted generically
    Mixed,
    /// A class with named, typed fields supplied by the metadata loader
    Object { class: String, args: Vec<Type> },
    /// A class whose values are backed by a scalar
    Enum { class: String, backing: ScalarKind },
    List(Box<Type>),
    Dict { key: ScalarKind, value: Box<Type> },
    /// Two or more non-null members
    Union(Vec<Type>),
    Nullable(Box<Type>),
}

impl Type {
    /// Create an object type without generic arguments
    pub fn object(class: impl Into<String>) -> Self {
        Type::Object {
            class: class.into(),
            args: Vec::new(),
        }
    }

    /// Create a generic object type
    pub fn generic(class: impl Into<String>, args: Vec<Type>) -> Self {
        Type::Object {
            class: class.into(),
            args,
        }
    }

    pub fn enumeration(class: impl Into<String>, backing: ScalarKind) -> Self {
        Type::Enum {
            class: class.into(),
            backing,
        }
    }

    pub fn list(item: Type) -> Self {
        Type::List(Box::new(item))
    }

    pub fn dict(key: ScalarKind, value: Type) -> Self {
        Type::Dict {
            key,
            value: Box::new(value),
        }
    }

    /// Wrap in `Nullable` unless already nullable
    pub fn nullable(inner: Type) -> Self {
        match inner {
            Type::Nullable(_) | Type::Null | Type::Mixed => inner,
            other => Type::Nullable(Box::new(other)),
        }
    }

    /// Build a normalized union.
    ///
    /// Nested unions are flattened, duplicates dropped, and a `null` member
    /// turns the result into `Nullable`. A single remaining member is
    /// returned as-is.
    pub fn union(members: impl IntoIterator<Item = Type>) -> Self {
        let mut flat: Vec<Type> = Vec::new();
        let mut nullable = false;

        fn push(flat: &mut Vec<Type>, nullable: &mut bool, ty: Type) {
            match ty {
                Type::Null => *nullable = true,
                Type::Nullable(inner) => {
                    *nullable = true;
                    push(flat, nullable, *inner);
                }
                Type::Union(members) => {
                    for member in members {
                        push(flat, nullable, member);
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }

        for member in members {
            push(&mut flat, &mut nullable, member);
        }

        let core = match flat.len() {
            0 => return Type::Null,
            1 => flat.remove(0),
            _ => Type::Union(flat),
        };

        if nullable {
            Type::nullable(core)
        } else {
            core
        }
    }

    /// Class name for object and enum types
    pub fn class(&self) -> Option<&str> {
        match self {
            Type::Object { class, .. } | Type::Enum { class, .. } => Some(class),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Type::Object { .. })
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Type::Null | Type::Bool | Type::Int | Type::Float | Type::String
        )
    }

    /// Replace object types named after a generic parameter with the
    /// corresponding argument.
    pub fn substitute(&self, params: &[String], args: &[Type]) -> Type {
        match self {
            Type::Object { class, args: inner } if inner.is_empty() => {
                match params.iter().position(|p| p == class) {
                    Some(index) => args.get(index).cloned().unwrap_or(Type::Mixed),
                    None => self.clone(),
                }
            }
            Type::Object { class, args: inner } => Type::Object {
                class: class.clone(),
                args: inner.iter().map(|t| t.substitute(params, args)).collect(),
            },
            Type::List(item) => Type::list(item.substitute(params, args)),
            Type::Dict { key, value } => Type::dict(*key, value.substitute(params, args)),
            Type::Union(members) => {
                Type::union(members.iter().map(|t| t.substitute(params, args)))
            }
            Type::Nullable(inner) => Type::nullable(inner.substitute(params, args)),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Null => f.write_str("null"),
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::String => f.write_str("string"),
            Type::Mixed => f.write_str("mixed"),
            Type::Object { class, args } => {
                f.write_str(class)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Type::Enum { class, backing } => write!(f, "enum<{class}, {backing}>"),
            Type::List(item) => write!(f, "list<{item}>"),
            Type::Dict { key, value } => write!(f, "dict<{key}, {value}>"),
            Type::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            Type::Nullable(inner) => match inner.as_ref() {
                Type::Union(_) => write!(f, "{inner}|null"),
                _ => write!(f, "?{inner}"),
            },
        }
    }
}

impl FromStr for Type {
    type Err = StencilError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeParser { input, pos: 0, depth: 0 };
        let ty = parser.parse_union()?;
        parser.skip_ws();
        if parser.pos != input.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Recursive-descent parser over the display form
/// Deepest type expression nesting the parser accepts
const MAX_TYPE_NESTING: usize = 128;

struct TypeParser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl TypeParser<'_> {
    fn error(&self, message: &str) -> StencilError {
        StencilError::TypeSyntax {
            input: self.input.to_string(),
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), StencilError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{expected}'")))
        }
    }

    fn parse_union(&mut self) -> Result<Type, StencilError> {
        let mut members = vec![self.parse_member()?];
        while self.eat('|') {
            members.push(self.parse_member()?);
        }
        Ok(if members.len() == 1 {
            members.remove(0)
        } else {
            Type::union(members)
        })
    }

    fn parse_member(&mut self) -> Result<Type, StencilError> {
        if self.depth >= MAX_TYPE_NESTING {
            return Err(self.error("type nested too deeply"));
        }
        self.depth += 1;
        let member = if self.eat('?') {
            self.parse_member().map(Type::nullable)
        } else {
            self.parse_primary()
        };
        self.depth -= 1;
        member
    }

    fn ident(&mut self) -> Result<String, StencilError> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '\\' || c == '.' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error("expected a type name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn scalar_kind(&mut self) -> Result<ScalarKind, StencilError> {
        match self.ident()?.as_str() {
            "bool" => Ok(ScalarKind::Bool),
            "int" => Ok(ScalarKind::Int),
            "float" => Ok(ScalarKind::Float),
            "string" => Ok(ScalarKind::String),
            _ => Err(self.error("expected a scalar kind")),
        }
    }

    fn parse_primary(&mut self) -> Result<Type, StencilError> {
        let name = self.ident()?;
        match name.as_str() {
            "null" => Ok(Type::Null),
            "bool" => Ok(Type::Bool),
            "int" => Ok(Type::Int),
            "float" => Ok(Type::Float),
            "string" => Ok(Type::String),
            "mixed" => Ok(Type::Mixed),
            "list" => {
                self.expect('<')?;
                let item = self.parse_union()?;
                self.expect('>')?;
                Ok(Type::list(item))
            }
            "dict" => {
                self.expect('<')?;
                let key = self.scalar_kind()?;
                if !matches!(key, ScalarKind::Int | ScalarKind::String) {
                    return Err(self.error("dict keys must be int or string"));
                }
                self.expect(',')?;
                let value = self.parse_union()?;
                self.expect('>')?;
                Ok(Type::dict(key, value))
            }
            "enum" => {
                self.expect('<')?;
                let class = self.ident()?;
                self.expect(',')?;
                let backing = self.scalar_kind()?;
                if !matches!(backing, ScalarKind::Int | ScalarKind::String) {
                    return Err(self.error("enums must be backed by int or string"));
                }
                self.expect('>')?;
                Ok(Type::enumeration(class, backing))
            }
            _ => {
                let mut args = Vec::new();
                if self.eat('<') {
                    args.push(self.parse_union()?);
                    while self.eat(',') {
                        args.push(self.parse_union()?);
                    }
                    self.expect('>')?;
                }
                Ok(Type::generic(name, args))
            }
        }
    }
}
