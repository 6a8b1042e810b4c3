//! Emission AST
//!
//! A small imperative language that generated templates are written in.
//! Trees are immutable once built: the optimizer consumes a tree and returns
//! a new one.

use serde::{Deserialize, Serialize};
use stencil_core::{Direction, Flavor, Strategy, Type};

/// Constant operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Literal>),
}

/// Operations provided by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Builtin {
    /// `write(text)`: raw output
    Write,
    /// `write_scalar(value)`
    WriteScalar,
    /// `write_key(key)`: quoted dict key
    WriteKey,
    /// `write_value(value)`: untyped value
    WriteValue,
    /// `is_null(value_or_boundary)`
    IsNull,
    /// `is_type(value, "type")`: runtime shape test used by encode unions
    IsType,
    /// `is_kind(value_or_boundary, "kind", ...)`: wire kind test used by decode unions
    IsKind,
    /// `has_keys(fields, ["wire", ...])`: object shape test
    HasKeys,
    /// `read_scalar(value, "kind")`
    ReadScalar,
    /// `read_key(key, "kind")`
    ReadKey,
    /// `read_enum(value, "Class", "backing", [cases])`
    ReadEnum,
    /// `new_object("Class")`
    NewObject,
    NewList,
    NewDict,
    /// `parse_at(boundary)`: parse the range into a value
    ParseAt,
    /// `split_list(boundary)`: lazy list iteration source
    SplitList,
    /// `split_dict(boundary, "key kind")`: lazy dict iteration source
    SplitDict,
    /// `index_fields(boundary)`: wire name -> boundary map of an object
    IndexFields,
    /// `enter("Class")`: count one more nesting level of the class
    Enter,
    /// `leave("Class")`
    Leave,
    /// `depth_exceeded("Class", depth)`
    DepthExceeded,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Write => "write",
            Builtin::WriteScalar => "write_scalar",
            Builtin::WriteKey => "write_key",
            Builtin::WriteValue => "write_value",
            Builtin::IsNull => "is_null",
            Builtin::IsType => "is_type",
            Builtin::IsKind => "is_kind",
            Builtin::HasKeys => "has_keys",
            Builtin::ReadScalar => "read_scalar",
            Builtin::ReadKey => "read_key",
            Builtin::ReadEnum => "read_enum",
            Builtin::NewObject => "new_object",
            Builtin::NewList => "new_list",
            Builtin::NewDict => "new_dict",
            Builtin::ParseAt => "parse_at",
            Builtin::SplitList => "split_list",
            Builtin::SplitDict => "split_dict",
            Builtin::IndexFields => "index_fields",
            Builtin::Enter => "enter",
            Builtin::Leave => "leave",
            Builtin::DepthExceeded => "depth_exceeded",
        }
    }
}

/// What a call invokes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callee {
    Builtin(Builtin),
    /// Another routine of the same program
    Routine(String),
    /// Entry of the formatter table; the last argument is `$config`
    Formatter(String),
}

/// Error raised by a `throw` statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Failure {
    UnexpectedValue { expected: String },
    MaxDepthExceeded { class: String, depth: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: EmissionNode,
    pub body: Vec<EmissionNode>,
}

/// One unit of generated code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionNode {
    Literal(Literal),
    Variable(String),
    PropertyAccess {
        target: Box<EmissionNode>,
        property: String,
    },
    /// `target[index]`, or `target[]` (append) without an index
    IndexAccess {
        target: Box<EmissionNode>,
        index: Option<Box<EmissionNode>>,
    },
    Call {
        callee: Callee,
        args: Vec<EmissionNode>,
    },
    Assign {
        target: Box<EmissionNode>,
        value: Box<EmissionNode>,
    },
    /// `if` / `else if` chain with optional `else`
    If {
        branches: Vec<Branch>,
        otherwise: Option<Vec<EmissionNode>>,
    },
    Foreach {
        iterable: Box<EmissionNode>,
        key: Option<String>,
        value: String,
        body: Vec<EmissionNode>,
    },
    Sequence(Vec<EmissionNode>),
    Return(Option<Box<EmissionNode>>),
    Throw {
        failure: Failure,
        subject: Box<EmissionNode>,
    },
    /// Collect-errors block: on failure the block's output is discarded and
    /// the error recorded against `site` and the current value of `key`.
    Try {
        site: String,
        key: Option<String>,
        body: Vec<EmissionNode>,
    },
}

impl EmissionNode {
    pub fn var(name: impl Into<String>) -> Self {
        EmissionNode::Variable(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        EmissionNode::Literal(Literal::String(value.into()))
    }

    pub fn int(value: i64) -> Self {
        EmissionNode::Literal(Literal::Int(value))
    }

    pub fn builtin(builtin: Builtin, args: Vec<EmissionNode>) -> Self {
        EmissionNode::Call {
            callee: Callee::Builtin(builtin),
            args,
        }
    }

    /// `write("text")`
    pub fn write(text: impl Into<String>) -> Self {
        Self::builtin(Builtin::Write, vec![Self::string(text)])
    }

    pub fn property(target: EmissionNode, property: impl Into<String>) -> Self {
        EmissionNode::PropertyAccess {
            target: Box::new(target),
            property: property.into(),
        }
    }

    pub fn index(target: EmissionNode, index: EmissionNode) -> Self {
        EmissionNode::IndexAccess {
            target: Box::new(target),
            index: Some(Box::new(index)),
        }
    }

    pub fn append(target: EmissionNode) -> Self {
        EmissionNode::IndexAccess {
            target: Box::new(target),
            index: None,
        }
    }

    pub fn assign(target: EmissionNode, value: EmissionNode) -> Self {
        EmissionNode::Assign {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// Literal text of a `write("...")` call
    pub fn literal_write(&self) -> Option<&str> {
        match self {
            EmissionNode::Call {
                callee: Callee::Builtin(Builtin::Write),
                args,
            } => match args.as_slice() {
                [EmissionNode::Literal(Literal::String(text))] => Some(text),
                _ => None,
            },
            _ => None,
        }
    }

    /// Number of output operations in the tree
    pub fn write_count(&self) -> usize {
        let own = usize::from(matches!(
            self,
            EmissionNode::Call {
                callee: Callee::Builtin(
                    Builtin::Write | Builtin::WriteScalar | Builtin::WriteKey | Builtin::WriteValue
                ),
                ..
            }
        ));
        own + self.children().map(EmissionNode::write_count).sum::<usize>()
    }

    fn children(&self) -> Box<dyn Iterator<Item = &EmissionNode> + '_> {
        match self {
            EmissionNode::Literal(_) | EmissionNode::Variable(_) | EmissionNode::Return(None) => {
                Box::new(std::iter::empty())
            }
            EmissionNode::PropertyAccess { target, .. } => Box::new(std::iter::once(&**target)),
            EmissionNode::IndexAccess { target, index } => {
                Box::new(std::iter::once(&**target).chain(index.as_deref()))
            }
            EmissionNode::Call { args, .. } => Box::new(args.iter()),
            EmissionNode::Assign { target, value } => {
                Box::new([&**target, &**value].into_iter())
            }
            EmissionNode::If { branches, otherwise } => Box::new(
                branches
                    .iter()
                    .flat_map(|b| std::iter::once(&b.condition).chain(b.body.iter()))
                    .chain(otherwise.iter().flatten()),
            ),
            EmissionNode::Foreach { iterable, body, .. } => {
                Box::new(std::iter::once(&**iterable).chain(body.iter()))
            }
            EmissionNode::Sequence(nodes) | EmissionNode::Try { body: nodes, .. } => {
                Box::new(nodes.iter())
            }
            EmissionNode::Return(Some(value)) => Box::new(std::iter::once(&**value)),
            EmissionNode::Throw { subject, .. } => Box::new(std::iter::once(&**subject)),
        }
    }
}

/// One generated function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<EmissionNode>,
}

impl Routine {
    pub fn write_count(&self) -> usize {
        self.body.iter().map(EmissionNode::write_count).sum()
    }
}

/// A complete template: the entry routine plus one routine per object type
/// reached through a ghost edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub ty: Type,
    pub direction: Direction,
    pub flavor: Flavor,
    pub strategy: Strategy,
    pub entry: Routine,
    #[serde(default)]
    pub routines: Vec<Routine>,
}

impl Program {
    pub fn routine(&self, name: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.name == name)
    }

    pub fn write_count(&self) -> usize {
        self.entry.write_count() + self.routines.iter().map(Routine::write_count).sum::<usize>()
    }
}
