//! stencil-core - Type model, values, configuration and errors
//!
//! This crate provides the vocabulary shared by every stencil crate:
//! - [`Type`] describing the static shape of a value
//! - [`Value`] the in-memory representation templates read and build
//! - [`Config`] threaded through model building and template execution
//! - [`MetadataLoader`] and the in-memory [`ClassRegistry`] implementation
//! - [`Formatters`] the callable table generated code refers to by name
//! - [`StencilError`] for error handling

mod config;
mod error;
mod formatter;
mod metadata;
mod mode;
mod registry;
mod types;
mod value;

pub use config::{Config, JsonFlags};
pub use error::{StencilError, StencilResult};
pub use formatter::{FormatterFn, Formatters};
pub use metadata::{FieldMetadata, MaxDepth, MetadataLoader, Overflow};
pub use mode::{Direction, Flavor, Strategy};
pub use registry::{ClassDef, ClassRegistry, EnumDef, FieldDef, Schema};
pub use types::{ScalarKind, Type};
pub use value::{Key, Object, Value};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ClassRegistry, Config, Direction, FieldMetadata, Flavor, Formatters, Key, MetadataLoader,
        Object, ScalarKind, StencilError, StencilResult, Strategy, Type, Value,
    };
}
