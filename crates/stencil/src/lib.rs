//! # stencil
//!
//! Type-driven JSON serialization through generated templates.
//!
//! Given a [`Type`] and field metadata from a [`MetadataLoader`], stencil
//! builds a data model of the conversion, lowers it to a small program,
//! merges adjacent literal writes and caches the result per type, format,
//! direction and strategy. Programs run without inspecting the value's
//! type beyond the unions the type declares.
//!
//! ## Quick Start
//!
//! ```
//! use stencil::prelude::*;
//!
//! let registry = ClassRegistry::from_toml_str(r#"
//!     [classes.User]
//!     fields = [
//!         { name = "id", type = "int" },
//!         { name = "name", type = "string", wire_name = "userName" },
//!     ]
//! "#)?;
//! let stencil = Stencil::new(registry, Formatters::with_builtins(), Config::new());
//! let ty: Type = "list<User>".parse()?;
//!
//! let users = stencil.decode_str(r#"[{"id": 1, "userName": "ada"}]"#, &ty)?;
//! assert_eq!(stencil.encode_to_string(&users, &ty)?, r#"[{"id":1,"userName":"ada"}]"#);
//! # Ok::<(), StencilError>(())
//! ```
//!
//! ## Crate Structure
//!
//! This is a facade crate that re-exports from:
//! - [`stencil_core`] - Types, values, config, metadata and errors
//! - [`stencil_json`] - Streaming lexer and boundary splitter
//! - [`stencil_codegen`] - Data model builder, lowering and optimizer
//! - [`stencil_runtime`] - Program execution
//! - [`stencil_cache`] - Template cache

mod engine;
mod stream;

pub use engine::Stencil;
pub use stream::ListStream;

// Re-export core types
pub use stencil_core::{
    ClassDef, ClassRegistry, Config, Direction, EnumDef, FieldDef, FieldMetadata, Flavor,
    Formatters, JsonFlags, Key, MetadataLoader, Object, ScalarKind, Schema, StencilError,
    StencilResult, Strategy, Type, Value,
};

pub use stencil_cache::{CacheKey, Template, TemplateCache};
pub use stencil_codegen::Program;
pub use stencil_json::Boundary;
pub use stencil_runtime::{Decoded, ElementError};

pub use stencil_cache;
pub use stencil_codegen;
pub use stencil_core;
pub use stencil_json;
pub use stencil_runtime;

/// Prelude module for convenient imports.
///
/// Use `use stencil::prelude::*;` to import commonly used types.
pub mod prelude {
    pub use crate::{
        ClassDef, ClassRegistry, Config, Decoded, Direction, FieldDef, Flavor, Formatters,
        MetadataLoader, Object, StencilError, StencilResult, Stencil, Strategy, Type, Value,
    };
}
