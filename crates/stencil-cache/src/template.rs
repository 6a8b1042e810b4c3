//! Generated template files

use crate::key::CacheKey;
use serde::{Deserialize, Serialize};
use stencil_codegen::Program;
use stencil_core::{Config, MetadataLoader, StencilError, StencilResult};

/// A generated template: its key, readable source and executable program.
///
/// Serialized as pretty JSON so the same inputs always produce the same
/// bytes on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub key: CacheKey,
    pub source: String,
    pub program: Program,
}

impl Template {
    /// Compile the template for `key`
    pub fn generate(
        key: &CacheKey,
        loader: &dyn MetadataLoader,
        config: &Config,
    ) -> StencilResult<Self> {
        if key.format != stencil_json::FORMAT {
            return Err(StencilError::UnsupportedFormat(key.format.clone()));
        }
        let program = stencil_codegen::compile(
            &key.ty,
            key.direction,
            key.flavor,
            key.strategy,
            loader,
            config,
        )?;
        let source = stencil_codegen::render(&program);
        Ok(Self {
            key: key.clone(),
            source,
            program,
        })
    }

    pub fn to_bytes(&self) -> StencilResult<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> StencilResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
#[path = "template/template_tests.rs"]
mod template_tests;
