//! stencil-cache - Template cache
//!
//! This crate provides:
//! - [`CacheKey`] identifying one generated template and naming its file
//! - [`Template`] the persisted unit: key, rendered source and program
//! - [`TemplateCache`] generating templates on a miss, writing them
//!   atomically and keeping them in memory for the process lifetime

mod key;
mod store;
mod template;

pub use key::{CacheKey, TEMPLATE_EXTENSION, compute_sha256};
pub use store::TemplateCache;
pub use template::Template;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{CacheKey, Template, TemplateCache};
}
