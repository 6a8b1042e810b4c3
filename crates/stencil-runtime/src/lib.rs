//! stencil-runtime - Template execution
//!
//! This crate provides:
//! - [`Machine`] executing a generated [`Program`](stencil_codegen::Program)
//!   against in-memory values, output sinks and seekable input resources
//! - [`Decoded`] and [`ElementError`] reporting decode results and the
//!   element failures recorded in collect-errors mode
//! - [`Slot`] the content of one template variable

mod builtins;
mod machine;
mod slot;

pub use machine::{Decoded, ElementError, Machine, Resource};
pub use slot::{Slot, key_value, value_key};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Decoded, ElementError, Machine, Resource};
}
