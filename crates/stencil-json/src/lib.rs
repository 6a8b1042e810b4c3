//! stencil-json - JSON format support
//!
//! This crate provides:
//! - [`Lexer`] tokenizing a byte range of a resource into `(token, offset)` pairs
//! - [`ListSplit`] and [`DictSplit`] yielding top-level element boundaries
//!   without descending into nested containers, and [`SplitCursor`] for
//!   stepping through them while reading other ranges of the same resource
//! - [`parse_value`] and [`parse_at`] building a [`Value`](stencil_core::Value)
//!   tree from tokens
//! - [`write_scalar`], [`write_key`] and [`write_value`] producing JSON text

mod lexer;
mod parse;
mod splitter;
mod writer;

pub use lexer::{Lexer, Token, tokens};
pub use parse::{MAX_NESTING, parse_at, parse_key, parse_value, scalar_from_token};
pub use splitter::{Boundary, DictSplit, ListSplit, SplitCursor, read_range, split_dict, split_list};
pub use writer::{write_key, write_scalar, write_value};

/// Format name used in cache keys
pub const FORMAT: &str = "json";
