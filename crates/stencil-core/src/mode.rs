//! Template addressing: direction, output flavor and decode strategy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a template converts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Encode,
    Decode,
}

/// Where a template reads from or writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Materialize into an in-memory buffer
    #[default]
    String,
    /// Incremental reads/writes on a caller-provided stream
    Stream,
    /// Same as stream, on an explicit seekable handle
    Resource,
}

/// How a decode template walks its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Parse the whole input into a transient tree, then walk it
    #[default]
    Eager,
    /// Split into boundaries and parse sub-values on demand
    Lazy,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Encode => "encode",
            Direction::Decode => "decode",
        }
    }
}

impl Flavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::String => "string",
            Flavor::Stream => "stream",
            Flavor::Resource => "resource",
        }
    }
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Eager => "eager",
            Strategy::Lazy => "lazy",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
