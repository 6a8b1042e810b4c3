//! Error types for stencil

use thiserror::Error;

/// Result type alias for stencil operations
pub type StencilResult<T> = Result<T, StencilError>;

/// Error type for model building, code generation and template execution
#[derive(Error, Debug)]
pub enum StencilError {
    /// No builder or lowering rule exists for the type
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// The wire format is not implemented
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Union alternatives cannot be ordered for decoding
    #[error("ambiguous union {union}: cannot order {candidates:?}, supply a union selector")]
    AmbiguousUnion {
        union: String,
        candidates: Vec<String>,
    },

    /// Underlying stream could not be read or written
    #[error("resource error: {0}")]
    Resource(#[from] std::io::Error),

    /// Input bytes are not well-formed for the format
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Input is well-formed but does not fit the expected type
    #[error("unexpected value: expected {expected}, got {actual}")]
    UnexpectedValue { expected: String, actual: String },

    /// Object nesting exceeded its bound
    #[error("max depth {depth} exceeded for {class}")]
    MaxDepthExceeded { class: String, depth: usize },

    /// A formatter is missing or returned an error
    #[error("formatter {name} failed: {message}")]
    Formatter { name: String, message: String },

    /// The metadata loader has no definition for the class
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// A type string could not be parsed
    #[error("invalid type {input:?} at {position}: {message}")]
    TypeSyntax {
        input: String,
        position: usize,
        message: String,
    },

    /// Configuration or schema error
    #[error("configuration error: {0}")]
    Config(String),

    /// A generated template is invalid or could not be executed
    #[error("template error: {0}")]
    Template(String),
}

impl StencilError {
    /// Returns a stable numeric code for the error kind
    pub fn error_code(&self) -> u32 {
        match self {
            StencilError::UnsupportedType(_) => 1,
            StencilError::UnsupportedFormat(_) => 2,
            StencilError::AmbiguousUnion { .. } => 3,
            StencilError::Resource(_) => 4,
            StencilError::MalformedInput(_) => 5,
            StencilError::UnexpectedValue { .. } => 6,
            StencilError::MaxDepthExceeded { .. } => 7,
            StencilError::Formatter { .. } => 8,
            StencilError::UnknownClass(_) => 9,
            StencilError::TypeSyntax { .. } => 10,
            StencilError::Config(_) => 11,
            StencilError::Template(_) => 12,
        }
    }

    /// Shorthand for a type mismatch while decoding
    pub fn unexpected(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        StencilError::UnexpectedValue {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<serde_json::Error> for StencilError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            StencilError::Resource(err.into())
        } else {
            StencilError::MalformedInput(err.to_string())
        }
    }
}

impl From<toml::de::Error> for StencilError {
    fn from(err: toml::de::Error) -> Self {
        StencilError::Config(err.to_string())
    }
}

#[cfg(test)]
#[path = "error/error_tests.rs"]
mod error_tests;
