//! Error types for colprefix.
//!
//! Rendering never fails: a model that cannot be described simply yields a
//! shorter column list. Errors only come from the edges that read text
//! supplied by a user (join directives, catalogs, config files).

use thiserror::Error;

/// The main error type for colprefix operations.
#[derive(Debug, Error)]
pub enum ColprefixError {
    /// Failed to parse a join directive list.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// A catalog lookup named a model the catalog does not define.
    #[error("Unknown model: '{0}'")]
    UnknownModel(String),

    /// Catalog models reference each other in a loop.
    #[error("Model '{0}' is part of a reference cycle")]
    CyclicModel(String),

    /// The catalog file could not be decoded.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ColprefixError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}

/// Result type alias for colprefix operations.
pub type ColprefixResult<T> = Result<T, ColprefixError>;
