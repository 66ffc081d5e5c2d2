//! Error types for form configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or checking a form configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// Configuration file could not be read.
    #[error("failed to read form configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration text is not valid TOML/JSON for a form.
    #[error("failed to parse form configuration {origin}: {message}")]
    Parse { origin: String, message: String },

    /// Two screens share an id.
    #[error("duplicate screen id '{id}'")]
    DuplicateScreen { id: String },

    /// A field or rule declaration is inconsistent.
    #[error("invalid field '{field}' on screen '{screen}': {reason}")]
    InvalidField {
        screen: String,
        field: String,
        reason: String,
    },
}

/// Result type for form configuration operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
