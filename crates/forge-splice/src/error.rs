//! Error types for forge-splice
//!
//! Generation errors are fatal for the whole batch: a domain is either
//! emitted completely or not at all.

use crate::ir::ModuleValidationError;
use thiserror::Error;

/// Result type for forge-splice operations
pub type SpliceResult<T> = Result<T, SpliceError>;

/// Main error type for forge-splice
#[derive(Debug, Error)]
pub enum SpliceError {
    /// A located callback fragment (or one of its parameters) does not match
    /// the declaration grammar
    #[error("Failed to parse declaration `{declaration}`: {message}")]
    DeclParse { declaration: String, message: String },

    /// A C type has no entry in the type table
    #[error("No type mapping for `{ty}` in declaration `{declaration}`")]
    TypeMapping { declaration: String, ty: String },

    /// Generated symbols of a domain collide
    #[error("Invalid bindings for `{domain}`: {source}")]
    Validation {
        domain: String,
        #[source]
        source: ModuleValidationError,
    },

    /// Configuration could not be read
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SpliceError {
    /// Create a declaration parse error
    pub fn decl_parse(declaration: impl Into<String>, message: impl Into<String>) -> Self {
        SpliceError::DeclParse {
            declaration: declaration.into(),
            message: message.into(),
        }
    }

    /// Create a type mapping error
    pub fn type_mapping(declaration: impl Into<String>, ty: impl ToString) -> Self {
        SpliceError::TypeMapping {
            declaration: declaration.into(),
            ty: ty.to_string(),
        }
    }

    /// Name of the declaration the error is attributed to, if any
    pub fn declaration(&self) -> Option<&str> {
        match self {
            SpliceError::DeclParse { declaration, .. }
            | SpliceError::TypeMapping { declaration, .. } => Some(declaration),
            SpliceError::Validation { .. }
            | SpliceError::Config(_)
            | SpliceError::Serialization(_) => None,
        }
    }
}
