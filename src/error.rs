//! Error types for schema declaration, loading and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building, addressing or rendering schemas.
///
/// These are contract violations: they are returned at the point of the
/// violation and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A value of an incompatible shape was supplied where a schema,
    /// pointer or container member was expected.
    #[error("wrong type: {message}")]
    WrongType { message: String },

    /// A declaration argument failed its shape, type or range check.
    #[error("invalid schema property value: {message}")]
    InvalidPropertyValue { message: String },

    /// A structural precondition of an operation was violated.
    #[error("bad argument: {message}")]
    BadArgument { message: String },

    /// A mutation was attempted on a frozen schema or container.
    #[error("cannot modify a frozen {what}")]
    Frozen { what: &'static str },

    /// A key outside the canonical draft-07 keyword table.
    #[error("not a valid schema key: {key}")]
    UnknownKeyword { key: String },
}

impl SchemaError {
    pub(crate) fn wrong_type(message: impl Into<String>) -> Self {
        Self::WrongType {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidPropertyValue {
            message: message.into(),
        }
    }

    pub(crate) fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument {
            message: message.into(),
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while reading schema files from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    InvalidYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            LoadError::Schema(e) => e.exit_code(),
            _ => 2,
        }
    }
}

/// Errors during instance validation against a rendered schema.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{feature} support is not available: rebuild with the `{feature}` feature")]
    Unavailable { feature: &'static str },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<ValidationIssue> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Schema(e) => e.exit_code(),
            ValidateError::Load(e) => e.exit_code(),
            #[cfg(feature = "remote")]
            ValidateError::NetworkError { .. } => 3,
            ValidateError::Invalid { .. } => 1,
            _ => 2,
        }
    }
}

/// Single validation failure with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationIssue {
    /// JSON Pointer (RFC 6901) to the invalid part of the instance.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
