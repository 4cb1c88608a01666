//! Error types for DocMap core.

use docmap_codec::ValueKind;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in DocMap core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] docmap_codec::CodecError),

    /// The same path is an array on one side and a document on the other.
    #[error("shape conflict at '{path}': {old} in snapshot, {new} in current state")]
    ShapeConflict {
        /// Dotted path of the conflicting field.
        path: String,
        /// Shape in the old record.
        old: ValueKind,
        /// Shape in the new record.
        new: ValueKind,
    },

    /// Record nesting exceeds the configured maximum depth.
    #[error("nesting depth exceeds {max_depth} at '{path}'")]
    DepthExceeded {
        /// Dotted path where the limit was hit.
        path: String,
        /// Configured limit.
        max_depth: usize,
    },

    /// A dotted path cannot be resolved against a document.
    #[error("invalid path '{path}': {message}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why it cannot be resolved.
        message: String,
    },

    /// An operation met a value of the wrong type.
    #[error("type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Dotted path of the value.
        path: String,
        /// What the operation needed.
        expected: &'static str,
        /// What was there.
        found: ValueKind,
    },

    /// An encoded update statement is malformed.
    #[error("invalid update statement: {message}")]
    InvalidStatement {
        /// Description of the problem.
        message: String,
    },

    /// No metadata registered for a collection.
    #[error("unknown collection: {name}")]
    UnknownCollection {
        /// Collection name.
        name: String,
    },

    /// The store holds no document for an object.
    #[error("object not found: {id} in collection {collection}")]
    ObjectNotFound {
        /// Collection searched.
        collection: String,
        /// Object identifier.
        id: String,
    },

    /// The object is not tracked by the unit of work.
    #[error("object {id} is not managed")]
    NotManaged {
        /// Object identifier.
        id: String,
    },

    /// The store did not acknowledge a write.
    #[error("write to {collection} for object {id} was not acknowledged")]
    WriteNotAcknowledged {
        /// Collection written to.
        collection: String,
        /// Object identifier.
        id: String,
    },

    /// Converting between an object and its record failed.
    #[error("mapping failed: {message}")]
    Mapping {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates a shape conflict error.
    pub fn shape_conflict(path: impl Into<String>, old: ValueKind, new: ValueKind) -> Self {
        Self::ShapeConflict {
            path: path.into(),
            old,
            new,
        }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(path: impl Into<String>, expected: &'static str, found: ValueKind) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected,
            found,
        }
    }

    /// Creates an invalid statement error.
    pub fn invalid_statement(message: impl Into<String>) -> Self {
        Self::InvalidStatement {
            message: message.into(),
        }
    }

    /// Creates a mapping error.
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }
}
