//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// NaN values are forbidden.
    #[error("NaN values are forbidden")]
    NaNForbidden,

    /// Floats must use the 64-bit encoding.
    #[error("non-canonical float: only 64-bit floats are accepted")]
    NonCanonicalFloat,

    /// Indefinite-length items are forbidden.
    #[error("indefinite-length items are forbidden")]
    IndefiniteLengthForbidden,

    /// Invalid UTF-8 string.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Bytes left over after the top-level value.
    #[error("{count} trailing bytes after value")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },

    /// Invalid CBOR structure.
    #[error("invalid CBOR structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// Unsupported CBOR type.
    #[error("unsupported CBOR type: {type_name}")]
    UnsupportedType {
        /// Name of the unsupported type.
        type_name: String,
    },

    /// A length prefix exceeds the decoder's allocation limit.
    #[error("size limit exceeded: claimed {claimed}, max {max_allowed}")]
    SizeLimitExceeded {
        /// Length claimed by the input.
        claimed: u64,
        /// Largest length the decoder accepts.
        max_allowed: u64,
    },
}

impl CodecError {
    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }
}
