//! # DocMap Codec
//!
//! Document value model and canonical CBOR encoding for DocMap.
//!
//! This crate provides:
//! - [`Value`] and [`Document`], the serialized form of a mapped object
//! - Deterministic CBOR encoding, so identical documents produce identical bytes
//! - `serde` support for reading and writing documents as JSON
//!
//! ## Canonical CBOR Rules
//!
//! - Map keys are text and sorted by encoded form (length first, then bytewise)
//! - Integers use shortest encoding
//! - Floats always use the 64-bit form; NaN is rejected
//! - No indefinite-length items
//!
//! ## Usage
//!
//! ```
//! use docmap_codec::{to_canonical_cbor, from_cbor, Value};
//!
//! let value = Value::document([("count", Value::Integer(42))]);
//! let bytes = to_canonical_cbor(&value).unwrap();
//!
//! let decoded = from_cbor(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::{Document, Value, ValueKind};

/// Trait for types that can be encoded to canonical CBOR.
pub trait Encode {
    /// Encode this value to canonical CBOR bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from CBOR.
pub trait Decode: Sized {
    /// Decode this value from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_canonical_cbor(self)
    }
}

impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}

impl Encode for Document {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut encoder = CanonicalEncoder::new();
        encoder.encode_document(self)?;
        Ok(encoder.into_bytes())
    }
}

impl Decode for Document {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        match from_cbor(bytes)? {
            Value::Document(doc) => Ok(doc),
            other => Err(CodecError::invalid_structure(format!(
                "expected document, found {}",
                other.kind()
            ))),
        }
    }
}
