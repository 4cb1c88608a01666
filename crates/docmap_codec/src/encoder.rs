//! Canonical CBOR encoder.

use crate::error::{CodecError, CodecResult};
use crate::value::{Document, Value};

/// Encode a value to canonical CBOR bytes.
///
/// Output is deterministic, following RFC 8949 Section 4.2.1:
/// - Map keys are sorted by their encoded form (length-first, then bytewise)
/// - Integers use the shortest possible encoding
/// - Floats always use the 64-bit form
/// - No indefinite-length encoding
///
/// # Errors
///
/// Returns an error if the value contains a NaN float.
pub fn to_canonical_cbor(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// A canonical CBOR encoder.
pub struct CanonicalEncoder {
    buffer: Vec<u8>,
}

impl CanonicalEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a value.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => self.buffer.push(0xf6),
            Value::Bool(b) => self.buffer.push(if *b { 0xf5 } else { 0xf4 }),
            Value::Integer(n) => self.encode_integer(*n),
            Value::Float(f) => self.encode_float(*f)?,
            Value::Text(s) => self.encode_text(s),
            Value::Bytes(b) => {
                self.encode_unsigned(2, b.len() as u64);
                self.buffer.extend_from_slice(b);
            }
            Value::Array(items) => {
                self.encode_unsigned(4, items.len() as u64);
                for item in items {
                    self.encode(item)?;
                }
            }
            Value::Document(doc) => self.encode_document(doc)?,
        }
        Ok(())
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    #[allow(clippy::cast_sign_loss)]
    fn encode_integer(&mut self, n: i64) {
        if n >= 0 {
            self.encode_unsigned(0, n as u64);
        } else {
            // -(n+1) is in [0, 2^63-1] for every negative i64
            self.encode_unsigned(1, (-(n + 1)) as u64);
        }
    }

    fn encode_float(&mut self, f: f64) -> CodecResult<()> {
        if f.is_nan() {
            return Err(CodecError::NaNForbidden);
        }
        self.buffer.push(0xfb);
        self.buffer.extend_from_slice(&f.to_be_bytes());
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_unsigned(&mut self, major_type: u8, value: u64) {
        let mt = major_type << 5;

        if value < 24 {
            self.buffer.push(mt | (value as u8));
        } else if u8::try_from(value).is_ok() {
            self.buffer.push(mt | 24);
            self.buffer.push(value as u8);
        } else if u16::try_from(value).is_ok() {
            self.buffer.push(mt | 25);
            self.buffer.extend_from_slice(&(value as u16).to_be_bytes());
        } else if u32::try_from(value).is_ok() {
            self.buffer.push(mt | 26);
            self.buffer.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buffer.push(mt | 27);
            self.buffer.extend_from_slice(&value.to_be_bytes());
        }
    }

    fn encode_text(&mut self, text: &str) {
        self.encode_unsigned(3, text.len() as u64);
        self.buffer.extend_from_slice(text.as_bytes());
    }

    /// Encode a document without wrapping it in a [`Value`].
    pub fn encode_document(&mut self, doc: &Document) -> CodecResult<()> {
        // Text keys share a major type, so encoded-form order is
        // byte length first, then bytewise.
        let mut entries: Vec<(&String, &Value)> = doc.iter().collect();
        entries.sort_by(|a, b| {
            a.0.len()
                .cmp(&b.0.len())
                .then_with(|| a.0.as_bytes().cmp(b.0.as_bytes()))
        });

        self.encode_unsigned(5, entries.len() as u64);
        for (key, value) in entries {
            self.encode_text(key);
            self.encode(value)?;
        }
        Ok(())
    }
}

impl Default for CanonicalEncoder {
    fn default() -> Self {
        Self::new()
    }
}
