//! Canonical CBOR decoder.

use crate::error::{CodecError, CodecResult};
use crate::value::{Document, Value};
use std::cmp::Ordering;

/// Decode a value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid canonical CBOR, contain
/// forbidden constructs (NaN, short floats, indefinite-length, non-text
/// map keys), or have bytes left over after the value.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = CanonicalDecoder::new(bytes);
    let value = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            count: decoder.remaining().len(),
        });
    }
    Ok(value)
}

/// A canonical CBOR decoder.
///
/// This decoder validates that input follows canonical CBOR rules
/// and rejects forbidden constructs.
pub struct CanonicalDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

/// Maximum allowed element count for arrays and maps.
const MAX_CONTAINER_ELEMENTS: u64 = 16 * 1024 * 1024;

/// Maximum allowed byte/string length.
const MAX_BYTES_LENGTH: u64 = 256 * 1024 * 1024;

impl<'a> CanonicalDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> CodecResult<Value> {
        let initial_byte = self.read_byte()?;
        let major_type = initial_byte >> 5;
        let additional_info = initial_byte & 0x1f;

        match major_type {
            0 => {
                let n = self.decode_unsigned(additional_info)?;
                i64::try_from(n)
                    .map(Value::Integer)
                    .map_err(|_| CodecError::invalid_structure("integer exceeds i64 range"))
            }
            1 => {
                let n = self.decode_unsigned(additional_info)?;
                i64::try_from(n)
                    .map(|n| Value::Integer(-n - 1))
                    .map_err(|_| CodecError::invalid_structure("integer exceeds i64 range"))
            }
            2 => {
                let bytes = self.decode_length_prefixed(additional_info)?;
                Ok(Value::Bytes(bytes.to_vec()))
            }
            3 => {
                let bytes = self.decode_length_prefixed(additional_info)?;
                let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
                Ok(Value::Text(text.to_string()))
            }
            4 => self.decode_array(additional_info),
            5 => self.decode_document(additional_info),
            6 => {
                // Tagged value: the tag carries no meaning for documents
                let _tag = self.decode_unsigned(additional_info)?;
                self.decode()
            }
            7 => self.decode_simple(additional_info),
            _ => Err(CodecError::invalid_structure("invalid major type")),
        }
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(CodecError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    fn decode_unsigned(&mut self, additional_info: u8) -> CodecResult<u64> {
        let non_canonical =
            || CodecError::invalid_structure("non-canonical: value could be encoded in fewer bytes");

        match additional_info {
            0..=23 => Ok(u64::from(additional_info)),
            24 => {
                let byte = self.read_byte()?;
                if byte < 24 {
                    return Err(non_canonical());
                }
                Ok(u64::from(byte))
            }
            25 => {
                let bytes = self.read_bytes(2)?;
                let value = u16::from_be_bytes([bytes[0], bytes[1]]);
                if u8::try_from(value).is_ok() {
                    return Err(non_canonical());
                }
                Ok(u64::from(value))
            }
            26 => {
                let bytes = self.read_bytes(4)?;
                let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                if u16::try_from(value).is_ok() {
                    return Err(non_canonical());
                }
                Ok(u64::from(value))
            }
            27 => {
                let bytes = self.read_bytes(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                let value = u64::from_be_bytes(raw);
                if u32::try_from(value).is_ok() {
                    return Err(non_canonical());
                }
                Ok(value)
            }
            31 => Err(CodecError::IndefiniteLengthForbidden),
            _ => Err(CodecError::invalid_structure("reserved additional info")),
        }
    }

    fn decode_length(&mut self, additional_info: u8, max_allowed: u64) -> CodecResult<usize> {
        let claimed = self.decode_unsigned(additional_info)?;
        if claimed > max_allowed {
            return Err(CodecError::SizeLimitExceeded {
                claimed,
                max_allowed,
            });
        }
        usize::try_from(claimed).map_err(|_| CodecError::SizeLimitExceeded {
            claimed,
            max_allowed,
        })
    }

    fn decode_length_prefixed(&mut self, additional_info: u8) -> CodecResult<&'a [u8]> {
        let len = self.decode_length(additional_info, MAX_BYTES_LENGTH)?;
        self.read_bytes(len)
    }

    fn decode_array(&mut self, additional_info: u8) -> CodecResult<Value> {
        let len = self.decode_length(additional_info, MAX_CONTAINER_ELEMENTS)?;
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(self.decode()?);
        }
        Ok(Value::Array(items))
    }

    fn decode_document(&mut self, additional_info: u8) -> CodecResult<Value> {
        let len = self.decode_length(additional_info, MAX_CONTAINER_ELEMENTS)?;
        let data = self.data;
        let mut doc = Document::new();
        let mut prev_key_bytes: Option<&'a [u8]> = None;

        for _ in 0..len {
            let key_start = self.pos;
            let key = match self.decode()? {
                Value::Text(key) => key,
                other => {
                    return Err(CodecError::invalid_structure(format!(
                        "document keys must be text, found {}",
                        other.kind()
                    )))
                }
            };
            let key_bytes = &data[key_start..self.pos];

            // Keys must be strictly increasing, which also rules out duplicates
            if let Some(prev) = prev_key_bytes {
                if compare_cbor_bytes(prev, key_bytes) != Ordering::Less {
                    return Err(CodecError::invalid_structure(
                        "non-canonical: map keys not in sorted order",
                    ));
                }
            }
            prev_key_bytes = Some(key_bytes);

            let value = self.decode()?;
            doc.insert(key, value);
        }

        Ok(Value::Document(doc))
    }

    fn decode_simple(&mut self, additional_info: u8) -> CodecResult<Value> {
        match additional_info {
            20 => Ok(Value::Bool(false)),
            21 => Ok(Value::Bool(true)),
            // undefined reads as null
            22 | 23 => Ok(Value::Null),
            25 | 26 => Err(CodecError::NonCanonicalFloat),
            27 => {
                let bytes = self.read_bytes(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                let f = f64::from_be_bytes(raw);
                if f.is_nan() {
                    return Err(CodecError::NaNForbidden);
                }
                Ok(Value::Float(f))
            }
            31 => Err(CodecError::invalid_structure("break without indefinite")),
            _ => Err(CodecError::unsupported_type(format!(
                "simple value {additional_info}"
            ))),
        }
    }
}

/// Compare two CBOR byte sequences for canonical ordering.
fn compare_cbor_bytes(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::to_canonical_cbor;

    #[test]
    fn decode_integers() {
        assert_eq!(from_cbor(&[0x00]).unwrap(), Value::Integer(0));
        assert_eq!(from_cbor(&[0x18, 24]).unwrap(), Value::Integer(24));
        assert_eq!(from_cbor(&[0x38, 99]).unwrap(), Value::Integer(-100));
    }

    #[test]
    fn reject_non_shortest_integer() {
        let err = from_cbor(&[0x18, 5]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidStructure { .. }));
    }

    #[test]
    fn reject_short_floats() {
        assert_eq!(
            from_cbor(&[0xf9, 0x3c, 0x00]),
            Err(CodecError::NonCanonicalFloat)
        );
    }

    #[test]
    fn reject_nan() {
        let mut bytes = vec![0xfb];
        bytes.extend_from_slice(&f64::NAN.to_be_bytes());
        assert_eq!(from_cbor(&bytes), Err(CodecError::NaNForbidden));
    }

    #[test]
    fn reject_unsorted_keys() {
        // {"b": 1, "a": 2}
        let bytes = [0xa2, 0x61, b'b', 0x01, 0x61, b'a', 0x02];
        assert!(matches!(
            from_cbor(&bytes),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn reject_integer_keys() {
        // {1: 1}
        assert!(matches!(
            from_cbor(&[0xa1, 0x01, 0x01]),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn reject_indefinite_length() {
        assert_eq!(
            from_cbor(&[0x9f, 0x01, 0xff]),
            Err(CodecError::IndefiniteLengthForbidden)
        );
    }

    #[test]
    fn reject_truncated_input() {
        assert_eq!(from_cbor(&[0x62, b'a']), Err(CodecError::UnexpectedEof));
    }

    #[test]
    fn reject_trailing_bytes() {
        assert_eq!(
            from_cbor(&[0x01, 0x02]),
            Err(CodecError::TrailingBytes { count: 1 })
        );
    }

    #[test]
    fn decode_nested_document() {
        let value = Value::document([
            ("name", Value::from("Alice")),
            ("score", Value::Float(-2.25)),
            (
                "tags",
                Value::Array(vec![Value::from("x"), Value::Null, Value::Bool(true)]),
            ),
            ("blob", Value::Bytes(vec![0, 1, 2])),
            ("inner", Value::document([("n", Value::Integer(i64::MIN))])),
        ]);
        let bytes = to_canonical_cbor(&value).unwrap();
        assert_eq!(from_cbor(&bytes).unwrap(), value);
    }
}
