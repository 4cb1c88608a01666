//! Diff test vectors for DocMap.
//!
//! Each vector pairs two records with the update they must produce, both as
//! update-protocol JSON and as canonical CBOR, so other implementations of
//! the store protocol can check against the same cases.

use docmap_codec::{Document, Value};
use docmap_core::{CoreError, CoreResult, DiffEngine, TargetDocument, UpdateStatement};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A diff case that can be shared across implementations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Snapshot record, or `None` when there is no snapshot.
    pub old: Option<serde_json::Value>,
    /// Current record.
    pub new: serde_json::Value,
    /// Whether `{"$inc": n}` objects in `new` are increments.
    #[serde(default)]
    pub operators: bool,
    /// Expected update in update-protocol form.
    pub expected_update: serde_json::Value,
    /// Expected canonical CBOR of the update (hex-encoded).
    pub expected_hex: String,
}

impl DiffVector {
    /// Runs the vector through the default diff engine.
    pub fn compute(&self) -> CoreResult<UpdateStatement> {
        let old = self.old.as_ref().map(to_document).transpose()?;
        let new = to_document(&self.new)?;
        let target = if self.operators {
            TargetDocument::with_operators(&new)
        } else {
            TargetDocument::from(new)
        };
        DiffEngine::default().compute_update(old.as_ref(), &target)
    }
}

fn to_document(json: &serde_json::Value) -> CoreResult<Document> {
    match serde_json::from_value::<Value>(json.clone()) {
        Ok(Value::Document(doc)) => Ok(doc),
        Ok(other) => Err(CoreError::mapping(format!(
            "vector record is a {}, expected a document",
            other.kind()
        ))),
        Err(e) => Err(CoreError::mapping(e.to_string())),
    }
}

fn vector(
    id: &str,
    description: &str,
    old: Option<serde_json::Value>,
    new: serde_json::Value,
    expected_update: serde_json::Value,
    expected_hex: &str,
) -> DiffVector {
    DiffVector {
        id: id.into(),
        description: description.into(),
        old,
        new,
        operators: false,
        expected_update,
        expected_hex: expected_hex.into(),
    }
}

/// Diff engine test vectors.
pub fn diff_vectors() -> Vec<DiffVector> {
    use serde_json::json;

    let mut increment = vector(
        "increment",
        "An increment marker on a missing field",
        Some(json!({})),
        json!({"a": {"$inc": 5}}),
        json!({"$inc": {"a": 5}}),
        "a16424696e63a1616105",
    );
    increment.operators = true;

    vec![
        vector(
            "no_change",
            "Identical records produce an empty update",
            Some(json!({"a": 1})),
            json!({"a": 1}),
            json!({}),
            "a0",
        ),
        vector(
            "field_removal",
            "A field missing from the new record is unset",
            Some(json!({"a": 1, "b": 2})),
            json!({"a": 1}),
            json!({"$unset": {"b": 1}}),
            "a16624756e736574a1616201",
        ),
        vector(
            "null_means_unset",
            "A stored field set to null is unset",
            Some(json!({"a": 1})),
            json!({"a": null}),
            json!({"$unset": {"a": 1}}),
            "a16624756e736574a1616101",
        ),
        vector(
            "array_push",
            "Appended elements become a single push",
            Some(json!({"a": [1, 2]})),
            json!({"a": [1, 2, 3]}),
            json!({"$push": {"a": {"$each": [3]}}}),
            "a1652470757368a16161a16524656163688103",
        ),
        vector(
            "array_shrink",
            "Dropped trailing elements are unset by index",
            Some(json!({"a": [1, 2, 3]})),
            json!({"a": [1, 2]}),
            json!({"$unset": {"a.2": 1}}),
            "a16624756e736574a163612e3201",
        ),
        vector(
            "nested_set",
            "A nested change is set by dotted path",
            Some(json!({"e": {"x": 1, "y": 2}})),
            json!({"e": {"x": 1, "y": 3}}),
            json!({"$set": {"e.y": 3}}),
            "a16424736574a163652e7903",
        ),
        increment,
        vector(
            "end_to_end",
            "Mixed set, unset and array shrink",
            Some(json!({"same": "v", "diff": "v", "gone": "v", "arr": [1, 2, 3]})),
            json!({"same": "v", "diff": "v2", "new": "n", "arr": [1, 2]}),
            json!({
                "$set": {"diff": "v2", "new": "n"},
                "$unset": {"arr.2": 1, "gone": 1}
            }),
            "a26424736574a2636e6577616e64646966666276326624756e736574a264676f6e6501656172722e3201",
        ),
        vector(
            "no_snapshot",
            "Without a snapshot every leaf is set",
            None,
            json!({"a": {"b": "x"}}),
            json!({"$set": {"a.b": "x"}}),
            "a16424736574a163612e626178",
        ),
    ]
}

/// Returns all vectors as JSON.
pub fn all_vectors_json() -> String {
    serde_json::to_string_pretty(&diff_vectors()).unwrap_or_default()
}

/// Encodes bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Decodes hex text, returning `None` on malformed input.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}
