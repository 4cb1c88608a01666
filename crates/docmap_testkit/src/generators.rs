//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random records that maintain the
//! invariants the diff engine and aggregation helper rely on: field names
//! never contain `.` and never look like array indices.

use docmap_codec::{Document, Value};
use docmap_core::ObjectId;
use proptest::prelude::*;

/// Strategy for generating object IDs.
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    prop::array::uniform16(any::<u8>()).prop_map(ObjectId::from_bytes)
}

/// Strategy for generating field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,7}").expect("Invalid regex")
}

/// Strategy for generating non-null scalar values.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e6..1.0e6f64).prop_map(Value::Float),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Strategy for generating values nested up to `depth` levels.
///
/// With `nulls`, `null` appears both as a field value and as an array
/// element.
pub fn value_strategy(depth: u32, nulls: bool) -> BoxedStrategy<Value> {
    let leaf = if nulls {
        prop_oneof![1 => Just(Value::Null), 6 => scalar_strategy()].boxed()
    } else {
        scalar_strategy().boxed()
    };
    leaf.prop_recursive(depth, 64, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name_strategy(), inner, 0..4)
                .prop_map(Value::Document),
        ]
    })
    .boxed()
}

/// Strategy for generating records, `null` values included.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(field_name_strategy(), value_strategy(3, true), 0..6)
}

/// Strategy for generating records without any `null`.
///
/// A `null` field in a new record is diffed as a removal, so round-trip
/// properties use records without them.
pub fn null_free_document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(field_name_strategy(), value_strategy(3, false), 0..6)
}

/// An edit turning one record into a related one.
#[derive(Debug, Clone)]
pub enum DocumentEdit {
    /// Set a top-level field.
    Set {
        /// Field name.
        field: String,
        /// New value.
        value: Value,
    },
    /// Remove a top-level field.
    Remove {
        /// Field name.
        field: String,
    },
    /// Append to an array field, creating it if needed.
    Append {
        /// Field name.
        field: String,
        /// Appended value.
        value: Value,
    },
    /// Drop the last element of an array field.
    Truncate {
        /// Field name.
        field: String,
    },
}

impl DocumentEdit {
    /// Applies the edit to a record.
    pub fn apply(&self, doc: &mut Document) {
        match self {
            DocumentEdit::Set { field, value } => {
                doc.insert(field.clone(), value.clone());
            }
            DocumentEdit::Remove { field } => {
                doc.remove(field);
            }
            DocumentEdit::Append { field, value } => {
                let entry = doc
                    .entry(field.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match entry.as_array_mut() {
                    Some(items) => items.push(value.clone()),
                    None => *entry = Value::Array(vec![value.clone()]),
                }
            }
            DocumentEdit::Truncate { field } => {
                if let Some(items) = doc.get_mut(field).and_then(Value::as_array_mut) {
                    items.pop();
                }
            }
        }
    }
}

/// Strategy for generating null-free edits.
pub fn edit_strategy() -> impl Strategy<Value = DocumentEdit> {
    prop_oneof![
        3 => (field_name_strategy(), value_strategy(2, false))
            .prop_map(|(field, value)| DocumentEdit::Set { field, value }),
        1 => field_name_strategy().prop_map(|field| DocumentEdit::Remove { field }),
        2 => (field_name_strategy(), scalar_strategy())
            .prop_map(|(field, value)| DocumentEdit::Append { field, value }),
        1 => field_name_strategy().prop_map(|field| DocumentEdit::Truncate { field }),
    ]
}

/// Strategy for generating a record and an edited copy of it.
pub fn edited_pair_strategy() -> impl Strategy<Value = (Document, Document)> {
    (
        null_free_document_strategy(),
        prop::collection::vec(edit_strategy(), 0..6),
    )
        .prop_map(|(old, edits)| {
            let mut new = old.clone();
            for edit in &edits {
                edit.apply(&mut new);
            }
            (old, new)
        })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
