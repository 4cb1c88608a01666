//! Desired field states handed to the diff engine.

use crate::update::statement::{Number, UpdateOperator};
use docmap_codec::{Document, Value};
use std::collections::BTreeMap;

/// What the caller wants a field to become.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Replace the stored value (arrays are still diffed element-wise).
    Replace(Value),
    /// Add a delta atomically instead of overwriting.
    Increment(Number),
    /// Diff a nested document field by field.
    Nested(TargetDocument),
}

impl Target {
    /// The value this target leaves behind when nothing was stored before.
    ///
    /// Increments of a missing field start from zero.
    pub fn to_value(&self) -> Value {
        match self {
            Target::Replace(value) => value.clone(),
            Target::Increment(delta) => delta.to_value(),
            Target::Nested(doc) => doc.to_value(),
        }
    }
}

impl From<Value> for Target {
    fn from(value: Value) -> Self {
        match value {
            Value::Document(doc) => Target::Nested(TargetDocument::from(doc)),
            other => Target::Replace(other),
        }
    }
}

impl From<Number> for Target {
    fn from(delta: Number) -> Self {
        Target::Increment(delta)
    }
}

/// The new state of a document, as a tree of [`Target`]s.
///
/// Built from a serialized record with [`From`], or by hand when a caller
/// wants increments:
///
/// ```
/// use docmap_core::{Target, TargetDocument};
/// use docmap_codec::Value;
///
/// let new = TargetDocument::new()
///     .replace("title", Value::from("Draft"))
///     .increment("revision", 1);
/// assert!(matches!(new.get("revision"), Some(Target::Increment(_))));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetDocument(BTreeMap<String, Target>);

impl TargetDocument {
    /// Creates an empty target document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a record, reading single-key `{"$inc": n}` documents as increments.
    ///
    /// Any other `$`-prefixed key is kept as an ordinary nested document.
    pub fn with_operators(record: &Document) -> Self {
        let fields = record
            .iter()
            .map(|(key, value)| {
                let target = match value {
                    Value::Document(inner) => match Self::increment_marker(inner) {
                        Some(delta) => Target::Increment(delta),
                        None => Target::Nested(Self::with_operators(inner)),
                    },
                    other => Target::Replace(other.clone()),
                };
                (key.clone(), target)
            })
            .collect();
        Self(fields)
    }

    fn increment_marker(doc: &Document) -> Option<Number> {
        if doc.len() != 1 {
            return None;
        }
        doc.get(UpdateOperator::Inc.as_str())
            .and_then(Number::from_value)
    }

    /// Adds a field target.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, target: Target) -> Self {
        self.insert(key, target);
        self
    }

    /// Adds a replacement target.
    #[must_use]
    pub fn replace(self, key: impl Into<String>, value: Value) -> Self {
        self.with(key, Target::Replace(value))
    }

    /// Adds an increment target.
    #[must_use]
    pub fn increment(self, key: impl Into<String>, delta: impl Into<Number>) -> Self {
        self.with(key, Target::Increment(delta.into()))
    }

    /// Adds a nested document target.
    #[must_use]
    pub fn nested(self, key: impl Into<String>, doc: TargetDocument) -> Self {
        self.with(key, Target::Nested(doc))
    }

    /// Inserts or replaces a field target.
    pub fn insert(&mut self, key: impl Into<String>, target: Target) {
        self.0.insert(key.into(), target);
    }

    /// Looks up a field target.
    pub fn get(&self, key: &str) -> Option<&Target> {
        self.0.get(key)
    }

    /// Iterates over field targets in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Target)> {
        self.0.iter().map(|(k, t)| (k.as_str(), t))
    }

    /// Returns true if a field is targeted.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of targeted fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no field is targeted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Removes a field target.
    pub fn remove(&mut self, key: &str) -> Option<Target> {
        self.0.remove(key)
    }

    /// The record these targets produce on an empty starting point.
    pub fn to_document(&self) -> Document {
        self.0
            .iter()
            .map(|(k, t)| (k.clone(), t.to_value()))
            .collect()
    }

    /// Same as [`TargetDocument::to_document`], wrapped as a value.
    pub fn to_value(&self) -> Value {
        Value::Document(self.to_document())
    }
}

impl From<Document> for TargetDocument {
    fn from(record: Document) -> Self {
        Self(
            record
                .into_iter()
                .map(|(k, v)| (k, Target::from(v)))
                .collect(),
        )
    }
}

impl From<&Document> for TargetDocument {
    fn from(record: &Document) -> Self {
        Self::from(record.clone())
    }
}
