//! Partial update statements.

use crate::error::{CoreError, CoreResult};
use crate::path::FieldPath;
use docmap_codec::{from_cbor, to_canonical_cbor, Document, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A numeric increment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integer delta.
    Integer(i64),
    /// Float delta.
    Float(f64),
}

impl Number {
    /// Reads a number out of a value.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(n) => Some(Number::Integer(*n)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    /// Converts to a document value.
    pub fn to_value(self) -> Value {
        match self {
            Number::Integer(n) => Value::Integer(n),
            Number::Float(f) => Value::Float(f),
        }
    }

    /// Adds two numbers. Integer overflow widens to float.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => a
                .checked_add(b)
                .map_or(Number::Float(a as f64 + b as f64), Number::Integer),
            (a, b) => Number::Float(a.as_f64() + b.as_f64()),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        match self {
            Number::Integer(n) => n as f64,
            Number::Float(f) => f,
        }
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number::Integer(n)
    }
}

impl From<i32> for Number {
    fn from(n: i32) -> Self {
        Number::Integer(i64::from(n))
    }
}

impl From<f64> for Number {
    fn from(f: f64) -> Self {
        Number::Float(f)
    }
}

/// The operation buckets of an update statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOperator {
    /// Overwrite a field.
    Set,
    /// Remove a field.
    Unset,
    /// Atomically add to a numeric field.
    Inc,
    /// Append to an array field.
    Push,
}

impl UpdateOperator {
    /// All operators in rendering order.
    pub const ALL: [UpdateOperator; 4] = [
        UpdateOperator::Set,
        UpdateOperator::Unset,
        UpdateOperator::Inc,
        UpdateOperator::Push,
    ];

    /// Name of the operator in the store's update protocol.
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOperator::Set => "$set",
            UpdateOperator::Unset => "$unset",
            UpdateOperator::Inc => "$inc",
            UpdateOperator::Push => "$push",
        }
    }

    /// Parses a protocol operator name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }
}

impl fmt::Display for UpdateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Modifier wrapping the values of a `$push` entry.
pub const EACH_MODIFIER: &str = "$each";

/// A partial update for one document, grouped by operator.
///
/// Each dotted path appears in at most one bucket. Buckets with no entries
/// are reported as absent by the accessors and are left out when rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateStatement {
    set: BTreeMap<String, Value>,
    unset: BTreeSet<String>,
    inc: BTreeMap<String, Number>,
    push: BTreeMap<String, Vec<Value>>,
}

impl UpdateStatement {
    /// Creates an empty statement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a field overwrite.
    pub fn add_set(&mut self, path: impl Into<String>, value: Value) -> &mut Self {
        self.set.insert(path.into(), value);
        self
    }

    /// Records a field removal.
    pub fn add_unset(&mut self, path: impl Into<String>) -> &mut Self {
        self.unset.insert(path.into());
        self
    }

    /// Records an increment. Increments on the same path accumulate.
    pub fn add_inc(&mut self, path: impl Into<String>, delta: impl Into<Number>) -> &mut Self {
        let delta = delta.into();
        self.inc
            .entry(path.into())
            .and_modify(|current| *current = current.add(delta))
            .or_insert(delta);
        self
    }

    /// Records values to append. Appends on the same path accumulate.
    pub fn add_push(&mut self, path: impl Into<String>, values: Vec<Value>) -> &mut Self {
        if !values.is_empty() {
            self.push.entry(path.into()).or_default().extend(values);
        }
        self
    }

    /// Field overwrites, or `None` when there are none.
    pub fn set(&self) -> Option<&BTreeMap<String, Value>> {
        (!self.set.is_empty()).then_some(&self.set)
    }

    /// Field removals, or `None` when there are none.
    pub fn unset(&self) -> Option<&BTreeSet<String>> {
        (!self.unset.is_empty()).then_some(&self.unset)
    }

    /// Increments, or `None` when there are none.
    pub fn inc(&self) -> Option<&BTreeMap<String, Number>> {
        (!self.inc.is_empty()).then_some(&self.inc)
    }

    /// Appends, or `None` when there are none.
    pub fn push(&self) -> Option<&BTreeMap<String, Vec<Value>>> {
        (!self.push.is_empty()).then_some(&self.push)
    }

    /// Returns the bucket holding a path.
    pub fn operator_for(&self, path: &str) -> Option<UpdateOperator> {
        if self.set.contains_key(path) {
            Some(UpdateOperator::Set)
        } else if self.unset.contains(path) {
            Some(UpdateOperator::Unset)
        } else if self.inc.contains_key(path) {
            Some(UpdateOperator::Inc)
        } else if self.push.contains_key(path) {
            Some(UpdateOperator::Push)
        } else {
            None
        }
    }

    /// Returns true if the statement changes nothing.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty() && self.inc.is_empty() && self.push.is_empty()
    }

    /// Total number of operations across all buckets.
    pub fn len(&self) -> usize {
        self.set.len() + self.unset.len() + self.inc.len() + self.push.len()
    }

    /// Iterates over every path touched by the statement.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.set
            .keys()
            .map(String::as_str)
            .chain(self.unset.iter().map(String::as_str))
            .chain(self.inc.keys().map(String::as_str))
            .chain(self.push.keys().map(String::as_str))
    }

    /// Merges another statement into this one, bucket by bucket.
    pub fn merge(&mut self, other: UpdateStatement) {
        self.set.extend(other.set);
        self.unset.extend(other.unset);
        for (path, delta) in other.inc {
            self.add_inc(path, delta);
        }
        for (path, values) in other.push {
            self.add_push(path, values);
        }
    }

    /// Resolves paths present in both `set` and `unset`.
    ///
    /// `unset` wins only when the value being set is null.
    pub fn normalize(&mut self) {
        let both: Vec<String> = self
            .unset
            .iter()
            .filter(|path| self.set.contains_key(*path))
            .cloned()
            .collect();

        for path in both {
            if self.set.get(&path).is_some_and(Value::is_null) {
                self.set.remove(&path);
            } else {
                self.unset.remove(&path);
            }
        }
    }

    /// Renders the statement in the store's update protocol.
    ///
    /// `{"$set": {..}, "$unset": {path: 1}, "$inc": {..}, "$push": {path: {"$each": [..]}}}`
    /// with empty buckets left out.
    pub fn to_value(&self) -> Value {
        let mut doc = Document::new();

        if !self.set.is_empty() {
            doc.insert(
                UpdateOperator::Set.as_str().to_string(),
                Value::Document(self.set.clone()),
            );
        }
        if !self.unset.is_empty() {
            let marks = self
                .unset
                .iter()
                .map(|path| (path.clone(), Value::Integer(1)))
                .collect();
            doc.insert(
                UpdateOperator::Unset.as_str().to_string(),
                Value::Document(marks),
            );
        }
        if !self.inc.is_empty() {
            let deltas = self
                .inc
                .iter()
                .map(|(path, delta)| (path.clone(), delta.to_value()))
                .collect();
            doc.insert(
                UpdateOperator::Inc.as_str().to_string(),
                Value::Document(deltas),
            );
        }
        if !self.push.is_empty() {
            let appends = self
                .push
                .iter()
                .map(|(path, values)| {
                    (
                        path.clone(),
                        Value::document([(EACH_MODIFIER, Value::Array(values.clone()))]),
                    )
                })
                .collect();
            doc.insert(
                UpdateOperator::Push.as_str().to_string(),
                Value::Document(appends),
            );
        }

        Value::Document(doc)
    }

    /// Parses a statement from its protocol form.
    ///
    /// `$push` entries may be `{"$each": [..]}` or a single bare value.
    pub fn from_value(value: &Value) -> CoreResult<Self> {
        let doc = value
            .as_document()
            .ok_or_else(|| CoreError::invalid_statement("expected a document"))?;

        let mut statement = Self::new();
        for (name, bucket) in doc {
            let operator = UpdateOperator::from_name(name)
                .ok_or_else(|| CoreError::invalid_statement(format!("unknown operator {name}")))?;
            let entries = bucket.as_document().ok_or_else(|| {
                CoreError::invalid_statement(format!("{name} must map paths to values"))
            })?;

            for (path, entry) in entries {
                match operator {
                    UpdateOperator::Set => {
                        statement.add_set(path.clone(), entry.clone());
                    }
                    UpdateOperator::Unset => {
                        statement.add_unset(path.clone());
                    }
                    UpdateOperator::Inc => {
                        let delta = Number::from_value(entry).ok_or_else(|| {
                            CoreError::invalid_statement(format!("$inc delta for {path} is not a number"))
                        })?;
                        statement.add_inc(path.clone(), delta);
                    }
                    UpdateOperator::Push => {
                        let values = match entry.get(EACH_MODIFIER) {
                            Some(Value::Array(values)) => values.clone(),
                            Some(other) => vec![other.clone()],
                            None => vec![entry.clone()],
                        };
                        statement.add_push(path.clone(), values);
                    }
                }
            }
        }
        Ok(statement)
    }

    /// Encodes the protocol form to canonical CBOR.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(to_canonical_cbor(&self.to_value())?)
    }

    /// Decodes a statement from canonical CBOR.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        Self::from_value(&from_cbor(bytes)?)
    }

    pub(crate) fn unset_paths(&self) -> Vec<FieldPath> {
        self.unset.iter().map(|p| FieldPath::from(p.as_str())).collect()
    }

    pub(crate) fn set_entries(&self) -> impl Iterator<Item = (FieldPath, &Value)> {
        self.set.iter().map(|(p, v)| (FieldPath::from(p.as_str()), v))
    }

    pub(crate) fn inc_entries(&self) -> impl Iterator<Item = (FieldPath, Number)> + '_ {
        self.inc.iter().map(|(p, n)| (FieldPath::from(p.as_str()), *n))
    }

    pub(crate) fn push_entries(&self) -> impl Iterator<Item = (FieldPath, &[Value])> {
        self.push
            .iter()
            .map(|(p, v)| (FieldPath::from(p.as_str()), v.as_slice()))
    }
}
