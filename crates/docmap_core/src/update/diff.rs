//! Structural diff between a snapshot and the current state of a record.
//!
//! The engine walks the new state key by key and records the smallest set of
//! dotted-path operations that turns the old record into the new one:
//!
//! - keys only in the new state are `set` (nested documents field by field)
//! - keys only in the old state are `unset`
//! - nested documents on both sides are diffed recursively
//! - arrays are compared by position; growth becomes one `push` of the tail,
//!   shrinkage becomes an `unset` per trailing index
//! - a new value of `null` over an existing field is an `unset`
//! - [`Target::Increment`] always becomes an `inc`
//!
//! Array elements are matched by index only. Reordered elements show up as
//! `set` operations on the indices that changed.
//!
//! Keys containing `.` cannot be addressed by a dotted path and are rejected
//! with [`CoreError::InvalidPath`].

use crate::config::{Config, ShapeConflictPolicy};
use crate::error::{CoreError, CoreResult};
use crate::path::FieldPath;
use crate::update::statement::UpdateStatement;
use crate::update::target::{Target, TargetDocument};
use docmap_codec::{Document, Value, ValueKind};
use tracing::{debug, warn};

/// Computes update statements from old and new record states.
#[derive(Debug, Clone, Copy)]
pub struct DiffEngine {
    policy: ShapeConflictPolicy,
    max_depth: usize,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl DiffEngine {
    /// Creates an engine from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            policy: config.shape_conflict,
            max_depth: config.max_depth,
        }
    }

    /// Returns the shape conflict policy in use.
    pub fn policy(&self) -> ShapeConflictPolicy {
        self.policy
    }

    /// Computes the update that turns `old` into `new`.
    ///
    /// `old` is `None` when there is no snapshot; every targeted field is
    /// then an addition.
    pub fn compute_update(
        &self,
        old: Option<&Document>,
        new: &TargetDocument,
    ) -> CoreResult<UpdateStatement> {
        self.compute_update_at(old, new, &FieldPath::root())
    }

    /// Computes the update for a sub-document that lives at `prefix`.
    ///
    /// Every path in the result starts with `prefix`.
    pub fn compute_update_at(
        &self,
        old: Option<&Document>,
        new: &TargetDocument,
        prefix: &FieldPath,
    ) -> CoreResult<UpdateStatement> {
        let mut statement = UpdateStatement::new();
        self.diff_document(old, new, prefix, &mut statement)?;
        statement.normalize();

        debug!(
            prefix = %prefix,
            snapshot = old.is_some(),
            operations = statement.len(),
            "computed update"
        );
        Ok(statement)
    }

    /// Diffs two plain records.
    pub fn diff(&self, old: Option<&Document>, new: &Document) -> CoreResult<UpdateStatement> {
        self.compute_update(old, &TargetDocument::from(new))
    }

    fn check_depth(&self, path: &FieldPath) -> CoreResult<()> {
        if path.depth() > self.max_depth {
            return Err(CoreError::DepthExceeded {
                path: path.to_string(),
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    fn diff_document(
        &self,
        old: Option<&Document>,
        new: &TargetDocument,
        prefix: &FieldPath,
        out: &mut UpdateStatement,
    ) -> CoreResult<()> {
        self.check_depth(prefix)?;

        for (key, target) in new.iter() {
            let previous = old.and_then(|doc| doc.get(key));
            self.diff_field(previous, target, &child(prefix, key)?, out)?;
        }

        if let Some(old) = old {
            for key in old.keys().filter(|key| !new.contains_key(key)) {
                out.add_unset(child(prefix, key)?);
            }
        }
        Ok(())
    }

    fn diff_field(
        &self,
        old: Option<&Value>,
        target: &Target,
        path: &FieldPath,
        out: &mut UpdateStatement,
    ) -> CoreResult<()> {
        match (target, old) {
            (Target::Increment(delta), _) => {
                out.add_inc(path.clone(), *delta);
            }
            // an empty document has no leaves to set one by one
            (Target::Nested(doc), None) if doc.is_empty() => {
                out.add_set(path.clone(), Value::Document(Document::new()));
            }
            (Target::Nested(doc), None) => self.diff_document(None, doc, path, out)?,
            (Target::Nested(doc), Some(Value::Document(previous))) => {
                self.diff_document(Some(previous), doc, path, out)?;
            }
            (Target::Nested(doc), Some(Value::Array(_))) => {
                self.shape_conflict(path, ValueKind::Array, doc.to_value(), out)?;
            }
            (Target::Nested(doc), Some(_)) => {
                out.add_set(path.clone(), doc.to_value());
            }
            (Target::Replace(value), None) => {
                out.add_set(path.clone(), value.clone());
            }
            (Target::Replace(value), Some(previous)) => {
                self.diff_value(previous, value, path, out)?;
            }
        }
        Ok(())
    }

    fn diff_value(
        &self,
        old: &Value,
        new: &Value,
        path: &FieldPath,
        out: &mut UpdateStatement,
    ) -> CoreResult<()> {
        if old == new {
            return Ok(());
        }
        match (old, new) {
            (_, Value::Null) => {
                out.add_unset(path.clone());
            }
            (Value::Array(before), Value::Array(after)) => {
                self.diff_array(before, after, path, out)?;
            }
            (Value::Array(_), Value::Document(_)) | (Value::Document(_), Value::Array(_)) => {
                self.shape_conflict(path, old.kind(), new.clone(), out)?;
            }
            _ => {
                out.add_set(path.clone(), new.clone());
            }
        }
        Ok(())
    }

    fn diff_array(
        &self,
        old: &[Value],
        new: &[Value],
        path: &FieldPath,
        out: &mut UpdateStatement,
    ) -> CoreResult<()> {
        self.check_depth(path)?;

        for (index, (before, after)) in old.iter().zip(new).enumerate() {
            if before == after {
                continue;
            }
            let item = path.index(index);
            match (before, after) {
                (Value::Document(previous), Value::Document(current)) => {
                    self.diff_document(Some(previous), &TargetDocument::from(current), &item, out)?;
                }
                (Value::Array(_), Value::Document(_)) | (Value::Document(_), Value::Array(_)) => {
                    self.shape_conflict(&item, before.kind(), after.clone(), out)?;
                }
                // null elements are kept in place, an unset would shift the tail
                _ => {
                    out.add_set(item, after.clone());
                }
            }
        }

        if new.len() > old.len() {
            out.add_push(path.clone(), new.iter().skip(old.len()).cloned().collect());
        }
        for index in new.len()..old.len() {
            out.add_unset(path.index(index));
        }
        Ok(())
    }

    fn shape_conflict(
        &self,
        path: &FieldPath,
        old: ValueKind,
        new: Value,
        out: &mut UpdateStatement,
    ) -> CoreResult<()> {
        match self.policy {
            ShapeConflictPolicy::Error => Err(CoreError::shape_conflict(
                path.as_str(),
                old,
                new.kind(),
            )),
            ShapeConflictPolicy::Replace => {
                warn!(path = %path, old = %old, new = %new.kind(), "replacing subtree after shape change");
                out.add_set(path.clone(), new);
                Ok(())
            }
        }
    }
}

/// Joins a document key onto `prefix`.
///
/// Keys holding the separator would address a different, nested field.
fn child(prefix: &FieldPath, key: &str) -> CoreResult<FieldPath> {
    let path = prefix.join(key);
    if key.contains(FieldPath::SEPARATOR) {
        return Err(CoreError::invalid_path(
            path.as_str(),
            format!("key '{key}' contains '{}'", FieldPath::SEPARATOR),
        ));
    }
    Ok(path)
}

/// Computes the update that turns `old` into `new` with default settings.
pub fn compute_update(
    old: Option<&Document>,
    new: &TargetDocument,
) -> CoreResult<UpdateStatement> {
    DiffEngine::default().compute_update(old, new)
}
