//! Applying update statements to documents.

use crate::error::{CoreError, CoreResult};
use crate::path::FieldPath;
use crate::update::statement::{Number, UpdateStatement};
use docmap_codec::{Document, Value};

impl UpdateStatement {
    /// Applies the statement to a document in place.
    ///
    /// Operations run bucket by bucket: `set`, `inc`, `push`, then `unset`
    /// (deepest and highest array index first). Missing parents are created
    /// as documents. Unsetting the last element of an array removes it;
    /// unsetting any other element leaves `null` in its place.
    ///
    /// The document is left untouched if any operation fails.
    pub fn apply(&self, doc: &mut Document) -> CoreResult<()> {
        let mut root = Value::Document(doc.clone());

        for (path, value) in self.set_entries() {
            *slot(&mut root, &path)? = value.clone();
        }

        for (path, delta) in self.inc_entries() {
            let target = slot(&mut root, &path)?;
            let current = match &*target {
                // a missing field starts at zero
                Value::Null => Number::Integer(0),
                other => Number::from_value(other)
                    .ok_or_else(|| CoreError::type_mismatch(path.as_str(), "number", other.kind()))?,
            };
            *target = current.add(delta).to_value();
        }

        for (path, values) in self.push_entries() {
            let target = slot(&mut root, &path)?;
            match target {
                Value::Null => *target = Value::Array(values.to_vec()),
                Value::Array(items) => items.extend_from_slice(values),
                other => {
                    return Err(CoreError::type_mismatch(path.as_str(), "array", other.kind()));
                }
            }
        }

        let mut unset = self.unset_paths();
        unset.sort_by(|a, b| b.cmp_segments(a));
        for path in &unset {
            remove(&mut root, path)?;
        }

        if let Value::Document(updated) = root {
            *doc = updated;
        }
        Ok(())
    }
}

fn parse_index(path: &FieldPath, segment: &str) -> CoreResult<usize> {
    segment.parse().map_err(|_| {
        CoreError::invalid_path(path.as_str(), format!("'{segment}' is not an array index"))
    })
}

/// Follows `segments` from `root`, creating what is missing.
///
/// Missing document keys and array slots are filled with `null`, and `null`
/// containers on the way become documents.
fn walk_create<'a>(
    root: &'a mut Value,
    path: &FieldPath,
    segments: &[&str],
) -> CoreResult<&'a mut Value> {
    let mut current = root;
    for segment in segments {
        if current.is_null() {
            *current = Value::Document(Document::new());
        }
        current = match current {
            Value::Document(doc) => doc.entry((*segment).to_string()).or_insert(Value::Null),
            Value::Array(items) => {
                let index = parse_index(path, segment)?;
                if index >= items.len() {
                    items.resize(index + 1, Value::Null);
                }
                &mut items[index]
            }
            other => {
                return Err(CoreError::type_mismatch(
                    path.as_str(),
                    "document or array",
                    other.kind(),
                ));
            }
        };
    }
    Ok(current)
}

/// Follows `segments` from `root`, yielding `None` at the first missing step.
fn walk_existing<'a>(
    root: &'a mut Value,
    path: &FieldPath,
    segments: &[&str],
) -> CoreResult<Option<&'a mut Value>> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Document(doc) => match doc.get_mut(*segment) {
                Some(next) => next,
                None => return Ok(None),
            },
            Value::Array(items) => match items.get_mut(parse_index(path, segment)?) {
                Some(next) => next,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
    }
    Ok(Some(current))
}

/// Returns the value at `path`, creating it as `null` when missing.
fn slot<'a>(root: &'a mut Value, path: &FieldPath) -> CoreResult<&'a mut Value> {
    let segments: Vec<&str> = path.segments().collect();
    if segments.is_empty() {
        return Err(CoreError::invalid_path(path.as_str(), "the document root cannot be updated"));
    }
    walk_create(root, path, &segments)
}

fn remove(root: &mut Value, path: &FieldPath) -> CoreResult<()> {
    let segments: Vec<&str> = path.segments().collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(CoreError::invalid_path(path.as_str(), "the document root cannot be removed"));
    };
    let Some(parent) = walk_existing(root, path, parents)? else {
        return Ok(());
    };

    match parent {
        Value::Document(doc) => {
            doc.remove(*last);
        }
        Value::Array(items) => {
            let index = parse_index(path, last)?;
            if index + 1 == items.len() {
                items.pop();
            } else if let Some(item) = items.get_mut(index) {
                *item = Value::Null;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_codec::ValueKind;

    fn record(pairs: Vec<(&str, Value)>) -> Document {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn ints(values: &[i64]) -> Value {
        Value::Array(values.iter().copied().map(Value::Integer).collect())
    }

    #[test]
    fn set_creates_missing_parents() {
        let mut doc = Document::new();
        let mut statement = UpdateStatement::new();
        statement.add_set("a.b.c", Value::Integer(1));

        statement.apply(&mut doc).unwrap();
        assert_eq!(
            doc,
            record(vec![(
                "a",
                Value::document([("b", Value::document([("c", Value::Integer(1))]))])
            )])
        );
    }

    #[test]
    fn set_into_array_element() {
        let mut doc = record(vec![(
            "items",
            Value::Array(vec![Value::document([("qty", Value::Integer(1))])]),
        )]);
        let mut statement = UpdateStatement::new();
        statement.add_set("items.0.qty", Value::Integer(4));

        statement.apply(&mut doc).unwrap();
        assert_eq!(
            doc["items"],
            Value::Array(vec![Value::document([("qty", Value::Integer(4))])])
        );
    }

    #[test]
    fn unset_trailing_indices_truncates() {
        let mut doc = record(vec![("a", ints(&[1, 2, 3, 4]))]);
        let mut statement = UpdateStatement::new();
        statement.add_unset("a.2").add_unset("a.3");

        statement.apply(&mut doc).unwrap();
        assert_eq!(doc["a"], ints(&[1, 2]));
    }

    #[test]
    fn unset_inner_index_leaves_null() {
        let mut doc = record(vec![("a", ints(&[1, 2, 3]))]);
        let mut statement = UpdateStatement::new();
        statement.add_unset("a.0");

        statement.apply(&mut doc).unwrap();
        assert_eq!(
            doc["a"],
            Value::Array(vec![Value::Null, Value::Integer(2), Value::Integer(3)])
        );
    }

    #[test]
    fn unset_missing_path_is_noop() {
        let mut doc = record(vec![("a", Value::Integer(1))]);
        let mut statement = UpdateStatement::new();
        statement.add_unset("b.c").add_unset("a.x");

        statement.apply(&mut doc).unwrap();
        assert_eq!(doc, record(vec![("a", Value::Integer(1))]));
    }

    #[test]
    fn set_walks_through_null_and_short_arrays() {
        let mut doc = record(vec![("a", Value::Null), ("list", ints(&[1]))]);
        let mut statement = UpdateStatement::new();
        statement
            .add_set("a.b", Value::Integer(1))
            .add_set("list.2", Value::Integer(3))
            .add_unset("list.7.x")
            .add_unset("a.b.c");

        statement.apply(&mut doc).unwrap();
        assert_eq!(doc["a"], Value::document([("b", Value::Integer(1))]));
        assert_eq!(
            doc["list"],
            Value::Array(vec![Value::Integer(1), Value::Null, Value::Integer(3)])
        );
    }

    #[test]
    fn set_below_scalar_is_type_mismatch() {
        let mut doc = record(vec![("a", Value::Integer(1))]);
        let before = doc.clone();
        let mut statement = UpdateStatement::new();
        statement.add_set("a.b", Value::Integer(2));

        let err = statement.apply(&mut doc).unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
        assert_eq!(doc, before);
    }

    #[test]
    fn inc_adds_and_starts_at_zero() {
        let mut doc = record(vec![("hits", Value::Integer(10))]);
        let mut statement = UpdateStatement::new();
        statement.add_inc("hits", 2).add_inc("stats.score", 0.5);

        statement.apply(&mut doc).unwrap();
        assert_eq!(doc["hits"], Value::Integer(12));
        assert_eq!(
            doc["stats"],
            Value::document([("score", Value::Float(0.5))])
        );
    }

    #[test]
    fn push_appends_and_creates() {
        let mut doc = record(vec![("a", ints(&[1]))]);
        let mut statement = UpdateStatement::new();
        statement
            .add_push("a", vec![Value::Integer(2), Value::Integer(3)])
            .add_push("b", vec![Value::from("x")]);

        statement.apply(&mut doc).unwrap();
        assert_eq!(doc["a"], ints(&[1, 2, 3]));
        assert_eq!(doc["b"], Value::Array(vec![Value::from("x")]));
    }

    #[test]
    fn inc_on_text_is_type_mismatch() {
        let mut doc = record(vec![("name", Value::from("x"))]);
        let mut statement = UpdateStatement::new();
        statement.add_set("other", Value::Integer(1)).add_inc("name", 1);

        let err = statement.apply(&mut doc).unwrap_err();
        assert!(matches!(
            err,
            CoreError::TypeMismatch {
                expected: "number",
                found: ValueKind::Text,
                ..
            }
        ));
        // nothing applied
        assert_eq!(doc, record(vec![("name", Value::from("x"))]));
    }

    #[test]
    fn push_on_document_is_type_mismatch() {
        let mut doc = record(vec![("a", Value::document([("x", Value::Null)]))]);
        let mut statement = UpdateStatement::new();
        statement.add_push("a", vec![Value::Integer(1)]);

        assert!(matches!(
            statement.apply(&mut doc),
            Err(CoreError::TypeMismatch { expected: "array", .. })
        ));
    }

    #[test]
    fn non_numeric_index_is_invalid_path() {
        let mut doc = record(vec![("a", ints(&[1]))]);
        let mut statement = UpdateStatement::new();
        statement.add_set("a.first", Value::Integer(1));

        assert!(matches!(
            statement.apply(&mut doc),
            Err(CoreError::InvalidPath { .. })
        ));
    }

    #[test]
    fn scenario_statement_reproduces_new_record() {
        let mut doc = record(vec![
            ("same", Value::from("v")),
            ("diff", Value::from("v")),
            ("gone", Value::from("v")),
            ("arr", ints(&[1, 2, 3])),
        ]);
        let mut statement = UpdateStatement::new();
        statement
            .add_set("diff", Value::from("v2"))
            .add_set("new", Value::from("n"))
            .add_unset("gone")
            .add_unset("arr.2");

        statement.apply(&mut doc).unwrap();
        assert_eq!(
            doc,
            record(vec![
                ("same", Value::from("v")),
                ("diff", Value::from("v2")),
                ("new", Value::from("n")),
                ("arr", ints(&[1, 2])),
            ])
        );
    }
}
