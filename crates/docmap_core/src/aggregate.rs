//! Conversion between nested records and flat dotted-path records.
//!
//! [`aggregate`] walks a record depth first and emits one entry per leaf,
//! keyed by its dotted path. Array elements are addressed by index. Empty
//! documents and arrays are leaves. Keys registered in [`SpecialKeys`] are
//! handed to their handler instead of being walked.
//!
//! [`disaggregate`] is the inverse: it splits each path on `.` and rebuilds
//! the nesting. Documents whose keys are exactly `0..n` become arrays again.

use crate::path::FieldPath;
use docmap_codec::{Document, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Dotted path → leaf value.
pub type FlatRecord = BTreeMap<String, Value>;

/// Handler for a special key: `(prefix, key, value, accumulator)`.
pub type KeyHandler = Box<dyn Fn(&FieldPath, &str, &Value, &mut FlatRecord) + Send + Sync>;

/// Comparison operators that stay attached to their field when flattening.
pub const QUERY_OPERATORS: [&str; 9] = [
    "$gt", "$gte", "$lt", "$lte", "$ne", "$in", "$nin", "$exists", "$eq",
];

/// Registry of keys that short-circuit flattening.
#[derive(Default)]
pub struct SpecialKeys {
    handlers: HashMap<String, KeyHandler>,
}

impl SpecialKeys {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a key, replacing any previous one.
    #[must_use]
    pub fn with<F>(mut self, key: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&FieldPath, &str, &Value, &mut FlatRecord) + Send + Sync + 'static,
    {
        self.register(key, handler);
        self
    }

    /// Registers a handler for a key, replacing any previous one.
    pub fn register<F>(&mut self, key: impl Into<String>, handler: F)
    where
        F: Fn(&FieldPath, &str, &Value, &mut FlatRecord) + Send + Sync + 'static,
    {
        self.handlers.insert(key.into(), Box::new(handler));
    }

    /// Registry for query filters.
    ///
    /// `{"age": {"$gt": 5}}` flattens to `age → {"$gt": 5}`; several
    /// operators on one field are collected into the same document.
    pub fn query_operators() -> Self {
        let mut keys = Self::new();
        for operator in QUERY_OPERATORS {
            keys.register(operator, attach_to_field);
        }
        keys
    }

    /// Returns the handler registered for a key.
    pub fn handler(&self, key: &str) -> Option<&KeyHandler> {
        self.handlers.get(key)
    }

    /// Returns true if the key has a handler.
    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no key is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for SpecialKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("SpecialKeys").field("keys", &keys).finish()
    }
}

fn attach_to_field(prefix: &FieldPath, key: &str, value: &Value, flat: &mut FlatRecord) {
    let field = flat
        .entry(prefix.as_str().to_string())
        .or_insert_with(|| Value::Document(Document::new()));
    if let Some(doc) = field.as_document_mut() {
        doc.insert(key.to_string(), value.clone());
    } else {
        *field = Value::document([(key, value.clone())]);
    }
}

/// Flattens a record into dotted paths, all starting with `prefix`.
pub fn aggregate(record: &Document, special: &SpecialKeys, prefix: &FieldPath) -> FlatRecord {
    let mut flat = FlatRecord::new();
    aggregate_document(record, special, prefix, &mut flat);
    flat
}

fn aggregate_document(
    doc: &Document,
    special: &SpecialKeys,
    prefix: &FieldPath,
    flat: &mut FlatRecord,
) {
    for (key, value) in doc {
        match special.handler(key) {
            Some(handler) => handler(prefix, key, value, flat),
            None => aggregate_value(value, special, prefix.join(key), flat),
        }
    }
}

fn aggregate_value(value: &Value, special: &SpecialKeys, path: FieldPath, flat: &mut FlatRecord) {
    match value {
        Value::Document(doc) if !doc.is_empty() => aggregate_document(doc, special, &path, flat),
        Value::Array(items) if !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                aggregate_value(item, special, path.index(index), flat);
            }
        }
        _ => {
            flat.insert(path.into_string(), value.clone());
        }
    }
}

/// Rebuilds a nested record from dotted paths.
///
/// Paths are applied in key order; when a path needs a document where a
/// scalar was written, the scalar is replaced.
pub fn disaggregate(flat: &FlatRecord) -> Document {
    let mut root = Document::new();
    for (path, value) in flat {
        insert_path(&mut root, path, value.clone());
    }
    root.into_iter()
        .map(|(key, value)| (key, restore_arrays(value)))
        .collect()
}

fn insert_path(root: &mut Document, path: &str, value: Value) {
    let mut segments = path.split(FieldPath::SEPARATOR).peekable();
    let mut current = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let child = current.entry(segment.to_string()).or_insert(Value::Null);
        if child.as_document().is_none() {
            *child = Value::Document(Document::new());
        }
        let Some(next) = child.as_document_mut() else {
            return;
        };
        current = next;
    }
}

fn restore_arrays(value: Value) -> Value {
    let Value::Document(doc) = value else {
        return value;
    };
    let doc: Document = doc
        .into_iter()
        .map(|(key, value)| (key, restore_arrays(value)))
        .collect();

    if !is_index_sequence(&doc) {
        return Value::Document(doc);
    }
    let mut items: Vec<(usize, Value)> = doc
        .into_iter()
        .filter_map(|(key, value)| key.parse().ok().map(|index| (index, value)))
        .collect();
    items.sort_by_key(|(index, _)| *index);
    Value::Array(items.into_iter().map(|(_, value)| value).collect())
}

/// True when the keys are exactly `0..len` written without leading zeros.
fn is_index_sequence(doc: &Document) -> bool {
    !doc.is_empty()
        && doc.keys().all(|key| {
            key.parse::<usize>()
                .is_ok_and(|index| index < doc.len() && index.to_string() == *key)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(pairs: Vec<(&str, Value)>) -> Document {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn flattens_nested_documents_and_arrays() {
        let doc = record(vec![
            ("name", Value::from("n")),
            (
                "embedded",
                Value::document([
                    ("x", Value::Integer(1)),
                    ("list", Value::Array(vec![Value::Integer(1), Value::from("two")])),
                ]),
            ),
        ]);

        let flat = aggregate(&doc, &SpecialKeys::new(), &FieldPath::root());
        assert_eq!(flat.len(), 4);
        assert_eq!(flat["name"], Value::from("n"));
        assert_eq!(flat["embedded.x"], Value::Integer(1));
        assert_eq!(flat["embedded.list.0"], Value::Integer(1));
        assert_eq!(flat["embedded.list.1"], Value::from("two"));
    }

    #[test]
    fn empty_containers_are_leaves() {
        let doc = record(vec![
            ("a", Value::Document(Document::new())),
            ("b", Value::Array(vec![])),
        ]);
        let flat = aggregate(&doc, &SpecialKeys::new(), &FieldPath::root());
        assert_eq!(flat["a"], Value::Document(Document::new()));
        assert_eq!(flat["b"], Value::Array(vec![]));
    }

    #[test]
    fn prefix_is_applied() {
        let doc = record(vec![("x", Value::Integer(1))]);
        let flat = aggregate(&doc, &SpecialKeys::new(), &FieldPath::from("outer"));
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["outer.x"]);
    }

    #[test]
    fn special_key_handler_replaces_recursion() {
        let keys = SpecialKeys::new().with("$raw", |prefix, key, value, flat| {
            flat.insert(format!("{prefix}:{key}"), value.clone());
        });
        let doc = record(vec![(
            "a",
            Value::document([("$raw", Value::document([("deep", Value::Integer(1))]))]),
        )]);

        let flat = aggregate(&doc, &keys, &FieldPath::root());
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["a:$raw"], Value::document([("deep", Value::Integer(1))]));
    }

    #[test]
    fn query_operators_stay_structured() {
        let filter = record(vec![
            (
                "age",
                Value::document([("$gt", Value::Integer(5)), ("$lt", Value::Integer(10))]),
            ),
            ("profile", Value::document([("city", Value::from("Oslo"))])),
        ]);

        let flat = aggregate(&filter, &SpecialKeys::query_operators(), &FieldPath::root());
        assert_eq!(
            flat["age"],
            Value::document([("$gt", Value::Integer(5)), ("$lt", Value::Integer(10))])
        );
        assert_eq!(flat["profile.city"], Value::from("Oslo"));
        assert_eq!(SpecialKeys::query_operators().len(), QUERY_OPERATORS.len());
    }

    #[test]
    fn disaggregate_rebuilds_nesting() {
        let mut flat = FlatRecord::new();
        flat.insert("a.b".to_string(), Value::Integer(1));
        flat.insert("a.c.d".to_string(), Value::Bool(true));
        flat.insert("top".to_string(), Value::Null);

        assert_eq!(
            disaggregate(&flat),
            record(vec![
                (
                    "a",
                    Value::document([
                        ("b", Value::Integer(1)),
                        ("c", Value::document([("d", Value::Bool(true))])),
                    ])
                ),
                ("top", Value::Null),
            ])
        );
    }

    #[test]
    fn nested_write_replaces_scalar() {
        let mut flat = FlatRecord::new();
        flat.insert("a".to_string(), Value::Integer(1));
        flat.insert("a.b".to_string(), Value::Integer(2));

        assert_eq!(
            disaggregate(&flat),
            record(vec![("a", Value::document([("b", Value::Integer(2))]))])
        );
    }

    #[test]
    fn index_keys_become_arrays_in_order() {
        let mut flat = FlatRecord::new();
        for index in 0..12 {
            flat.insert(format!("list.{index}"), Value::Integer(index));
        }
        flat.insert("sparse.0".to_string(), Value::Integer(0));
        flat.insert("sparse.2".to_string(), Value::Integer(2));

        let doc = disaggregate(&flat);
        assert_eq!(
            doc["list"],
            Value::Array((0..12).map(Value::Integer).collect())
        );
        assert!(matches!(doc["sparse"], Value::Document(_)));
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            "[a-z ]{0,8}".prop_map(Value::Text),
        ];
        leaf.prop_recursive(4, 48, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z][a-z0-9_]{0,5}", inner, 0..4)
                    .prop_map(Value::Document),
            ]
        })
    }

    proptest! {
        #[test]
        fn aggregate_roundtrip(
            doc in prop::collection::btree_map("[a-z][a-z0-9_]{0,5}", arb_value(), 0..6)
        ) {
            let flat = aggregate(&doc, &SpecialKeys::new(), &FieldPath::root());
            prop_assert_eq!(disaggregate(&flat), doc);
        }
    }
}
