//! Benchmark utilities.

use docmap_codec::{Document, Value};
use rand::Rng;

/// Generate a record `depth` levels deep with `width` fields per level.
///
/// Every level also carries a `tags` array of `width` elements.
pub fn nested_record(depth: usize, width: usize) -> Document {
    let mut doc: Document = (0..width)
        .map(|i| {
            let value = if depth == 0 {
                Value::Text(format!("leaf_{i}"))
            } else {
                Value::Document(nested_record(depth - 1, width))
            };
            (format!("key_{i}"), value)
        })
        .collect();
    doc.insert(
        "tags".into(),
        Value::Array((0..width as i64).map(Value::Integer).collect()),
    );
    doc
}

/// Generate a flat record with `fields` integer fields.
pub fn wide_record(fields: usize) -> Document {
    (0..fields)
        .map(|i| (format!("field_{i}"), Value::Integer(i as i64)))
        .collect()
}

/// Return a copy of `doc` with roughly `ratio` of its leaves changed.
///
/// Changed text leaves get a suffix, integers are bumped and arrays grow by
/// one element.
pub fn mutate(doc: &Document, ratio: f64) -> Document {
    let mut rng = rand::thread_rng();
    mutate_with(doc, ratio, &mut rng)
}

fn mutate_with(doc: &Document, ratio: f64, rng: &mut impl Rng) -> Document {
    doc.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Document(inner) => Value::Document(mutate_with(inner, ratio, &mut *rng)),
                _ if !rng.gen_bool(ratio) => value.clone(),
                Value::Text(text) => Value::Text(format!("{text}_changed")),
                Value::Integer(n) => Value::Integer(n + 1),
                Value::Array(items) => {
                    let mut items = items.clone();
                    items.push(Value::Integer(rng.gen()));
                    Value::Array(items)
                }
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_shapes() {
        assert_eq!(wide_record(10).len(), 10);
        let nested = nested_record(2, 3);
        assert_eq!(nested.len(), 4);
        assert!(matches!(nested["key_0"], Value::Document(_)));
    }

    #[test]
    fn mutate_extremes() {
        let doc = nested_record(2, 3);
        assert_eq!(mutate(&doc, 0.0), doc);
        assert_ne!(mutate(&doc, 1.0), doc);
    }
}
