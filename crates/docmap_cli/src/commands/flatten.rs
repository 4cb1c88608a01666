//! Flatten command implementation.

use super::read_document;
use docmap_codec::{Document, Value};
use docmap_core::{aggregate, FieldPath, FlatRecord, SpecialKeys};
use std::path::Path;

/// Flattens a document, optionally keeping query operators on their field.
pub fn flatten(doc: &Document, query: bool) -> FlatRecord {
    let special = if query {
        SpecialKeys::query_operators()
    } else {
        SpecialKeys::new()
    };
    aggregate(doc, &special, &FieldPath::root())
}

/// Runs the flatten command.
pub fn run(path: &Path, query: bool) -> Result<(), Box<dyn std::error::Error>> {
    let doc = read_document(path)?;
    let flat = flatten(&doc, query);
    println!("{}", serde_json::to_string_pretty(&Value::Document(flat))?);
    Ok(())
}
