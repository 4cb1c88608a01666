//! CLI command implementations.

pub mod diff;
pub mod encode;
pub mod flatten;
pub mod unflatten;

use docmap_codec::{Document, Value};
use std::fs;
use std::path::Path;

/// Argument meaning "no snapshot".
pub const NO_SNAPSHOT: &str = "-";

/// Reads a JSON file that must hold an object.
pub fn read_document(path: &Path) -> Result<Document, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    match serde_json::from_str::<Value>(&text)? {
        Value::Document(doc) => Ok(doc),
        other => Err(format!(
            "{} holds a JSON {}, expected an object",
            path.display(),
            other.kind()
        )
        .into()),
    }
}

/// Reads the snapshot argument, where `-` means there is none.
pub fn read_snapshot(arg: &str) -> Result<Option<Document>, Box<dyn std::error::Error>> {
    if arg == NO_SNAPSHOT {
        return Ok(None);
    }
    read_document(Path::new(arg)).map(Some)
}
