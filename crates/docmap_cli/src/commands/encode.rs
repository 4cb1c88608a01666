//! Encode command implementation.

use super::diff::{compute, DiffOptions};
use super::{read_document, read_snapshot};
use docmap_core::UpdateStatement;
use std::fmt::Write;
use std::path::Path;

/// Encodes a statement as lowercase hex canonical CBOR.
pub fn encode_hex(statement: &UpdateStatement) -> Result<String, Box<dyn std::error::Error>> {
    let bytes = statement.encode()?;
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(hex, "{byte:02x}")?;
    }
    Ok(hex)
}

/// Runs the encode command.
pub fn run(old: &str, new: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = read_snapshot(old)?;
    let current = read_document(new)?;
    let statement = compute(snapshot.as_ref(), &current, DiffOptions::default())?;
    println!("{}", encode_hex(&statement)?);
    Ok(())
}
