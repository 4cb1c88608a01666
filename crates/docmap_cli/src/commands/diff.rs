//! Diff command implementation.

use super::{read_document, read_snapshot};
use docmap_codec::{Document, Value};
use docmap_core::{
    Config, CoreResult, DiffEngine, ShapeConflictPolicy, TargetDocument, UpdateOperator,
    UpdateStatement,
};
use std::fmt::Write;
use std::path::Path;
use tracing::debug;

/// Diff behaviour switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// Read `{"$inc": n}` objects as increments.
    pub operators: bool,
    /// Replace subtrees on shape changes instead of failing.
    pub replace_on_conflict: bool,
}

/// Computes the update statement between two documents.
pub fn compute(
    old: Option<&Document>,
    new: &Document,
    options: DiffOptions,
) -> CoreResult<UpdateStatement> {
    let policy = if options.replace_on_conflict {
        ShapeConflictPolicy::Replace
    } else {
        ShapeConflictPolicy::Error
    };
    let engine = DiffEngine::new(&Config::new().shape_conflict(policy));

    let target = if options.operators {
        TargetDocument::with_operators(new)
    } else {
        TargetDocument::from(new)
    };
    engine.compute_update(old, &target)
}

/// Renders a statement in the requested format.
pub fn render(
    statement: &UpdateStatement,
    format: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(&statement.to_value())?),
        "text" => render_text(statement),
        other => Err(format!("unknown format '{other}' (expected json or text)").into()),
    }
}

fn render_text(statement: &UpdateStatement) -> Result<String, Box<dyn std::error::Error>> {
    if statement.is_empty() {
        return Ok("no changes".to_string());
    }

    let mut out = String::new();
    if let Some(set) = statement.set() {
        for (path, value) in set {
            writeln!(out, "{:<8}{path} = {}", UpdateOperator::Set.as_str(), json(value)?)?;
        }
    }
    if let Some(unset) = statement.unset() {
        for path in unset {
            writeln!(out, "{:<8}{path}", UpdateOperator::Unset.as_str())?;
        }
    }
    if let Some(inc) = statement.inc() {
        for (path, delta) in inc {
            writeln!(out, "{:<8}{path} += {}", UpdateOperator::Inc.as_str(), json(&delta.to_value())?)?;
        }
    }
    if let Some(push) = statement.push() {
        for (path, values) in push {
            let values = Value::Array(values.clone());
            writeln!(out, "{:<8}{path} << {}", UpdateOperator::Push.as_str(), json(&values)?)?;
        }
    }
    Ok(out.trim_end().to_string())
}

fn json(value: &Value) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

/// Runs the diff command.
pub fn run(
    old: &str,
    new: &Path,
    format: &str,
    options: DiffOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = read_snapshot(old)?;
    let current = read_document(new)?;

    let statement = compute(snapshot.as_ref(), &current, options)?;
    debug!(operations = statement.len(), "diff computed");
    println!("{}", render(&statement, format)?);
    Ok(())
}
