//! Unflatten command implementation.

use super::read_document;
use docmap_codec::Value;
use docmap_core::disaggregate;
use std::path::Path;

/// Runs the unflatten command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let flat = read_document(path)?;
    let doc = disaggregate(&flat);
    println!("{}", serde_json::to_string_pretty(&Value::Document(doc))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::flatten::flatten;
    use super::super::test_support::json_file;
    use super::*;

    #[test]
    fn rebuilds_nesting_and_arrays() {
        let file = json_file(r#"{"user.name":"Ada","user.langs.0":"en","user.langs.1":"fr"}"#);
        let doc = disaggregate(&read_document(file.path()).unwrap());

        let expected: Value =
            serde_json::from_str(r#"{"user":{"name":"Ada","langs":["en","fr"]}}"#).unwrap();
        assert_eq!(Value::Document(doc), expected);
    }

    #[test]
    fn inverse_of_flatten() {
        let file = json_file(r#"{"a":{"b":[1,{"c":null}],"d":{}},"e":"x"}"#);
        let doc = read_document(file.path()).unwrap();
        assert_eq!(disaggregate(&flatten(&doc, false)), doc);
    }
}
