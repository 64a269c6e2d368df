//! JSON type-table parser.
//!
//! Two layouts are accepted, both in declaration order:
//!
//! - an array of descriptors, each carrying its own `name`;
//! - an object keyed by type name. An entry without a `name` takes its key;
//!   one whose `name` disagrees with its key is reported by the resolver.

use crate::ir::TypeDescriptor;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("type table must be a JSON array or object, found {0}")]
    NotATable(&'static str),
    #[error("table entry `{entry}`: {source}")]
    Entry {
        entry: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a type table into `(key, descriptor)` pairs.
pub fn parse_type_table(input: &Value) -> Result<Vec<(String, TypeDescriptor)>, ParseError> {
    match input {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let def = parse_entry(item.clone(), || entry_label(item, index))?;
                Ok((def.name().to_string(), def))
            })
            .collect(),
        Value::Object(entries) => entries
            .iter()
            .map(|(key, item)| {
                let mut item = item.clone();
                if let Value::Object(map) = &mut item {
                    map.entry("name").or_insert_with(|| Value::String(key.clone()));
                }
                let def = parse_entry(item, || key.clone())?;
                Ok((key.clone(), def))
            })
            .collect(),
        other => Err(ParseError::NotATable(json_kind(other))),
    }
}

/// Parse a type table from JSON text.
pub fn parse_type_table_str(input: &str) -> Result<Vec<(String, TypeDescriptor)>, ParseError> {
    let value: Value = serde_json::from_str(input)?;
    parse_type_table(&value)
}

fn parse_entry(
    item: Value,
    label: impl FnOnce() -> String,
) -> Result<TypeDescriptor, ParseError> {
    serde_json::from_value(item).map_err(|source| ParseError::Entry {
        entry: label(),
        source,
    })
}

fn entry_label(item: &Value, index: usize) -> String {
    item.get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{index}"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
