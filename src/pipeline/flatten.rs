//! Flattening: collapse a nested product record into one level of columns.
//!
//! Key paths are joined with `_`. Rules, per value:
//!
//! | Value | Result |
//! |-------|--------|
//! | scalar (string, number, bool, null) | `prefix+key → value` |
//! | object | recurse with `prefix+key+"_"` |
//! | array of objects (incl. empty) | recurse into element *i* with `prefix+key+"_"+i+"_"` |
//! | any other array | `prefix+key → "e1, e2, …"` |
//!
//! The last rule is lossy on purpose: `[1, 2]` and `["1", "2"]` both become
//! the string `"1, 2"`, which is the shape downstream spreadsheets expect.
//! Strings join verbatim; other elements use their JSON text (`true`,
//! `null`, `{"k":1}`). Booleans and nulls are therefore spelled the JSON
//! way in every cell, not `True`/`None`.
//!
//! Paths can collide (`{"a_b": 1, "a": {"b": 2}}`). The later write wins and
//! keeps the column position of the first.

use crate::output::FlattenedRecord;
use serde_json::{Map, Value};

/// Separator between joined elements of a scalar array.
pub const LIST_SEPARATOR: &str = ", ";

/// Flatten `record` with every key prefixed by `prefix`.
pub fn flatten(record: &Map<String, Value>, prefix: &str) -> FlattenedRecord {
    let mut out = FlattenedRecord::new();
    flatten_into(&mut out, record, prefix);
    out
}

/// Flatten a record given as an arbitrary JSON value.
///
/// Returns `None` when `value` is not an object; such a record has no
/// column names to offer.
pub fn flatten_value(value: &Value) -> Option<FlattenedRecord> {
    value.as_object().map(|obj| flatten(obj, ""))
}

fn flatten_into(out: &mut FlattenedRecord, record: &Map<String, Value>, prefix: &str) {
    for (key, value) in record {
        let path = format!("{prefix}{key}");
        match value {
            Value::Object(nested) => flatten_into(out, nested, &format!("{path}_")),
            Value::Array(items) if items.iter().all(Value::is_object) => {
                for (i, item) in items.iter().enumerate() {
                    if let Value::Object(nested) = item {
                        flatten_into(out, nested, &format!("{path}_{i}_"));
                    }
                }
            }
            Value::Array(items) => {
                out.insert(path, Value::String(join_scalars(items)));
            }
            scalar => {
                out.insert(path, scalar.clone());
            }
        }
    }
}

fn join_scalars(items: &[Value]) -> String {
    items
        .iter()
        .map(stringify)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// Text of a single value: strings without quotes, everything else as JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
