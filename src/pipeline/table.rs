//! Table output: flattened product records → rectangular CSV.
//!
//! The column set comes from the FIRST record alone, sorted by name, and is
//! fixed before any row is written. Later records are coerced to it: keys
//! the header lacks are dropped, header keys a record lacks become empty
//! cells. A product with more fields than the first one therefore loses
//! them. Widening the header to the union of all keys would change the
//! output shape existing consumers read, so it is deliberately not done.
//!
//! The file is written to a temporary sibling and renamed into place, so a
//! failed run leaves no file and two runs never interleave their rows.

use crate::error::Pdf2CsvError;
use crate::output::{FlattenedRecord, ProductRecord, Table};
use crate::pipeline::flatten::{flatten_value, stringify};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Build the table for `data`: an array of records or one bare record.
///
/// # Errors
/// [`Pdf2CsvError::EmptyOrInvalidData`] when `data` is an empty array, not
/// an array/object, or holds a non-object record. A first record with no
/// fields (`[{}]`) is rejected too, rather than written as a file holding
/// only an empty header line.
pub fn build_table(data: &Value) -> Result<Table, Pdf2CsvError> {
    match data {
        Value::Object(_) => build_table_from_records(std::slice::from_ref(data)),
        Value::Array(items) => build_table_from_records(items),
        other => Err(invalid(format!(
            "expected a list of product records, got {}",
            json_kind(other)
        ))),
    }
}

/// Build the table for a list of records.
pub fn build_table_from_records(records: &[ProductRecord]) -> Result<Table, Pdf2CsvError> {
    if records.is_empty() {
        return Err(invalid("no products to write".into()));
    }

    let flattened = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            flatten_value(r).ok_or_else(|| {
                invalid(format!(
                    "record {} is {}, not an object",
                    i + 1,
                    json_kind(r)
                ))
            })
        })
        .collect::<Result<Vec<FlattenedRecord>, _>>()?;

    let mut header: Vec<String> = flattened[0].keys().cloned().collect();
    if header.is_empty() {
        return Err(invalid("first record has no fields".into()));
    }
    header.sort();

    let rows: Vec<Vec<String>> = flattened
        .iter()
        .map(|record| {
            header
                .iter()
                .map(|col| record.get(col).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    debug!("Table: {} columns × {} rows", header.len(), rows.len());
    Ok(Table { header, rows })
}

/// Build and write the table for `data` to `path` as CSV.
///
/// Nothing is created on disk unless the whole table is valid.
pub fn write_table(data: &Value, path: &Path) -> Result<Table, Pdf2CsvError> {
    let table = build_table(data)?;
    write_csv(&table, path)?;
    Ok(table)
}

/// Write an already-built table to `path` atomically.
pub fn write_csv(table: &Table, path: &Path) -> Result<PathBuf, Pdf2CsvError> {
    let write_err = |e: std::io::Error| Pdf2CsvError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    // The temp file defaults to 0600; ask for 0666 (less umask) like a plain
    // create, and keep the mode of a file being replaced.
    let mut builder = tempfile::Builder::new();
    builder.prefix(".pdf2csv-").suffix(".csv.tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(&parent).map_err(write_err)?;
    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(write_err)?;
    }
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
        writer
            .write_record(&table.header)
            .map_err(|e| write_err(csv_to_io(e)))?;
        for row in &table.rows {
            writer.write_record(row).map_err(|e| write_err(csv_to_io(e)))?;
        }
        // Check for error rather than implicitly flushing on drop.
        writer.flush().map_err(write_err)?;
    }

    tmp.persist(path).map_err(|e| write_err(e.error))?;
    info!(
        "Wrote {} rows × {} columns to {}",
        table.row_count(),
        table.column_count(),
        path.display()
    );
    Ok(path.to_path_buf())
}

/// Render a table as a CSV string (used for previews and tests).
pub fn to_csv_string(table: &Table) -> Result<String, Pdf2CsvError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&table.header)
        .map_err(|e| Pdf2CsvError::Internal(e.to_string()))?;
    for row in &table.rows {
        writer
            .write_record(row)
            .map_err(|e| Pdf2CsvError::Internal(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Pdf2CsvError::Internal(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Pdf2CsvError::Internal(e.to_string()))
}

/// Cell text: null is empty, strings verbatim, everything else as JSON
/// (`true`, `2.5`), never `True`/`None` style.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => stringify(other),
    }
}

fn csv_to_io(err: csv::Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err)
}

fn invalid(reason: String) -> Pdf2CsvError {
    Pdf2CsvError::EmptyOrInvalidData { reason }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
