// src/load/delimited.rs
use csv::ReaderBuilder;
use std::path::Path;
use tracing::trace;

use super::{normalize_headers, LoadError};
use crate::table::{CellValue, Table};

/// Read a delimited text file whose first record is the header row.
pub fn read_delimited(path: &Path, name: &str, delimiter: u8) -> Result<Table, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true) // short rows are padded below
        .from_path(path)
        .map_err(|e| LoadError::parse(path, e))?;

    let headers = normalize_headers(
        rdr.headers()
            .map_err(|e| LoadError::parse(path, e))?
            .iter(),
    );

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| LoadError::parse(path, e))?;
        if record.len() > headers.len() {
            return Err(LoadError::parse(
                path,
                format!(
                    "record {} has {} fields, header has {}",
                    idx + 1,
                    record.len(),
                    headers.len()
                ),
            ));
        }
        rows.push(record.iter().map(CellValue::infer).collect::<Vec<_>>());
    }
    trace!(rows = rows.len(), "parsed delimited records");

    Ok(Table::from_rows(name, headers, rows))
}
