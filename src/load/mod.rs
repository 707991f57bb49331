// src/load/mod.rs
//! Turning files on disk into [`Table`]s.
//!
//! The comparison engine only sees the [`TableLoader`] trait; [`FileLoader`]
//! is the production implementation that dispatches on file extension.

pub mod delimited;
pub mod xlsx;

use crate::table::Table;
use std::{collections::HashMap, path::Path};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoadError {
    #[error("source `{path}` could not be found")]
    SourceNotFound { path: String },
    #[error("source `{path}` has unsupported format `{extension}`")]
    UnsupportedSourceFormat { path: String, extension: String },
    #[error("failed to parse `{path}`: {reason}")]
    SourceParseError { path: String, reason: String },
    #[error("sheet `{sheet}` not found in `{path}`")]
    SheetNotFound { path: String, sheet: String },
}

impl LoadError {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::SourceNotFound { .. } => "SourceNotFound",
            LoadError::UnsupportedSourceFormat { .. } => "UnsupportedSourceFormat",
            LoadError::SourceParseError { .. } => "SourceParseError",
            LoadError::SheetNotFound { .. } => "SheetNotFound",
        }
    }

    pub(crate) fn parse(path: &Path, reason: impl ToString) -> Self {
        LoadError::SourceParseError {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Anything that can produce a [`Table`] for a source path.
pub trait TableLoader: Sync {
    fn load(&self, path: &Path, sheet: Option<&str>) -> Result<Table, LoadError>;
}

/// File formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited(u8),
    Spreadsheet,
}

impl SourceFormat {
    pub fn detect(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SourceFormat::Delimited(b',')),
            "tsv" | "tab" => Ok(SourceFormat::Delimited(b'\t')),
            "xlsx" | "xlsm" => Ok(SourceFormat::Spreadsheet),
            _ => Err(LoadError::UnsupportedSourceFormat {
                path: path.display().to_string(),
                extension: ext,
            }),
        }
    }
}

/// Loads CSV/TSV and Office Open XML workbooks from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl TableLoader for FileLoader {
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    fn load(&self, path: &Path, sheet: Option<&str>) -> Result<Table, LoadError> {
        if !path.is_file() {
            return Err(LoadError::SourceNotFound {
                path: path.display().to_string(),
            });
        }
        let name = source_name(path);
        let table = match SourceFormat::detect(path)? {
            SourceFormat::Delimited(delimiter) => {
                if sheet.is_some() {
                    debug!("ignoring sheet selector for delimited source");
                }
                delimited::read_delimited(path, &name, delimiter)?
            }
            SourceFormat::Spreadsheet => xlsx::read_workbook(path, &name, sheet)?,
        };
        debug!(
            columns = table.column_count(),
            rows = table.row_count(),
            "loaded table"
        );
        Ok(table)
    }
}

/// The base file name of a source, used in report keys.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Make header names usable as column identifiers: blanks become
/// `Unnamed: {i}` and repeats get `.1`, `.2`, ... suffixes.
pub fn normalize_headers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    for (i, header) in raw.into_iter().enumerate() {
        let header = header.as_ref().trim();
        let base = if header.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            header.to_string()
        };
        let mut name = base.clone();
        while seen.contains_key(&name) {
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            name = format!("{}.{}", base, count);
        }
        seen.insert(name.clone(), 0);
        out.push(name);
    }
    out
}
