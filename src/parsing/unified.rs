//! Unified parsing entrypoint.
//!
//! Most callers should use [`parse_file`], which picks a parser from the uploaded file's name
//! and returns a fully materialized [`ParsedFile`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};
use crate::types::ParsedFile;

use super::csv;

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    /// Comma-separated values.
    Csv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl FileFormat {
    /// Parse a file format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Infer the format from a file name such as `patients.xlsx`.
    pub fn from_file_name(file_name: &str) -> ParseResult<Self> {
        Path::new(file_name)
            .extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| ParseError::UnsupportedFormat {
                file_name: file_name.to_string(),
            })
    }
}

/// Parse an uploaded file held in memory.
///
/// The format is chosen from `file_name`'s extension:
///
/// - `.csv` is split naively on commas (see [`super::csv`])
/// - `.xlsx` / `.xls` (and other workbook formats) read the first sheet only
///
/// Fails when the extension is not supported, when the content cannot be decoded, or when the
/// file holds no data rows.
///
/// ```
/// use clinic_import::parsing::parse_file;
///
/// let parsed = parse_file("patients.csv", b"first_name,last_name\nAda,Lovelace\n").unwrap();
/// assert_eq!(parsed.row_count(), 1);
/// assert_eq!(parsed.headers, vec!["first_name", "last_name"]);
/// ```
pub fn parse_file(file_name: &str, bytes: &[u8]) -> ParseResult<ParsedFile> {
    match FileFormat::from_file_name(file_name)? {
        FileFormat::Csv => csv::parse_csv_from_bytes(file_name, bytes),
        FileFormat::Excel => parse_excel_dispatch(file_name, bytes),
    }
}

/// Read a file from disk and parse it with [`parse_file`].
///
/// The file name (last path component) is what the parsed result reports.
pub fn parse_path(path: impl AsRef<Path>) -> ParseResult<ParsedFile> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ParseError::UnsupportedFormat {
            file_name: path.display().to_string(),
        })?;
    // Reject unsupported names before touching the disk.
    FileFormat::from_file_name(file_name)?;

    let bytes = fs::read(path)?;
    parse_file(file_name, &bytes)
}

fn parse_excel_dispatch(file_name: &str, bytes: &[u8]) -> ParseResult<ParsedFile> {
    // Avoid unused warnings when the feature is off.
    let _ = (file_name, bytes);

    #[cfg(feature = "excel")]
    {
        super::excel::parse_excel_from_bytes(file_name, bytes)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(ParseError::UnsupportedFormat {
            file_name: format!("{file_name} (excel support not enabled; enable cargo feature 'excel')"),
        })
    }
}
