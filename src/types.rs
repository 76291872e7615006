//! Core data model types for import.
//!
//! Parsing turns a file into a [`ParsedFile`]: an ordered list of [`RawRow`]s whose cells are
//! [`Value`]s keyed by the header text found in the file. Nothing here knows about patients or
//! insurance providers; that mapping lives in [`crate::normalize`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parsing::FileFormat;

/// A single cell value as read from the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty cell.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// `true` for [`Value::Null`] and for an empty string.
    ///
    /// Whitespace-only strings are not blank: the CSV parser already trims cells, and spreadsheet
    /// text is taken as typed.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Utf8(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Render the value as text, or `None` when it is blank.
    ///
    /// Integral floats render without a fractional part, so a phone number stored as a number
    /// in a spreadsheet comes out as `5551234` rather than `5551234.0`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Utf8(s) if s.is_empty() => None,
            Value::Utf8(s) => Some(s.clone()),
            Value::Int64(i) => Some(i.to_string()),
            Value::Float64(f) => {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    Some((*f as i64).to_string())
                } else {
                    Some(f.to_string())
                }
            }
            Value::Bool(b) => Some(b.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(s) => f.write_str(&s),
            None => Ok(()),
        }
    }
}

/// One parsed input record: header text -> cell value, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, Value)>,
}

impl RawRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(header, value)` pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            cells: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Append a cell. A header that is already present is overwritten in place.
    pub fn insert(&mut self, header: impl Into<String>, value: Value) {
        let header = header.into();
        match self.cells.iter_mut().find(|(h, _)| *h == header) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((header, value)),
        }
    }

    /// Look up a cell by its exact header text.
    pub fn get(&self, header: &str) -> Option<&Value> {
        self.cells.iter().find(|(h, _)| h == header).map(|(_, v)| v)
    }

    /// Iterate header names in column order.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    /// Iterate `(header, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v))
    }

    /// Number of cells in the row.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// `true` if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A fully materialized input file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile {
    /// Name the file was uploaded under.
    pub file_name: String,
    /// Format the file was parsed as.
    pub format: FileFormat,
    /// Header row, in column order.
    pub headers: Vec<String>,
    /// Data rows in file order (header excluded).
    pub rows: Vec<RawRow>,
}

impl ParsedFile {
    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The first data row, used for type detection.
    pub fn first_row(&self) -> Option<&RawRow> {
        self.rows.first()
    }
}

/// The kind of record a file holds, decided once per file from its headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    /// Patient demographics and contact details.
    Patient,
    /// Insurance provider directory entries.
    InsuranceProvider,
    /// Neither header family was found; the caller must decide.
    Unknown,
}

impl ImportType {
    /// The remote collection rows of this type are inserted into.
    ///
    /// `None` for [`ImportType::Unknown`].
    pub fn collection(self) -> Option<Collection> {
        match self {
            ImportType::Patient => Some(Collection::Patients),
            ImportType::InsuranceProvider => Some(Collection::InsuranceProviders),
            ImportType::Unknown => None,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            ImportType::Patient => "Patients",
            ImportType::InsuranceProvider => "Insurance Providers",
            ImportType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ImportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Target collection (table) in the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// `patients`
    Patients,
    /// `insurance_providers`
    InsuranceProviders,
}

impl Collection {
    /// Table name as known to the remote store.
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::InsuranceProviders => "insurance_providers",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
