use thiserror::Error;

use crate::importer::ImportPhase;

/// Convenience result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// File-level failure: the file could not be turned into rows.
///
/// A parse error stops an import before any row is processed.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "excel")]
    /// Workbook decoding error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// The file name does not carry a supported extension.
    #[error("unsupported file type '{file_name}' (expected .csv, .xlsx or .xls)")]
    UnsupportedFormat { file_name: String },

    /// The workbook contains no sheets.
    #[error("workbook has no sheets")]
    NoSheets,

    /// The file has a header but no data rows (or nothing at all).
    #[error("file contains no data rows")]
    NoDataRows,
}

/// A row is missing a required field for its record type.
///
/// The display text is shown to users next to the row number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("First name and last name are required")]
    MissingPatientName,

    #[error("Insurance provider name is required")]
    MissingInsuranceName,

    /// Rows cannot be normalized until the file's record type is known.
    #[error("Import type could not be determined")]
    UnknownImportType,
}

/// Misuse of the [`crate::importer::BatchImporter`] state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// The requested operation is not valid in the importer's current phase.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ImportPhase,
    },

    /// The file's record type is unknown; resolve it before importing.
    #[error("import type is unknown; resolve it before importing")]
    UnknownImportType,
}
