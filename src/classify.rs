//! Record type detection.
//!
//! A file's [`ImportType`] is decided once, from the headers of its first row, before any row is
//! normalized.

use crate::types::{ImportType, ParsedFile, RawRow};

/// Lower-cased headers that mark a patient file.
pub const PATIENT_MARKERS: &[&str] = &["first_name", "last_name", "patient_name"];

/// Lower-cased headers that mark an insurance provider file. Checked after [`PATIENT_MARKERS`].
pub const INSURANCE_MARKERS: &[&str] = &["insurance_name", "provider_name"];

/// Classify a set of header names.
///
/// Headers are compared case-insensitively. Patient markers win over insurance markers.
///
/// ```
/// use clinic_import::classify::classify_headers;
/// use clinic_import::types::ImportType;
///
/// assert_eq!(classify_headers(["First_Name", "phone"]), ImportType::Patient);
/// assert_eq!(classify_headers(["provider_name"]), ImportType::InsuranceProvider);
/// assert_eq!(classify_headers(["foo", "bar"]), ImportType::Unknown);
/// ```
pub fn classify_headers<I, S>(headers: I) -> ImportType
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let lowered: Vec<String> = headers
        .into_iter()
        .map(|h| h.as_ref().to_lowercase())
        .collect();
    let has_any = |markers: &[&str]| {
        lowered
            .iter()
            .any(|h| markers.iter().any(|m| *m == h.as_str()))
    };

    if has_any(PATIENT_MARKERS) {
        ImportType::Patient
    } else if has_any(INSURANCE_MARKERS) {
        ImportType::InsuranceProvider
    } else {
        ImportType::Unknown
    }
}

/// Classify a row by its header names.
pub fn classify_row(row: &RawRow) -> ImportType {
    classify_headers(row.headers())
}

/// Classify a parsed file by its first row.
pub fn classify_file(file: &ParsedFile) -> ImportType {
    file.first_row()
        .map(classify_row)
        .unwrap_or(ImportType::Unknown)
}
