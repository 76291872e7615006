//! CSV parsing.
//!
//! The split is intentionally naive: lines end at `\n` only, every `,` separates cells and `"` is
//! not a quote character, so quoted cells containing commas or newlines are not supported. All `"`
//! characters are removed from each cell after trimming; the trim also drops the `\r` of CRLF
//! files.
//!
//! Empty lines are skipped everywhere, including before the header: the first non-empty line is
//! the header row.

use crate::error::{ParseError, ParseResult};
use crate::types::{ParsedFile, RawRow, Value};

use super::FileFormat;

/// Parse CSV bytes into a [`ParsedFile`].
///
/// Rules:
///
/// - Bytes are decoded as UTF-8 (invalid sequences are replaced); a leading BOM is dropped.
/// - The first non-blank line is the header row.
/// - Blank lines are skipped and do not count as rows.
/// - Cells are zipped against headers by position: missing trailing cells become `""`,
///   surplus cells are dropped.
pub fn parse_csv_from_bytes(file_name: &str, bytes: &[u8]) -> ParseResult<ParsedFile> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    parse_csv_from_str(file_name, text)
}

/// Parse CSV text into a [`ParsedFile`]. See [`parse_csv_from_bytes`].
pub fn parse_csv_from_str(file_name: &str, text: &str) -> ParseResult<ParsedFile> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_reader(text.as_bytes());
    parse_csv_from_reader(file_name, &mut rdr)
}

/// Parse CSV data from an existing CSV reader.
///
/// The reader should be built with `has_headers(false)`, `quoting(false)`, `flexible(true)` and a
/// `\n` terminator to get the naive split described in the module docs.
pub fn parse_csv_from_reader<R: std::io::Read>(
    file_name: &str,
    rdr: &mut csv::Reader<R>,
) -> ParseResult<ParsedFile> {
    let mut records = rdr.records();

    let mut headers: Vec<String> = Vec::new();
    for result in records.by_ref() {
        let record = result?;
        if !is_blank_line(&record) {
            headers = record.iter().map(clean_cell).collect();
            break;
        }
    }
    if headers.is_empty() {
        return Err(ParseError::NoDataRows);
    }

    let mut rows: Vec<RawRow> = Vec::new();
    for result in records {
        let record = result?;
        if is_blank_line(&record) {
            continue;
        }

        let mut row = RawRow::new();
        for (idx, header) in headers.iter().enumerate() {
            let cell = record.get(idx).map(clean_cell).unwrap_or_default();
            row.insert(header.clone(), Value::Utf8(cell));
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ParseError::NoDataRows);
    }

    Ok(ParsedFile {
        file_name: file_name.to_string(),
        format: FileFormat::Csv,
        headers,
        rows,
    })
}

fn clean_cell(raw: &str) -> String {
    raw.trim().replace('"', "")
}

// A line with no delimiter and only whitespace.
fn is_blank_line(record: &csv::StringRecord) -> bool {
    record.len() <= 1 && record.get(0).is_none_or(|c| c.trim().is_empty())
}
