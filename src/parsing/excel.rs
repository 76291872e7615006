#![cfg(feature = "excel")]

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::NaiveDateTime;

use crate::error::{ParseError, ParseResult};
use crate::types::{ParsedFile, RawRow, Value};

use super::FileFormat;

/// Parse a workbook (`.xlsx`, `.xls`, `.ods`, etc.) held in memory into a [`ParsedFile`].
///
/// Behavior:
/// - Uses the first sheet in workbook order; other sheets are ignored
/// - The first row of the sheet's used range is the header row
/// - Empty header cells are named `__EMPTY`, repeated names get `_1`, `_2`, ... suffixes
/// - Rows with no non-empty cell are skipped
/// - Empty cells become [`Value::Null`]
pub fn parse_excel_from_bytes(file_name: &str, bytes: &[u8]) -> ParseResult<ParsedFile> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook.worksheet_range_at(0).ok_or(ParseError::NoSheets)??;
    parse_sheet_range(file_name, &range)
}

fn parse_sheet_range(file_name: &str, range: &Range<Data>) -> ParseResult<ParsedFile> {
    let mut sheet_rows = range.rows();

    let headers = match sheet_rows.next() {
        Some(cells) => unique_headers(cells.iter().map(cell_to_header_string)),
        None => return Err(ParseError::NoDataRows),
    };

    let mut rows: Vec<RawRow> = Vec::new();
    for cells in sheet_rows {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        let mut row = RawRow::new();
        for (idx, header) in headers.iter().enumerate() {
            let cell = cells.get(idx).unwrap_or(&Data::Empty);
            row.insert(header.clone(), convert_cell(cell));
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ParseError::NoDataRows);
    }

    Ok(ParsedFile {
        file_name: file_name.to_string(),
        format: FileFormat::Excel,
        headers,
        rows,
    })
}

fn unique_headers(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in raw {
        let base = if name.is_empty() { "__EMPTY".to_string() } else { name };
        let mut candidate = base.clone();
        let mut suffix = 0usize;
        while out.contains(&candidate) {
            suffix += 1;
            candidate = format!("{base}_{suffix}");
        }
        out.push(candidate);
    }
    out
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Empty => String::new(),
        other => convert_cell(other).to_text().unwrap_or_default(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => Value::Utf8(render_datetime(ndt, dt.as_f64().fract() != 0.0)),
            None => Value::Float64(dt.as_f64()),
        },
        Data::DateTimeIso(s) => Value::Utf8(s.clone()),
        Data::DurationIso(s) => Value::Utf8(s.clone()),
        Data::Error(e) => Value::Utf8(format!("{e:?}")),
    }
}

// Date-only cells (dates of birth) render as YYYY-MM-DD.
fn render_datetime(ndt: NaiveDateTime, with_time: bool) -> String {
    let fmt = if with_time { "%Y-%m-%dT%H:%M:%S" } else { "%Y-%m-%d" };
    ndt.format(fmt).to_string()
}
