#![cfg(feature = "excel_test_writer")]

use std::sync::Arc;

use clinic_import::gateway::MemoryGateway;
use clinic_import::importer::{BatchImporter, ImportPhase};
use clinic_import::normalize::NormalizedRecord;
use clinic_import::parsing::{parse_file, FileFormat};
use clinic_import::types::{ImportType, Value};
use clinic_import::ParseError;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

fn insurance_xlsx() -> Vec<u8> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("Providers").unwrap();

    // header
    ws.write_string(0, 0, "insurance_name").unwrap();
    ws.write_string(0, 1, "contact_phone").unwrap();
    ws.write_string(0, 2, "Contact Email").unwrap();

    ws.write_string(1, 0, "Delta Dental").unwrap();
    ws.write_number(1, 1, 8007656003.0).unwrap();
    ws.write_string(1, 2, "claims@delta.example").unwrap();

    // row 2 left empty on purpose

    ws.write_string(3, 0, "MetLife").unwrap();
    ws.write_string(3, 2, "dental@metlife.example").unwrap();

    // Second sheet is never read.
    let other = wb.add_worksheet();
    other.write_string(0, 0, "first_name").unwrap();
    other.write_string(1, 0, "Ada").unwrap();

    wb.save_to_buffer().unwrap()
}

fn patients_xlsx() -> Vec<u8> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    let date = Format::new().set_num_format("yyyy-mm-dd");

    ws.write_string(0, 0, "First Name").unwrap();
    ws.write_string(0, 1, "last_name").unwrap();
    ws.write_string(0, 2, "Date of Birth").unwrap();
    ws.write_string(0, 3, "Allergies").unwrap();

    ws.write_string(1, 0, "Grace").unwrap();
    ws.write_string(1, 1, "Hopper").unwrap();
    let dob = ExcelDateTime::from_ymd(1906, 12, 9).unwrap();
    ws.write_datetime_with_format(1, 2, &dob, &date).unwrap();
    ws.write_string(1, 3, "Latex").unwrap();

    ws.write_string(2, 1, "Nameless").unwrap();

    wb.save_to_buffer().unwrap()
}

fn header_only_xlsx() -> Vec<u8> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.write_string(0, 0, "first_name").unwrap();
    ws.write_string(0, 1, "last_name").unwrap();
    wb.save_to_buffer().unwrap()
}

#[test]
fn first_sheet_is_parsed_and_empty_rows_skipped() {
    let parsed = parse_file("providers.xlsx", &insurance_xlsx()).unwrap();

    assert_eq!(parsed.format, FileFormat::Excel);
    assert_eq!(parsed.headers, vec!["insurance_name", "contact_phone", "Contact Email"]);
    assert_eq!(parsed.row_count(), 2);
    assert_eq!(parsed.rows[0].get("contact_phone"), Some(&Value::Float64(8007656003.0)));
    // Empty cells are kept as nulls so every row carries every header.
    assert_eq!(parsed.rows[1].get("contact_phone"), Some(&Value::Null));
}

#[test]
fn extension_match_is_case_insensitive() {
    let parsed = parse_file("PROVIDERS.XLSX", &insurance_xlsx()).unwrap();
    assert_eq!(parsed.row_count(), 2);
}

#[test]
fn header_only_workbook_is_a_parse_error() {
    let err = parse_file("empty.xlsx", &header_only_xlsx()).unwrap_err();
    assert!(matches!(err, ParseError::NoDataRows));
}

#[test]
fn corrupt_workbook_is_a_parse_error() {
    let err = parse_file("broken.xlsx", b"definitely not a zip archive").unwrap_err();
    assert!(matches!(err, ParseError::Excel(_)));
}

#[tokio::test]
async fn insurance_workbook_imports_numbers_as_text() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut importer = BatchImporter::new(gateway.clone());

    importer.load("providers.xlsx", &insurance_xlsx()).unwrap();
    assert_eq!(importer.import_type(), Some(ImportType::InsuranceProvider));

    let result = importer.run().await.unwrap();
    assert_eq!((result.success, result.total), (2, 2));

    let records = gateway.records();
    let NormalizedRecord::InsuranceProvider(delta) = &records[0].1 else {
        panic!("expected an insurance provider");
    };
    assert_eq!(delta.contact_phone.as_deref(), Some("8007656003"));
    assert_eq!(delta.contact_email.as_deref(), Some("claims@delta.example"));
}

#[tokio::test]
async fn patient_workbook_dates_render_as_iso() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut importer = BatchImporter::new(gateway.clone());

    importer.load("patients.xlsx", &patients_xlsx()).unwrap();
    // "First Name" is not a detection marker, but "last_name" is.
    assert_eq!(importer.import_type(), Some(ImportType::Patient));

    let result = importer.run().await.unwrap();
    assert_eq!(result.success, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].to_string(), "Row 2: First name and last name are required");

    let records = gateway.records();
    let NormalizedRecord::Patient(grace) = &records[0].1 else {
        panic!("expected a patient");
    };
    assert_eq!(grace.first_name, "Grace");
    assert_eq!(grace.date_of_birth.as_deref(), Some("1906-12-09"));
    assert_eq!(grace.allergies.as_deref(), Some("Latex"));
}

#[tokio::test]
async fn header_only_workbook_fails_the_import() {
    let gateway = Arc::new(MemoryGateway::new());
    let mut importer = BatchImporter::new(gateway.clone());

    let phase = importer.load("empty.xlsx", &header_only_xlsx()).unwrap();
    assert_eq!(phase, ImportPhase::Failed);

    let result = importer.result().unwrap();
    assert_eq!((result.success, result.total), (0, 0));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].row, 0);
    assert_eq!(result.errors[0].message, "Failed to parse file: file contains no data rows");
    assert!(gateway.is_empty());
}
