//! Column alias resolution.
//!
//! Every target field has a fixed, ordered list of source headers it may come from. The first
//! alias whose cell is non-blank wins; values from different aliases are never merged.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Collection, ImportType, RawRow};

/// A target field and the source headers it is read from, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Column name in the remote collection.
    pub name: &'static str,
    /// Accepted source headers, probed in order. Matching is exact.
    pub aliases: &'static [&'static str],
    /// Whether a row without this field fails validation.
    pub required: bool,
}

impl FieldSpec {
    const fn required(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases, required: true }
    }

    const fn optional(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases, required: false }
    }

    /// Resolve this field against a row: the first non-blank aliased cell, as text.
    pub fn resolve(&self, row: &RawRow) -> Option<String> {
        self.aliases
            .iter()
            .filter_map(|alias| row.get(alias))
            .find(|value| !value.is_blank())
            .and_then(|value| value.to_text())
    }
}

pub const FIRST_NAME: FieldSpec = FieldSpec::required("first_name", &["first_name", "firstName", "First Name"]);
pub const LAST_NAME: FieldSpec = FieldSpec::required("last_name", &["last_name", "lastName", "Last Name"]);
pub const DATE_OF_BIRTH: FieldSpec = FieldSpec::optional("date_of_birth", &["date_of_birth", "dob", "Date of Birth"]);
pub const PHONE: FieldSpec = FieldSpec::optional("phone", &["phone", "phone_number", "Phone Number"]);
pub const EMAIL: FieldSpec = FieldSpec::optional("email", &["email", "Email Address"]);
pub const ADDRESS: FieldSpec = FieldSpec::optional("address", &["address", "Address"]);
pub const EMERGENCY_CONTACT_NAME: FieldSpec =
    FieldSpec::optional("emergency_contact_name", &["emergency_contact_name", "Emergency Contact"]);
pub const EMERGENCY_CONTACT_PHONE: FieldSpec =
    FieldSpec::optional("emergency_contact_phone", &["emergency_contact_phone", "Emergency Phone"]);
pub const MEDICAL_HISTORY: FieldSpec = FieldSpec::optional("medical_history", &["medical_history", "Medical History"]);
pub const ALLERGIES: FieldSpec = FieldSpec::optional("allergies", &["allergies", "Allergies"]);

pub const INSURANCE_NAME: FieldSpec =
    FieldSpec::required("name", &["insurance_name", "provider_name", "name", "Insurance Name"]);
pub const CONTACT_PHONE: FieldSpec = FieldSpec::optional("contact_phone", &["contact_phone", "phone", "Contact Phone"]);
pub const CONTACT_EMAIL: FieldSpec = FieldSpec::optional("contact_email", &["contact_email", "email", "Contact Email"]);
pub const PROVIDER_ADDRESS: FieldSpec = FieldSpec::optional("address", &["address", "Address"]);

/// All patient fields, in record order.
pub const PATIENT_FIELDS: &[FieldSpec] = &[
    FIRST_NAME,
    LAST_NAME,
    DATE_OF_BIRTH,
    PHONE,
    EMAIL,
    ADDRESS,
    EMERGENCY_CONTACT_NAME,
    EMERGENCY_CONTACT_PHONE,
    MEDICAL_HISTORY,
    ALLERGIES,
];

/// All insurance provider fields, in record order.
pub const INSURANCE_PROVIDER_FIELDS: &[FieldSpec] = &[INSURANCE_NAME, CONTACT_PHONE, CONTACT_EMAIL, PROVIDER_ADDRESS];

/// A row in the `patients` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
}

impl PatientRecord {
    /// Map a raw row onto the patient fields.
    pub fn from_row(row: &RawRow) -> Result<Self, ValidationError> {
        let (Some(first_name), Some(last_name)) = (FIRST_NAME.resolve(row), LAST_NAME.resolve(row)) else {
            return Err(ValidationError::MissingPatientName);
        };

        Ok(Self {
            first_name,
            last_name,
            date_of_birth: DATE_OF_BIRTH.resolve(row),
            phone: PHONE.resolve(row),
            email: EMAIL.resolve(row),
            address: ADDRESS.resolve(row),
            emergency_contact_name: EMERGENCY_CONTACT_NAME.resolve(row),
            emergency_contact_phone: EMERGENCY_CONTACT_PHONE.resolve(row),
            medical_history: MEDICAL_HISTORY.resolve(row),
            allergies: ALLERGIES.resolve(row),
        })
    }
}

/// A row in the `insurance_providers` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceProviderRecord {
    pub name: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub address: Option<String>,
}

impl InsuranceProviderRecord {
    /// Map a raw row onto the insurance provider fields.
    pub fn from_row(row: &RawRow) -> Result<Self, ValidationError> {
        let name = INSURANCE_NAME
            .resolve(row)
            .ok_or(ValidationError::MissingInsuranceName)?;

        Ok(Self {
            name,
            contact_phone: CONTACT_PHONE.resolve(row),
            contact_email: CONTACT_EMAIL.resolve(row),
            address: PROVIDER_ADDRESS.resolve(row),
        })
    }
}

/// A row mapped onto its target entity. Serializes as the bare record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NormalizedRecord {
    Patient(PatientRecord),
    InsuranceProvider(InsuranceProviderRecord),
}

impl NormalizedRecord {
    /// Collection the record belongs to.
    pub fn collection(&self) -> Collection {
        match self {
            NormalizedRecord::Patient(_) => Collection::Patients,
            NormalizedRecord::InsuranceProvider(_) => Collection::InsuranceProviders,
        }
    }
}

/// Normalize one row for the file's import type.
pub fn normalize(row: &RawRow, import_type: ImportType) -> Result<NormalizedRecord, ValidationError> {
    match import_type {
        ImportType::Patient => PatientRecord::from_row(row).map(NormalizedRecord::Patient),
        ImportType::InsuranceProvider => {
            InsuranceProviderRecord::from_row(row).map(NormalizedRecord::InsuranceProvider)
        }
        ImportType::Unknown => Err(ValidationError::UnknownImportType),
    }
}

/// Field table for an import type (empty for [`ImportType::Unknown`]).
pub fn fields_for(import_type: ImportType) -> &'static [FieldSpec] {
    match import_type {
        ImportType::Patient => PATIENT_FIELDS,
        ImportType::InsuranceProvider => INSURANCE_PROVIDER_FIELDS,
        ImportType::Unknown => &[],
    }
}

/// Headers that no field of `import_type` reads from. These columns are ignored on import.
pub fn unmapped_headers<'a>(headers: &'a [String], import_type: ImportType) -> Vec<&'a str> {
    let fields = fields_for(import_type);
    headers
        .iter()
        .map(String::as_str)
        .filter(|h| !fields.iter().any(|f| f.aliases.iter().any(|a| a == h)))
        .collect()
}
