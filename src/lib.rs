//! `clinic-import` turns uploaded CSV and spreadsheet files into patient and insurance-provider
//! records for a dental practice database.
//!
//! The pipeline is:
//!
//! 1. [`parsing`]: read the file into header-keyed [`types::RawRow`]s (CSV, or the first sheet of
//!    an `.xlsx`/`.xls` workbook).
//! 2. [`classify`]: decide from the column names whether the file holds patients or insurance
//!    providers.
//! 3. [`normalize`]: map each row's columns onto the canonical record fields using per-field alias
//!    lists.
//! 4. [`importer`]: insert rows one at a time through a [`gateway::PersistenceGateway`], recording
//!    per-row failures and progress instead of aborting.
//!
//! ## What you can import
//!
//! **File formats (detected by extension, case-insensitive):**
//!
//! - **CSV**: `.csv` (split on commas, no quoting support; `"` characters are removed from cells)
//! - **Workbooks** (requires the Cargo feature `excel`): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//!
//! **Record types:**
//!
//! - [`types::ImportType::Patient`] rows need a first and last name.
//! - [`types::ImportType::InsuranceProvider`] rows need a provider name.
//!
//! Columns outside the alias lists are dropped; [`importer::ImportPreview::unmapped_headers`]
//! lists them before the user confirms.
//!
//! ## Quick example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use clinic_import::gateway::MemoryGateway;
//! use clinic_import::importer::BatchImporter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), clinic_import::ImportError> {
//! let csv = "first_name,last_name,Phone Number\nAda,Lovelace,555-0100\n,Hopper,555-0101\n";
//!
//! let mut importer = BatchImporter::new(Arc::new(MemoryGateway::new()));
//! importer.load("patients.csv", csv.as_bytes())?;
//! let result = importer.run().await?;
//!
//! assert_eq!(result.success, 1);
//! assert_eq!(result.errors[0].to_string(), "Row 2: First name and last name are required");
//! println!("{result}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Writing to the hosted database
//!
//! With the `postgrest` feature (on by default), [`gateway::PostgrestGateway`] inserts each record
//! with a `POST /rest/v1/<table>` call. Connection settings come from `SUPABASE_URL` and
//! `SUPABASE_ANON_KEY` (the `NEXT_PUBLIC_` prefixed names are accepted too):
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use clinic_import::gateway::PostgrestGateway;
//! use clinic_import::importer::{BatchImporter, ImportOptions, TracingObserver};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(PostgrestGateway::from_env()?);
//! let options = ImportOptions {
//!     observer: Some(Arc::new(TracingObserver)),
//!     ..Default::default()
//! };
//! let mut importer = BatchImporter::with_options(gateway, options);
//! importer.load_path("insurance.xlsx")?;
//! if let Some(preview) = importer.preview() {
//!     println!("{} rows of {}", preview.total, preview.import_type);
//! }
//! let result = importer.run().await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`parsing`]: file format detection and CSV/workbook readers
//! - [`classify`]: record-type detection from headers
//! - [`normalize`]: alias tables and canonical record types
//! - [`gateway`]: the insert seam plus in-memory and PostgREST implementations
//! - [`importer`]: the batch import state machine, its result ledger and observers
//! - [`types`]: cell values, raw rows and record-type enums
//! - [`error`]: error types used across the pipeline

pub mod classify;
pub mod error;
pub mod gateway;
pub mod importer;
pub mod normalize;
pub mod parsing;
pub mod types;

pub use error::{ImportError, ParseError, ParseResult, ValidationError};
