//! Parsing entrypoints and implementations.
//!
//! Most callers should use [`parse_file`] (from [`unified`]), which selects a parser by file
//! extension and returns every data row as a [`crate::types::RawRow`].
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod unified;

pub use unified::{parse_file, parse_path, FileFormat};
