use std::fmt;

use serde::{Deserialize, Serialize};

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 1-based data row number (header excluded). `0` marks a file-level failure.
    pub row: usize,
    /// What went wrong, as shown to the user.
    pub message: String,
}

impl fmt::Display for RowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

/// Outcome of importing a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Success,
    Failure(RowFailure),
}

/// Ledger of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Rows accepted by the gateway.
    pub success: usize,
    /// Rows in the file, fixed before processing starts.
    pub total: usize,
    /// Failed rows in file order.
    pub errors: Vec<RowFailure>,
}

impl ImportResult {
    /// An empty ledger for a run over `total` rows.
    pub fn new(total: usize) -> Self {
        Self {
            success: 0,
            total,
            errors: Vec::new(),
        }
    }

    /// The ledger reported when the file itself could not be parsed.
    pub fn parse_failure(message: impl fmt::Display) -> Self {
        Self {
            success: 0,
            total: 0,
            errors: vec![RowFailure {
                row: 0,
                message: format!("Failed to parse file: {message}"),
            }],
        }
    }

    /// Fold one row outcome into the ledger.
    pub fn record(&mut self, outcome: ImportOutcome) {
        match outcome {
            ImportOutcome::Success => self.success += 1,
            ImportOutcome::Failure(failure) => self.errors.push(failure),
        }
    }

    /// Number of failed rows.
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    /// `true` when every row was imported.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ImportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Import completed: {} successful, {} errors out of {} total records",
            self.success,
            self.failed(),
            self.total
        )
    }
}

/// Rows processed so far in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportProgress {
    pub processed: usize,
    pub total: usize,
}

impl ImportProgress {
    /// Completion percentage in `0.0..=100.0`.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f64 / self.total as f64 * 100.0
    }
}
