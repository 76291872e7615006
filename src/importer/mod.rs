//! Batch import state machine.
//!
//! A [`BatchImporter`] owns one upload at a time and walks it through
//!
//! ```text
//! Idle -> Parsing -> PreviewReady -> Importing -> Complete
//!            \
//!             -> Failed
//! ```
//!
//! Rows are imported strictly in file order, one gateway call at a time. A row that fails
//! validation or is rejected by the gateway is recorded in the [`ImportResult`] and the run moves
//! on; only a file that cannot be parsed stops the pipeline, and it does so before any row is
//! touched.

mod observer;
mod result;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::classify::classify_file;
use crate::error::{ImportError, ParseError};
use crate::gateway::PersistenceGateway;
use crate::normalize::{normalize, unmapped_headers};
use crate::parsing::{parse_file, parse_path};
use crate::types::{ImportType, ParsedFile, RawRow};

pub use observer::{
    CompositeObserver, FileObserver, ImportEvent, ImportMetrics, ImportMetricsSnapshot, ImportObserver,
    TracingObserver,
};
pub use result::{ImportOutcome, ImportProgress, ImportResult, RowFailure};

/// Where a [`BatchImporter`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Idle,
    Parsing,
    PreviewReady,
    Importing,
    Complete,
    Failed,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportPhase::Idle => "idle",
            ImportPhase::Parsing => "parsing",
            ImportPhase::PreviewReady => "preview_ready",
            ImportPhase::Importing => "importing",
            ImportPhase::Complete => "complete",
            ImportPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Options controlling the importer.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ImportOptions {
    /// Number of rows exposed by [`BatchImporter::preview`].
    pub preview_rows: usize,
    /// Optional observer for progress/logging.
    pub observer: Option<Arc<dyn ImportObserver>>,
}

impl fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportOptions")
            .field("preview_rows", &self.preview_rows)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            observer: None,
        }
    }
}

/// What the user is shown before confirming an import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPreview {
    pub file_name: String,
    /// Detected (or resolved) record type.
    pub import_type: ImportType,
    pub headers: Vec<String>,
    /// Columns the detected type does not read; they are dropped on import.
    pub unmapped_headers: Vec<String>,
    /// The first few rows of the file.
    pub rows: Vec<RawRow>,
    /// Number of rows that will be imported.
    pub total: usize,
}

impl ImportPreview {
    /// `false` while the record type is unknown.
    pub fn can_import(&self) -> bool {
        self.import_type != ImportType::Unknown
    }
}

enum State {
    Idle,
    Parsing,
    PreviewReady { file: ParsedFile, import_type: ImportType },
    Importing,
    Complete(ImportResult),
    Failed(ImportResult),
}

impl State {
    fn phase(&self) -> ImportPhase {
        match self {
            State::Idle => ImportPhase::Idle,
            State::Parsing => ImportPhase::Parsing,
            State::PreviewReady { .. } => ImportPhase::PreviewReady,
            State::Importing => ImportPhase::Importing,
            State::Complete(_) => ImportPhase::Complete,
            State::Failed(_) => ImportPhase::Failed,
        }
    }
}

/// Drives one upload from file bytes to an [`ImportResult`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use clinic_import::gateway::MemoryGateway;
/// use clinic_import::importer::{BatchImporter, ImportPhase};
/// use clinic_import::types::ImportType;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let gateway = Arc::new(MemoryGateway::new());
/// let mut importer = BatchImporter::new(gateway.clone());
///
/// importer.load("patients.csv", b"first_name,last_name\nAda,Lovelace\n").unwrap();
/// assert_eq!(importer.phase(), ImportPhase::PreviewReady);
/// assert_eq!(importer.import_type(), Some(ImportType::Patient));
///
/// let result = importer.run().await.unwrap();
/// assert_eq!((result.success, result.total), (1, 1));
/// assert_eq!(gateway.len(), 1);
/// # }
/// ```
pub struct BatchImporter {
    gateway: Arc<dyn PersistenceGateway>,
    options: ImportOptions,
    metrics: Arc<ImportMetrics>,
    state: State,
}

impl fmt::Debug for BatchImporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchImporter")
            .field("phase", &self.phase())
            .field("options", &self.options)
            .finish()
    }
}

impl BatchImporter {
    /// Create an importer writing through `gateway`, with default options.
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self::with_options(gateway, ImportOptions::default())
    }

    /// Create an importer with explicit options.
    pub fn with_options(gateway: Arc<dyn PersistenceGateway>, options: ImportOptions) -> Self {
        Self {
            gateway,
            options,
            metrics: Arc::new(ImportMetrics::new()),
            state: State::Idle,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ImportPhase {
        self.state.phase()
    }

    /// Get a handle to real-time import metrics.
    pub fn metrics(&self) -> Arc<ImportMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Record type of the loaded file, while it is awaiting confirmation.
    pub fn import_type(&self) -> Option<ImportType> {
        match &self.state {
            State::PreviewReady { import_type, .. } => Some(*import_type),
            _ => None,
        }
    }

    /// Preview of the loaded file, while it is awaiting confirmation.
    pub fn preview(&self) -> Option<ImportPreview> {
        let State::PreviewReady { file, import_type } = &self.state else {
            return None;
        };
        Some(ImportPreview {
            file_name: file.file_name.clone(),
            import_type: *import_type,
            headers: file.headers.clone(),
            unmapped_headers: unmapped_headers(&file.headers, *import_type)
                .into_iter()
                .map(str::to_string)
                .collect(),
            rows: file.rows.iter().take(self.options.preview_rows).cloned().collect(),
            total: file.row_count(),
        })
    }

    /// Ledger of the last run (or of the parse failure).
    pub fn result(&self) -> Option<&ImportResult> {
        match &self.state {
            State::Complete(result) | State::Failed(result) => Some(result),
            _ => None,
        }
    }

    /// Parse an uploaded file and classify it.
    ///
    /// Replaces whatever file was loaded before. Returns the resulting phase:
    /// [`ImportPhase::PreviewReady`] on success, [`ImportPhase::Failed`] when the file could not be
    /// parsed (see [`Self::result`] for the message).
    pub fn load(&mut self, file_name: &str, bytes: &[u8]) -> Result<ImportPhase, ImportError> {
        self.begin_parse("load a file")?;
        let parsed = parse_file(file_name, bytes);
        Ok(self.finish_parse(file_name, parsed))
    }

    /// Read a file from disk, then behave like [`Self::load`].
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> Result<ImportPhase, ImportError> {
        let path = path.as_ref();
        self.begin_parse("load a file")?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| path.display().to_string());
        let parsed = parse_path(path);
        Ok(self.finish_parse(&file_name, parsed))
    }

    /// Set the record type of the loaded file, e.g. when detection came back
    /// [`ImportType::Unknown`].
    pub fn resolve_import_type(&mut self, resolved: ImportType) -> Result<(), ImportError> {
        if resolved == ImportType::Unknown {
            return Err(ImportError::UnknownImportType);
        }
        match &mut self.state {
            State::PreviewReady { import_type, .. } => {
                debug!(from = %import_type, to = %resolved, "import type resolved");
                *import_type = resolved;
                Ok(())
            }
            other => Err(ImportError::InvalidState {
                operation: "resolve the import type",
                state: other.phase(),
            }),
        }
    }

    /// Import every row of the loaded file.
    ///
    /// Requires [`ImportPhase::PreviewReady`] and a known record type. Rows are normalized and
    /// inserted one at a time in file order; failures are recorded and never stop the run. There
    /// is no retry.
    ///
    /// Dropping the returned future before it completes (a timeout, a lost `select!` branch)
    /// abandons the run: the importer ends in [`ImportPhase::Failed`] with the rows handled so far
    /// plus a row-0 entry saying where it stopped.
    pub async fn run(&mut self) -> Result<ImportResult, ImportError> {
        let (file, import_type) = match std::mem::replace(&mut self.state, State::Idle) {
            State::PreviewReady { file, import_type } if import_type != ImportType::Unknown => {
                (file, import_type)
            }
            State::PreviewReady { file, import_type } => {
                self.state = State::PreviewReady { file, import_type };
                return Err(ImportError::UnknownImportType);
            }
            other => {
                let state = other.phase();
                self.state = other;
                return Err(ImportError::InvalidState {
                    operation: "start an import",
                    state,
                });
            }
        };

        let total = file.row_count();
        self.transition(ImportPhase::PreviewReady, State::Importing);
        self.metrics.begin_run();

        let mut run = RunGuard {
            importer: self,
            result: ImportResult::new(total),
            finished: false,
        };
        for (idx0, row) in file.rows.iter().enumerate() {
            let row_num = idx0 + 1;
            let outcome = run.importer.import_row(row_num, row, import_type).await;
            match &outcome {
                ImportOutcome::Success => run.importer.metrics.on_row_succeeded(),
                ImportOutcome::Failure(failure) => {
                    run.importer.metrics.on_row_failed();
                    run.importer.emit(ImportEvent::RowFailed(failure.clone()));
                }
            }
            run.result.record(outcome);
            run.importer.emit(ImportEvent::Progress(ImportProgress {
                processed: row_num,
                total,
            }));
        }
        run.finished = true;
        let result = std::mem::take(&mut run.result);
        let importer = &mut *run.importer;

        importer.metrics.end_run();
        importer.emit(ImportEvent::Completed {
            success: result.success,
            failed: result.failed(),
            total: result.total,
            metrics: importer.metrics.snapshot(),
        });
        importer.transition(ImportPhase::Importing, State::Complete(result.clone()));
        Ok(result)
    }

    /// Drop the loaded file or the last result and return to [`ImportPhase::Idle`].
    pub fn reset(&mut self) -> Result<(), ImportError> {
        let from = self.phase();
        match from {
            ImportPhase::Parsing | ImportPhase::Importing => Err(ImportError::InvalidState {
                operation: "reset",
                state: from,
            }),
            ImportPhase::Idle => Ok(()),
            _ => {
                self.transition(from, State::Idle);
                Ok(())
            }
        }
    }

    async fn import_row(&self, row_num: usize, row: &RawRow, import_type: ImportType) -> ImportOutcome {
        let record = match normalize(row, import_type) {
            Ok(record) => record,
            Err(e) => {
                return ImportOutcome::Failure(RowFailure {
                    row: row_num,
                    message: e.to_string(),
                });
            }
        };

        let started = Instant::now();
        let inserted = self.gateway.insert(record.collection(), &record).await;
        self.metrics.on_gateway_wait(started.elapsed());

        match inserted {
            Ok(()) => {
                debug!(row = row_num, collection = %record.collection(), "row inserted");
                ImportOutcome::Success
            }
            Err(e) => ImportOutcome::Failure(RowFailure {
                row: row_num,
                message: e.to_string(),
            }),
        }
    }

    fn begin_parse(&mut self, operation: &'static str) -> Result<(), ImportError> {
        let from = self.phase();
        if matches!(from, ImportPhase::Parsing | ImportPhase::Importing) {
            return Err(ImportError::InvalidState { operation, state: from });
        }
        self.transition(from, State::Parsing);
        Ok(())
    }

    fn finish_parse(&mut self, file_name: &str, parsed: Result<ParsedFile, ParseError>) -> ImportPhase {
        match parsed {
            Ok(file) => {
                let import_type = classify_file(&file);
                self.emit(ImportEvent::FileParsed {
                    file_name: file.file_name.clone(),
                    rows: file.row_count(),
                    import_type,
                });
                self.transition(ImportPhase::Parsing, State::PreviewReady { file, import_type });
            }
            Err(e) => {
                self.emit(ImportEvent::ParseFailed {
                    file_name: file_name.to_string(),
                    message: e.to_string(),
                });
                self.transition(ImportPhase::Parsing, State::Failed(ImportResult::parse_failure(&e)));
            }
        }
        self.phase()
    }

    fn transition(&mut self, from: ImportPhase, to: State) {
        let to_phase = to.phase();
        self.state = to;
        self.emit(ImportEvent::PhaseChanged { from, to: to_phase });
    }

    fn emit(&self, event: ImportEvent) {
        if let Some(obs) = &self.options.observer {
            obs.on_event(&event);
        }
    }
}

// Moves an abandoned run to `Failed` so the importer can be reset or reloaded.
struct RunGuard<'a> {
    importer: &'a mut BatchImporter,
    result: ImportResult,
    finished: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut ledger = std::mem::take(&mut self.result);
        let processed = ledger.success + ledger.failed();
        warn!(processed, total = ledger.total, "import abandoned before completion");
        ledger.errors.push(RowFailure {
            row: 0,
            message: format!("Import interrupted after {processed} of {} rows", ledger.total),
        });
        self.importer.metrics.end_run();
        self.importer.transition(ImportPhase::Importing, State::Failed(ledger));
    }
}
