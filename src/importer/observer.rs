use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::types::ImportType;

use super::result::{ImportProgress, RowFailure};
use super::ImportPhase;

/// Events emitted by the [`super::BatchImporter`].
#[derive(Debug, Clone)]
pub enum ImportEvent {
    PhaseChanged { from: ImportPhase, to: ImportPhase },
    FileParsed {
        file_name: String,
        rows: usize,
        import_type: ImportType,
    },
    ParseFailed { file_name: String, message: String },
    RowFailed(RowFailure),
    Progress(ImportProgress),
    Completed {
        success: usize,
        failed: usize,
        total: usize,
        metrics: ImportMetricsSnapshot,
    },
}

impl fmt::Display for ImportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportEvent::PhaseChanged { from, to } => write!(f, "phase {from} -> {to}"),
            ImportEvent::FileParsed {
                file_name,
                rows,
                import_type,
            } => write!(f, "parsed file={file_name} rows={rows} type={import_type}"),
            ImportEvent::ParseFailed { file_name, message } => {
                write!(f, "parse failed file={file_name} err={message}")
            }
            ImportEvent::RowFailed(failure) => write!(f, "row failed {failure}"),
            ImportEvent::Progress(p) => {
                write!(f, "progress {}/{} ({:.0}%)", p.processed, p.total, p.percent())
            }
            ImportEvent::Completed {
                success,
                failed,
                total,
                metrics,
            } => write!(f, "completed success={success} failed={failed} total={total} {metrics}"),
        }
    }
}

/// Observer hook for import events.
///
/// Implementors can drive a progress bar, record metrics, or write logs.
pub trait ImportObserver: Send + Sync {
    fn on_event(&self, _event: &ImportEvent) {}
}

/// An observer that fans out events to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ImportObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn ImportObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ImportObserver for CompositeObserver {
    fn on_event(&self, event: &ImportEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Forwards import events to `tracing`.
///
/// Row failures and parse failures log at `warn`, completion at `info`, everything else at
/// `debug`. Installing a subscriber is left to the application.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ImportObserver for TracingObserver {
    fn on_event(&self, event: &ImportEvent) {
        match event {
            ImportEvent::RowFailed(failure) => {
                tracing::warn!(row = failure.row, message = %failure.message, "import row failed");
            }
            ImportEvent::ParseFailed { file_name, message } => {
                tracing::warn!(file_name = %file_name, message = %message, "import file could not be parsed");
            }
            ImportEvent::Completed {
                success,
                failed,
                total,
                metrics,
            } => {
                tracing::info!(success, failed, total, elapsed = ?metrics.elapsed, "import completed");
            }
            other => tracing::debug!("{other}"),
        }
    }
}

/// Appends import events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ImportObserver for FileObserver {
    fn on_event(&self, event: &ImportEvent) {
        // Per-row progress would swamp the log.
        if matches!(event, ImportEvent::Progress(_)) {
            return;
        }
        self.append_line(&format!("{} {event}", unix_ts()));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Real-time counters for an import run.
///
/// The importer updates these as rows complete; callers can snapshot them at any time.
pub struct ImportMetrics {
    run_id: AtomicU64,
    started_at: Mutex<Option<Instant>>,
    elapsed_ns: AtomicU64,

    rows_processed: AtomicU64,
    rows_succeeded: AtomicU64,
    rows_failed: AtomicU64,
    gateway_wait_ns: AtomicU64,
}

impl ImportMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            started_at: Mutex::new(None),
            elapsed_ns: AtomicU64::new(0),
            rows_processed: AtomicU64::new(0),
            rows_succeeded: AtomicU64::new(0),
            rows_failed: AtomicU64::new(0),
            gateway_wait_ns: AtomicU64::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut started) = self.started_at.lock() {
            *started = Some(Instant::now());
        }

        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.rows_processed.store(0, Ordering::SeqCst);
        self.rows_succeeded.store(0, Ordering::SeqCst);
        self.rows_failed.store(0, Ordering::SeqCst);
        self.gateway_wait_ns.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self) {
        let elapsed = self
            .started_at
            .lock()
            .ok()
            .and_then(|started| started.map(|t| t.elapsed()))
            .unwrap_or_default();
        self.elapsed_ns.store(duration_ns(elapsed), Ordering::SeqCst);
    }

    pub fn on_row_succeeded(&self) {
        let _ = self.rows_processed.fetch_add(1, Ordering::SeqCst);
        let _ = self.rows_succeeded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_row_failed(&self) {
        let _ = self.rows_processed.fetch_add(1, Ordering::SeqCst);
        let _ = self.rows_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_gateway_wait(&self, d: Duration) {
        let _ = self.gateway_wait_ns.fetch_add(duration_ns(d), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ImportMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        ImportMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            rows_processed: self.rows_processed.load(Ordering::SeqCst),
            rows_succeeded: self.rows_succeeded.load(Ordering::SeqCst),
            rows_failed: self.rows_failed.load(Ordering::SeqCst),
            gateway_wait: Duration::from_nanos(self.gateway_wait_ns.load(Ordering::SeqCst)),
        }
    }
}

impl Default for ImportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_ns(d: Duration) -> u64 {
    d.as_nanos().min(u64::MAX as u128) as u64
}

/// Immutable snapshot of [`ImportMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub rows_processed: u64,
    pub rows_succeeded: u64,
    pub rows_failed: u64,
    /// Time spent awaiting gateway inserts.
    pub gateway_wait: Duration,
}

impl fmt::Display for ImportMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, rows_processed={}, succeeded={}, failed={}, gateway_wait={:?}, elapsed={:?}",
            self.run_id,
            self.rows_processed,
            self.rows_succeeded,
            self.rows_failed,
            self.gateway_wait,
            self.elapsed
        )
    }
}
