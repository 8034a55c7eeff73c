use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal, e.g. a rejected document).
    Warning,
    /// Error-level event (a stage or a table write failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// Pipeline stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collect,
    Extract,
    Window,
    Reshape,
    Persist,
}

/// Context about a stage outcome.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub stage: Stage,
    /// What the stage was working on: a directory, a document, a window label or a table.
    pub subject: String,
}

impl StageContext {
    pub fn new(stage: Stage, subject: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
        }
    }
}

/// Minimal stats reported on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    /// Number of rows produced or written.
    pub rows: usize,
}

/// Observer interface for stage outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait PipelineObserver: Send + Sync {
    /// Called when a stage succeeds.
    fn on_success(&self, _ctx: &StageContext, _stats: StageStats) {}

    /// Called when a stage (or one item of a stage) fails.
    fn on_failure(&self, _ctx: &StageContext, _severity: Severity, _error: &PipelineError) {}

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Report a failure to `observer`, raising an alert if `severity >= alert_at_or_above`.
pub fn report_failure(
    observer: Option<&Arc<dyn PipelineObserver>>,
    alert_at_or_above: Severity,
    ctx: &StageContext,
    severity: Severity,
    error: &PipelineError,
) {
    if let Some(obs) = observer {
        obs.on_failure(ctx, severity, error);
        if severity >= alert_at_or_above {
            obs.on_alert(ctx, severity, error);
        }
    }
}

/// Severity the pipeline assigns to an error.
pub fn severity_for_error(e: &PipelineError) -> Severity {
    match e {
        PipelineError::Io(_) | PipelineError::Read { .. } => Severity::Critical,
        PipelineError::MalformedDocument { .. } => Severity::Warning,
        PipelineError::Sqlite(err) => match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::CannotOpen)
            | Some(rusqlite::ErrorCode::DiskFull)
            | Some(rusqlite::ErrorCode::SystemIoFailure) => Severity::Critical,
            _ => Severity::Error,
        },
        PipelineError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        PipelineError::Persistence { source, .. } => severity_for_error(source).max(Severity::Error),
        PipelineError::NoInput { .. }
        | PipelineError::MissingColumn { .. }
        | PipelineError::TypeCoercion { .. }
        | PipelineError::InvalidWindowUnit { .. }
        | PipelineError::InvalidWindowSpec { .. }
        | PipelineError::Config(_) => Severity::Error,
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
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

impl PipelineObserver for CompositeObserver {
    fn on_success(&self, ctx: &StageContext, stats: StageStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Forwards stage events to `tracing` at a level matching the severity.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_success(&self, ctx: &StageContext, stats: StageStats) {
        tracing::info!(stage = ?ctx.stage, subject = %ctx.subject, rows = stats.rows, "stage ok");
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        match severity {
            Severity::Info => tracing::info!(stage = ?ctx.stage, subject = %ctx.subject, "{error}"),
            Severity::Warning => tracing::warn!(stage = ?ctx.stage, subject = %ctx.subject, "{error}"),
            Severity::Error | Severity::Critical => {
                tracing::error!(stage = ?ctx.stage, subject = %ctx.subject, ?severity, "{error}")
            }
        }
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        tracing::error!(stage = ?ctx.stage, subject = %ctx.subject, ?severity, alert = true, "{error}");
    }
}

/// Appends stage events to a local log file.
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

impl PipelineObserver for FileObserver {
    fn on_success(&self, ctx: &StageContext, stats: StageStats) {
        self.append_line(&format!(
            "{} ok stage={:?} subject={} rows={}",
            unix_ts(),
            ctx.stage,
            ctx.subject,
            stats.rows
        ));
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        self.append_line(&format!(
            "{} fail severity={:?} stage={:?} subject={} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            ctx.subject,
            error
        ));
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &PipelineError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} stage={:?} subject={} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            ctx.subject,
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
