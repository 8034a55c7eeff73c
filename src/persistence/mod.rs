//! Persisting repair-order tables.
//!
//! A [`TableSink`] stores one [`RepairOrderTable`] under its destination name
//! (`<label>_repair_orders`), replacing whatever was stored there before. [`persist_tables`]
//! writes every table to every sink; a failed write is logged, reported, and skipped so the
//! remaining tables still get written.
//!
//! Implementations:
//!
//! - [`sqlite::SqliteSink`]: one SQLite table per window
//! - [`csv::CsvSink`]: one CSV file per window

pub mod csv;
pub mod sqlite;

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::observability::{
    report_failure, severity_for_error, PipelineObserver, Severity, Stage, StageContext, StageStats,
};
use crate::processing::RepairOrderTable;
use crate::types::Value;

pub use self::csv::CsvSink;
pub use self::sqlite::{SqliteSink, StoredTable};

/// Name of the row-index column written ahead of the table columns.
pub const INDEX_COLUMN: &str = "index";

/// Text layout used when timestamps are stored as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Destination that can store a [`RepairOrderTable`].
pub trait TableSink {
    /// Short name used in logs (e.g. `sqlite:repair_orders.db`).
    fn describe(&self) -> String;

    /// Store `table` under [`RepairOrderTable::destination_name`], replacing any earlier copy.
    fn write_table(&mut self, table: &RepairOrderTable) -> PipelineResult<()>;
}

/// One successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenTable {
    pub sink: String,
    pub table: String,
    pub rows: usize,
}

/// One failed write. `error` is always [`PipelineError::Persistence`].
#[derive(Debug)]
pub struct FailedTable {
    pub sink: String,
    pub error: PipelineError,
}

/// Outcome of [`persist_tables`]; returned once every write has been attempted.
#[derive(Debug, Default)]
pub struct PersistSummary {
    pub written: Vec<WrittenTable>,
    pub failed: Vec<FailedTable>,
}

impl PersistSummary {
    pub fn all_written(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write every table to every sink.
///
/// Failures are wrapped in [`PipelineError::Persistence`], logged, reported to `observer` and
/// collected in the summary; they never stop the remaining writes.
pub fn persist_tables(
    tables: &[RepairOrderTable],
    sinks: &mut [Box<dyn TableSink>],
    observer: Option<&Arc<dyn PipelineObserver>>,
    alert_at_or_above: Severity,
) -> PersistSummary {
    tracing::info!(tables = tables.len(), sinks = sinks.len(), "saving repair order tables");

    let mut summary = PersistSummary::default();
    for sink in sinks.iter_mut() {
        let sink_name = sink.describe();
        for table in tables {
            let name = table.destination_name();
            let ctx = StageContext::new(Stage::Persist, format!("{sink_name}/{name}"));
            match sink.write_table(table) {
                Ok(()) => {
                    tracing::info!(sink = %sink_name, table = %name, rows = table.row_count(), "saved table");
                    if let Some(obs) = observer {
                        obs.on_success(&ctx, StageStats { rows: table.row_count() });
                    }
                    summary.written.push(WrittenTable {
                        sink: sink_name.clone(),
                        table: name,
                        rows: table.row_count(),
                    });
                }
                Err(e) => {
                    let error = PipelineError::persistence(name, e);
                    tracing::error!(sink = %sink_name, "{error}");
                    report_failure(observer, alert_at_or_above, &ctx, severity_for_error(&error), &error);
                    summary.failed.push(FailedTable {
                        sink: sink_name.clone(),
                        error,
                    });
                }
            }
        }
    }

    tracing::info!(
        written = summary.written.len(),
        failed = summary.failed.len(),
        "saving portion complete"
    );
    summary
}

/// Text form of a cell, or `None` for null.
///
/// Lists that reach persistence (attribute columns other than the joined part columns) are
/// rendered as JSON arrays.
pub fn render_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Int64(v) => Some(v.to_string()),
        Value::Float64(v) => Some(format!("{v:?}")),
        Value::Utf8(s) => Some(s.clone()),
        Value::Timestamp(ts) => Some(format_timestamp(ts)),
        Value::List(items) => Some(serde_json::Value::from(items.clone()).to_string()),
    }
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
