//! End-to-end run: collect, extract, window, reshape, persist.

use std::path::Path;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::ingestion::{
    ingest_from_dir, report_failure, severity_for_error, IngestionOptions, PipelineObserver, Stage,
    StageContext, StageStats,
};
use crate::persistence::{persist_tables, CsvSink, PersistSummary, SqliteSink, TableSink};
use crate::processing::{process_to_repair_orders, window_many};

/// What a run did.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Documents collected, parsed or not.
    pub documents: usize,
    /// Rows extracted (one per parsed document).
    pub rows: usize,
    /// Identities of documents that could not be parsed.
    pub rejected: Vec<String>,
    /// `(label, rows)` per window, in request order.
    pub windows: Vec<(String, usize)>,
    pub persist: PersistSummary,
}

impl PipelineReport {
    /// `true` when every document parsed and every table was written.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.persist.all_written()
    }
}

/// Sinks described by `config`: the SQLite database, plus a CSV directory when set.
pub fn default_sinks(config: &PipelineConfig) -> Vec<Box<dyn TableSink>> {
    let mut sinks: Vec<Box<dyn TableSink>> = vec![Box::new(SqliteSink::open(&config.database))];
    if let Some(dir) = &config.csv_dir {
        sinks.push(Box::new(CsvSink::new(dir)));
    }
    sinks
}

/// Run the whole pipeline once.
///
/// Collection, normalization and window errors abort the run and are returned. Rejected documents
/// and failed table writes do not; they are listed in the [`PipelineReport`].
pub fn run_pipeline(
    config: &PipelineConfig,
    sinks: &mut [Box<dyn TableSink>],
    observer: Option<Arc<dyn PipelineObserver>>,
) -> PipelineResult<PipelineReport> {
    tracing::info!(source = %config.source_dir.display(), windows = ?config.windows, "starting pipeline");

    let options = IngestionOptions {
        collect: config.collect_options(),
        extract: config.extract_options(),
        observer: observer.clone(),
        alert_at_or_above: config.alert_at_or_above,
    };
    let extraction = ingest_from_dir(&config.source_dir, &options)?;
    let rejected: Vec<String> = extraction.rejected.iter().map(|r| r.document.to_string()).collect();
    if !rejected.is_empty() {
        tracing::warn!(count = rejected.len(), documents = ?rejected, "documents could not be parsed");
    }

    let windows = match window_many(&extraction.dataset, &config.windows) {
        Ok(windows) => windows,
        Err(e) => {
            let ctx = StageContext::new(Stage::Window, config.windows.join(","));
            report_failure(observer.as_ref(), config.alert_at_or_above, &ctx, severity_for_error(&e), &e);
            return Err(e);
        }
    };
    let window_rows: Vec<(String, usize)> = windows
        .iter()
        .map(|w| (w.label().to_string(), w.dataset.row_count()))
        .collect();
    if let Some(obs) = &observer {
        for (label, rows) in &window_rows {
            obs.on_success(&StageContext::new(Stage::Window, label.as_str()), StageStats { rows: *rows });
        }
    }

    let tables = process_to_repair_orders(&windows);
    if let Some(obs) = &observer {
        for table in &tables {
            obs.on_success(
                &StageContext::new(Stage::Reshape, table.destination_name()),
                StageStats { rows: table.row_count() },
            );
        }
    }

    let persist = persist_tables(&tables, sinks, observer.as_ref(), config.alert_at_or_above);

    let report = PipelineReport {
        documents: extraction.dataset.row_count() + rejected.len(),
        rows: extraction.dataset.row_count(),
        rejected,
        windows: window_rows,
        persist,
    };
    tracing::info!(
        documents = report.documents,
        rows = report.rows,
        written = report.persist.written.len(),
        failed = report.persist.failed.len(),
        "pipeline finished"
    );
    Ok(report)
}

/// Default run: every `*.xml` in `dir`, one `1D` window, written to the SQLite file `database`.
pub fn process_events(dir: impl AsRef<Path>, database: impl AsRef<Path>) -> PipelineResult<PipelineReport> {
    let config = PipelineConfig {
        source_dir: dir.as_ref().to_path_buf(),
        database: database.as_ref().to_path_buf(),
        ..PipelineConfig::default()
    };
    let mut sinks = default_sinks(&config);
    run_pipeline(&config, &mut sinks, None)
}
