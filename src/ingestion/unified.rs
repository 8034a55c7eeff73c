//! Unified ingestion entrypoint.
//!
//! Most callers should use [`ingest_from_dir`], which collects the documents of a directory and
//! flattens them into an in-memory [`crate::types::DataSet`].
//!
//! If an [`super::observability::PipelineObserver`] is provided, the outcome and every rejected
//! document are reported to it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::PipelineResult;

use super::collect::{collect_documents, CollectOptions};
use super::observability::{
    report_failure, severity_for_error, PipelineObserver, Severity, Stage, StageContext, StageStats,
};
use super::xml::{extract_records, ExtractOptions, Extraction};

/// Options controlling unified ingestion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// Which files to read.
    pub collect: CollectOptions,
    /// How documents are flattened.
    pub extract: ExtractOptions,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn PipelineObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("collect", &self.collect)
            .field("extract", &self.extract)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            collect: CollectOptions::default(),
            extract: ExtractOptions::default(),
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

/// Collect and flatten every matching document under `dir`.
///
/// When an observer is configured, this function reports:
///
/// - `on_failure` (severity `Warning`) once per rejected document
/// - `on_success` with the number of extracted rows
/// - `on_failure` when collection fails, plus `on_alert` when the severity is at or above
///   `options.alert_at_or_above`
///
/// # Examples
///
/// ```no_run
/// use repair_order_pipeline::ingestion::{ingest_from_dir, IngestionOptions};
///
/// # fn main() -> Result<(), repair_order_pipeline::PipelineError> {
/// let extraction = ingest_from_dir("data", &IngestionOptions::default())?;
/// println!(
///     "rows={} rejected={}",
///     extraction.dataset.row_count(),
///     extraction.rejected.len()
/// );
/// # Ok(())
/// # }
/// ```
pub fn ingest_from_dir(dir: impl AsRef<Path>, options: &IngestionOptions) -> PipelineResult<Extraction> {
    let dir = dir.as_ref();
    let observer = options.observer.as_ref();

    let documents = match collect_documents(dir, &options.collect) {
        Ok(docs) => docs,
        Err(e) => {
            let ctx = StageContext::new(Stage::Collect, dir.display().to_string());
            report_failure(observer, options.alert_at_or_above, &ctx, severity_for_error(&e), &e);
            return Err(e);
        }
    };
    if let Some(obs) = observer {
        obs.on_success(
            &StageContext::new(Stage::Collect, dir.display().to_string()),
            StageStats { rows: documents.len() },
        );
    }

    let extraction = extract_records(&documents, &options.extract);

    for rejected in &extraction.rejected {
        let ctx = StageContext::new(Stage::Extract, rejected.document.to_string());
        report_failure(
            observer,
            options.alert_at_or_above,
            &ctx,
            severity_for_error(&rejected.error),
            &rejected.error,
        );
    }
    if let Some(obs) = observer {
        obs.on_success(
            &StageContext::new(Stage::Extract, dir.display().to_string()),
            StageStats {
                rows: extraction.dataset.row_count(),
            },
        );
    }

    Ok(extraction)
}
