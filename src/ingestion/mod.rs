//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`ingest_from_dir`] (from [`unified`]) which:
//!
//! - collects every `*.xml` document in a directory ([`collect`])
//! - flattens each document into a row of an in-memory [`crate::types::DataSet`] ([`xml`])
//! - optionally reports success/failure/alerts to a [`PipelineObserver`]

pub mod collect;
pub mod observability;
pub mod unified;
pub mod xml;

pub use collect::{collect_documents, CollectOptions};
pub use observability::{
    report_failure, severity_for_error, CompositeObserver, FileObserver, PipelineObserver, Severity, Stage,
    StageContext, StageStats, TracingObserver,
};
pub use unified::{ingest_from_dir, IngestionOptions};
pub use xml::{extract_records, flatten_document, ExtractOptions, Extraction, RejectedDocument, RepeatedTextPolicy};
