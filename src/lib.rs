//! `repair-order-pipeline` turns a directory of XML repair-order events into one relational
//! table per trailing time window.
//!
//! The run is a single forward pass:
//!
//! 1. **collect** every `*.xml` file of a directory ([`ingestion::collect_documents`])
//! 2. **extract** each document into a flat row ([`ingestion::extract_records`]); malformed
//!    documents are set aside, not fatal
//! 3. **normalize** `order_id`, `date_time` and `cost` to typed values
//!    ([`processing::normalize_columns`])
//! 4. **window** rows into trailing spans anchored at the latest timestamp
//!    ([`processing::window_many`])
//! 5. **reshape** each window into a repair-order table ([`processing::process_to_repair_orders`])
//! 6. **persist** each table as `<label>_repair_orders` ([`persistence::persist_tables`])
//!
//! [`pipeline::run_pipeline`] chains the steps; [`pipeline::process_events`] is the default run
//! (one `1D` window into a SQLite file).
//!
//! ## Quick example
//!
//! ```no_run
//! use repair_order_pipeline::pipeline::process_events;
//!
//! # fn main() -> Result<(), repair_order_pipeline::PipelineError> {
//! let report = process_events("data", "repair_orders.db")?;
//! println!("rows={} rejected={}", report.rows, report.rejected.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Windows
//!
//! A window spec is `<positive integer><unit>`, unit one of `m`, `h`, `d`, `w` (any case):
//!
//! ```rust
//! use repair_order_pipeline::processing::WindowSpec;
//!
//! let spec: WindowSpec = "36h".parse().unwrap();
//! assert_eq!(spec.span(), chrono::TimeDelta::hours(36));
//! assert!("1X".parse::<WindowSpec>().is_err());
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: directory scan, XML flattening, observers
//! - [`processing`]: normalization, reductions, windowing, reshaping
//! - [`persistence`]: SQLite and CSV sinks
//! - [`pipeline`]: end-to-end run
//! - [`config`]: JSON-loadable run settings
//! - [`types`]: records, schema and in-memory dataset
//! - [`error`]: the shared error type

pub mod config;
pub mod error;
pub mod ingestion;
pub mod persistence;
pub mod pipeline;
pub mod processing;
pub mod types;

pub use error::{PipelineError, PipelineResult};
