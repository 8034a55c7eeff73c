//! In-memory data transformations.
//!
//! The processing layer operates on [`crate::types::DataSet`] values produced by ingestion:
//!
//! - [`normalize_columns()`]: coerce `cost`, `date_time` and `order_id` to typed values
//! - [`max_timestamp()`]: latest timestamp in a column, the anchor of every window
//! - [`window_by_datetime()`] / [`window_many()`]: keep rows inside trailing time windows
//! - [`process_to_repair_orders()`]: reshape windows into repair-order tables
//!
//! ## Example: window then reshape
//!
//! ```rust
//! use repair_order_pipeline::processing::{process_to_repair_orders, window_by_datetime};
//! use repair_order_pipeline::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let text = |s: &str| Value::Utf8(s.to_string());
//! let schema = Schema::new(vec![
//!     Field::new("order_id", DataType::Utf8),
//!     Field::new("date_time", DataType::Utf8),
//!     Field::new("cost", DataType::Utf8),
//!     Field::new("name", DataType::List),
//!     Field::new("quantity", DataType::List),
//! ]);
//! let ds = DataSet::new(
//!     schema,
//!     vec![vec![
//!         text("333"),
//!         text("2023-08-12T12:34:56"),
//!         text("300.00"),
//!         Value::list(["part 2", "part 3"]),
//!         Value::list(["2", "2"]),
//!     ]],
//! );
//!
//! let windows = window_by_datetime(&ds, "1D").unwrap();
//! let tables = process_to_repair_orders(&windows);
//!
//! let part_name = tables[0].dataset.schema.index_of("part_name").unwrap();
//! assert_eq!(tables[0].dataset.rows[0][part_name], text("part 2, part 3"));
//! assert_eq!(tables[0].destination_name(), "1D_repair_orders");
//! ```

pub mod normalize;
pub mod reduce;
pub mod reshape;
pub mod window;

pub use normalize::{normalize_columns, parse_timestamp};
pub use reduce::max_timestamp;
pub use reshape::{process_to_repair_orders, reshape_window, RepairOrderTable};
pub use window::{window_by_datetime, window_many, Window, WindowSpec, WindowUnit, Windows};
