//! Turns windowed rows into repair-order tables ready for persistence.

use std::cmp::Ordering;

use crate::types::{DataSet, DataType, Value};

use super::normalize::DATE_TIME;
use super::window::{Window, Windows};

/// Column holding the window label in every reshaped row.
pub const TIME_FRAME: &str = "time_frame";
/// Suffix appended to the window label to name the destination table.
pub const TABLE_SUFFIX: &str = "_repair_orders";

// List columns flattened to `", "`-joined text, with their output names.
const JOINED_COLUMNS: &[(&str, &str)] = &[("name", "part_name"), ("quantity", "part_quantity")];

/// A window's rows reshaped into repair orders.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOrderTable {
    /// Window label (e.g. `"1D"`), also stored in the `time_frame` column.
    pub label: String,
    /// Rows, most recent first.
    pub dataset: DataSet,
    /// Position of each row in the extracted (pre-window) dataset.
    pub row_index: Vec<usize>,
}

impl RepairOrderTable {
    /// Name of the table this window is persisted to, e.g. `1D_repair_orders`.
    pub fn destination_name(&self) -> String {
        format!("{}{TABLE_SUFFIX}", self.label)
    }

    pub fn row_count(&self) -> usize {
        self.dataset.row_count()
    }
}

/// Reshape every window, in window order.
pub fn process_to_repair_orders(windows: &Windows) -> Vec<RepairOrderTable> {
    tracing::info!(windows = windows.len(), "turning windowed data into repair order tables");
    let tables: Vec<RepairOrderTable> = windows.iter().map(reshape_window).collect();
    tracing::info!(tables = tables.len(), "finished reshaping windowed data");
    tables
}

/// Reshape one window:
///
/// 1. set a `time_frame` column to the window label, replacing any `time_frame` the input had;
/// 2. join list values of `name` and `quantity` with `", "` (columns that are absent are
///    skipped, text and null values are left alone);
/// 3. rename `name` to `part_name` and `quantity` to `part_quantity`;
/// 4. stable-sort rows by `date_time`, latest first, rows without a timestamp last.
///
/// The set of rows is unchanged.
pub fn reshape_window(window: &Window) -> RepairOrderTable {
    let label = window.label().to_string();
    let mut ds = window
        .dataset
        .clone()
        .with_constant_column(TIME_FRAME, DataType::Utf8, Value::Utf8(label.clone()));

    for (column, renamed) in JOINED_COLUMNS {
        let Some(idx) = ds.schema.index_of(column) else {
            tracing::debug!(column, window = %label, "column absent, nothing to join");
            continue;
        };
        ds = ds.map_rows(|row| {
            let mut out = row.to_vec();
            let joined = match &out[idx] {
                Value::List(items) => Some(items.join(", ")),
                _ => None,
            };
            if let Some(joined) = joined {
                out[idx] = Value::Utf8(joined);
            }
            out
        });
        ds.schema.fields[idx].data_type = DataType::Utf8;
        ds.rename_column(column, renamed);
    }

    let (rows, row_index) = sort_latest_first(&ds, &window.source_rows);
    RepairOrderTable {
        label,
        dataset: DataSet::new(ds.schema, rows),
        row_index,
    }
}

fn sort_latest_first(ds: &DataSet, source_rows: &[usize]) -> (Vec<Vec<Value>>, Vec<usize>) {
    let mut paired: Vec<(usize, Vec<Value>)> = source_rows
        .iter()
        .copied()
        .zip(ds.rows.iter().cloned())
        .collect();

    if let Some(ts_idx) = ds.schema.index_of(DATE_TIME) {
        paired.sort_by(|(_, a), (_, b)| latest_first(&a[ts_idx], &b[ts_idx]));
    }

    paired.into_iter().map(|(i, row)| (row, i)).unzip()
}

fn latest_first(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Timestamp(x), Value::Timestamp(y)) => y.cmp(x),
        (Value::Timestamp(_), _) => Ordering::Less,
        (_, Value::Timestamp(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::{process_to_repair_orders, reshape_window};
    use crate::ingestion::{extract_records, ExtractOptions};
    use crate::persistence::{SqliteSink, TableSink};
    use crate::processing::window::{window_by_datetime, window_many};
    use crate::types::{DataSet, DataType, Field, Schema, RawDocument, Value};

    fn text(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    fn two_orders() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("order_id", DataType::Utf8),
            Field::new("date_time", DataType::Utf8),
            Field::new("status", DataType::Utf8),
            Field::new("cost", DataType::Utf8),
            Field::new("technician", DataType::Utf8),
            Field::new("name", DataType::List),
            Field::new("quantity", DataType::List),
        ]);
        DataSet::new(
            schema,
            vec![
                vec![
                    text("222"),
                    text("2023-08-11T12:34:56"),
                    text("Completed"),
                    text("200.00"),
                    text("Tech 2"),
                    Value::list(["part 4"]),
                    Value::list(["2"]),
                ],
                vec![
                    text("333"),
                    text("2023-08-12T12:34:56"),
                    text("Completed"),
                    text("300.00"),
                    text("Tech 3"),
                    Value::list(["part 2", "part 3"]),
                    Value::list(["2", "2"]),
                ],
            ],
        )
    }

    #[test]
    fn joins_parts_renames_and_sorts_latest_first() {
        let windows = window_by_datetime(&two_orders(), "1D").unwrap();
        let tables = process_to_repair_orders(&windows);

        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.label, "1D");
        assert_eq!(t.destination_name(), "1D_repair_orders");
        assert_eq!(
            t.dataset.schema.field_names().collect::<Vec<_>>(),
            vec![
                "order_id",
                "date_time",
                "status",
                "cost",
                "technician",
                "part_name",
                "part_quantity",
                "time_frame"
            ]
        );
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.row_index, vec![1, 0]);

        let first = &t.dataset.rows[0];
        assert_eq!(first[0], Value::Int64(333));
        assert_eq!(first[5], text("part 2, part 3"));
        assert_eq!(first[6], text("2, 2"));
        assert_eq!(first[7], text("1D"));
        assert_eq!(t.dataset.rows[1][5], text("part 4"));
        assert!(t.dataset.schema.fields[5..].iter().all(|f| f.data_type == DataType::Utf8));
    }

    #[test]
    fn missing_part_columns_are_skipped() {
        let mut ds = two_orders();
        ds.schema.fields.truncate(5);
        for row in &mut ds.rows {
            row.truncate(5);
        }

        let windows = window_by_datetime(&ds, "1w").unwrap();
        let t = reshape_window(windows.get("1w").unwrap());

        assert_eq!(t.dataset.schema.index_of("part_name"), None);
        assert_eq!(t.dataset.schema.index_of("time_frame"), Some(5));
        assert_eq!(t.row_count(), 2);
    }

    #[test]
    fn null_parts_stay_null() {
        let mut ds = two_orders();
        ds.rows[0][5] = Value::Null;
        let windows = window_by_datetime(&ds, "1w").unwrap();
        let t = reshape_window(windows.get("1w").unwrap());
        assert_eq!(t.dataset.rows[1][5], Value::Null);
    }

    #[test]
    fn rows_with_equal_timestamps_keep_their_order() {
        let mut ds = two_orders();
        ds.rows[1][1] = text("2023-08-11T12:34:56");
        let windows = window_by_datetime(&ds, "1D").unwrap();
        let t = reshape_window(windows.get("1D").unwrap());
        assert_eq!(t.row_index, vec![0, 1]);
    }

    #[test]
    fn one_table_per_window_in_order() {
        let windows = window_many(&two_orders(), &["1h", "1D"]).unwrap();
        let tables = process_to_repair_orders(&windows);
        let labels: Vec<&str> = tables.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["1h", "1D"]);
        assert_eq!(tables[0].row_count(), 1);
        assert_eq!(tables[1].row_count(), 2);
        assert_eq!(tables[0].dataset.rows[0][7], text("1h"));
    }

    #[test]
    fn existing_time_frame_is_replaced_by_the_label() {
        let doc = RawDocument::from_text(
            "<event><order_id>1</order_id><date_time>2023-08-11T12:34:56</date_time><cost>1.00</cost>\
             <time_frame>old</time_frame><part name=\"a\" quantity=\"1\"/></event>",
        );
        let extraction = extract_records(&[doc], &ExtractOptions::default());
        let windows = window_by_datetime(&extraction.dataset, "1D").unwrap();
        let t = reshape_window(windows.get("1D").unwrap());

        let names: Vec<&str> = t.dataset.schema.field_names().collect();
        assert_eq!(names.iter().filter(|n| **n == "time_frame").count(), 1);
        let idx = t.dataset.schema.index_of("time_frame").unwrap();
        assert_eq!(t.dataset.rows[0][idx], text("1D"));

        let mut sink = SqliteSink::in_memory().unwrap();
        sink.write_table(&t).unwrap();
        let stored = sink.read_table("1D_repair_orders").unwrap();
        assert_eq!(stored.columns.len(), names.len() + 1);
    }
}
