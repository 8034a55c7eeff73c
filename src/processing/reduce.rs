//! Column reductions over [`crate::types::DataSet`].

use chrono::NaiveDateTime;

use crate::types::{DataType, DataSet, Value};

/// Latest timestamp in `column`, ignoring nulls.
///
/// Returns `None` when the column is missing, is not a timestamp column, or holds no
/// timestamps at all.
pub fn max_timestamp(dataset: &DataSet, column: &str) -> Option<NaiveDateTime> {
    let idx = dataset.schema.index_of(column)?;
    if dataset.schema.fields.get(idx)?.data_type != DataType::Timestamp {
        return None;
    }

    dataset.reduce_rows(None, |acc: Option<NaiveDateTime>, row| match (acc, row.get(idx)) {
        (Some(a), Some(Value::Timestamp(v))) => Some(a.max(*v)),
        (None, Some(Value::Timestamp(v))) => Some(*v),
        (acc, _) => acc,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::max_timestamp;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 8, day)
            .unwrap()
            .and_hms_opt(12, 34, 56)
            .unwrap()
    }

    fn orders_with_nulls() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("order_id", DataType::Int64),
            Field::new("date_time", DataType::Timestamp),
        ]);

        let rows = vec![
            vec![Value::Int64(111), Value::Timestamp(at(10))],
            vec![Value::Int64(222), Value::Null],
            vec![Value::Int64(333), Value::Timestamp(at(12))],
            vec![Value::Int64(444), Value::Timestamp(at(11))],
        ];

        DataSet::new(schema, rows)
    }

    #[test]
    fn latest_timestamp_ignores_nulls() {
        assert_eq!(max_timestamp(&orders_with_nulls(), "date_time"), Some(at(12)));
    }

    #[test]
    fn missing_or_untyped_column_has_no_latest() {
        let ds = orders_with_nulls();
        assert_eq!(max_timestamp(&ds, "missing"), None);
        assert_eq!(max_timestamp(&ds, "order_id"), None);
    }

    #[test]
    fn all_null_column_has_no_latest() {
        let schema = Schema::new(vec![Field::new("date_time", DataType::Timestamp)]);
        let ds = DataSet::new(schema, vec![vec![Value::Null], vec![Value::Null]]);
        assert_eq!(max_timestamp(&ds, "date_time"), None);
    }
}
