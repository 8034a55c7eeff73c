//! Column type coercion for extracted repair-order data.
//!
//! Extraction produces text columns only. [`normalize_columns`] turns the three columns the rest
//! of the pipeline computes with into typed values:
//!
//! | column      | type                          |
//! |-------------|-------------------------------|
//! | `cost`      | [`DataType::Float64`]         |
//! | `date_time` | [`DataType::Timestamp`]       |
//! | `order_id`  | [`DataType::Int64`]           |

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Value};

pub const ORDER_ID: &str = "order_id";
pub const DATE_TIME: &str = "date_time";
pub const COST: &str = "cost";

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Coerce `cost`, `date_time` and `order_id` to their typed representation.
///
/// - Text is trimmed before parsing.
/// - `Null` stays `Null` for `cost` and `date_time`; `order_id` must be present.
/// - Values that are already typed pass through, so the function is idempotent.
///
/// # Errors
///
/// - [`PipelineError::MissingColumn`] if one of the three columns is absent
/// - [`PipelineError::TypeCoercion`] for the first value that cannot be converted (row numbers
///   are 1-based)
pub fn normalize_columns(dataset: &DataSet) -> PipelineResult<DataSet> {
    let mut out = dataset.clone();
    coerce_column(&mut out, COST, DataType::Float64, to_float)?;
    coerce_column(&mut out, DATE_TIME, DataType::Timestamp, to_timestamp)?;
    coerce_column(&mut out, ORDER_ID, DataType::Int64, to_int)?;
    Ok(out)
}

/// Parse ISO-8601-like text into a timestamp.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS[.fff]]` (or a space instead of `T`), RFC 3339 with an offset
/// (converted to UTC), and bare dates (midnight).
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    let s = raw.trim();
    for fmt in DATE_TIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.naive_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err("expected an ISO-8601 date/time".to_string())
}

fn coerce_column(
    dataset: &mut DataSet,
    column: &str,
    data_type: DataType,
    convert: fn(&Value) -> Result<Value, String>,
) -> PipelineResult<()> {
    let idx = dataset
        .schema
        .index_of(column)
        .ok_or_else(|| PipelineError::MissingColumn {
            column: column.to_string(),
        })?;

    for (row_idx0, row) in dataset.rows.iter_mut().enumerate() {
        let converted = convert(&row[idx]).map_err(|message| PipelineError::TypeCoercion {
            row: row_idx0 + 1,
            column: column.to_string(),
            raw: raw_text(&row[idx]),
            message,
        })?;
        row[idx] = converted;
    }
    dataset.schema.fields[idx].data_type = data_type;
    Ok(())
}

fn to_float(v: &Value) -> Result<Value, String> {
    match v {
        Value::Null | Value::Float64(_) => Ok(v.clone()),
        Value::Int64(n) => Ok(Value::Float64(*n as f64)),
        Value::Utf8(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| e.to_string()),
        Value::Timestamp(_) | Value::List(_) => Err("expected a single number".to_string()),
    }
}

fn to_int(v: &Value) -> Result<Value, String> {
    match v {
        Value::Null => Err("missing value".to_string()),
        Value::Int64(_) => Ok(v.clone()),
        Value::Float64(f) if f.is_finite() && f.fract() == 0.0 => Ok(Value::Int64(*f as i64)),
        Value::Utf8(s) => s.trim().parse::<i64>().map(Value::Int64).map_err(|e| e.to_string()),
        Value::Float64(_) | Value::Timestamp(_) | Value::List(_) => Err("expected a single integer".to_string()),
    }
}

fn to_timestamp(v: &Value) -> Result<Value, String> {
    match v {
        Value::Null | Value::Timestamp(_) => Ok(v.clone()),
        Value::Utf8(s) => parse_timestamp(s).map(Value::Timestamp),
        Value::Int64(_) | Value::Float64(_) | Value::List(_) => Err("expected a date/time".to_string()),
    }
}

fn raw_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Utf8(s) => s.clone(),
        Value::List(items) => items.join(", "),
        other => format!("{other:?}"),
    }
}
