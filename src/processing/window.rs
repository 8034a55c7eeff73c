//! Trailing time windows anchored at the latest observed `date_time`.
//!
//! A window spec is `<positive integer><unit>` with the unit one of `m` (minutes), `h` (hours),
//! `d` (days) or `w` (weeks), case-insensitive: `"1D"`, `"12h"`, `"2W"`.
//!
//! A window keeps every row with `latest - span <= date_time <= latest`, both ends inclusive.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, Value};

use super::normalize::{normalize_columns, DATE_TIME};
use super::reduce::max_timestamp;

/// Unit of a [`WindowSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl WindowUnit {
    fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'm' => Some(Self::Minutes),
            'h' => Some(Self::Hours),
            'd' => Some(Self::Days),
            'w' => Some(Self::Weeks),
            _ => None,
        }
    }

    fn span(self, quantity: i64) -> Option<TimeDelta> {
        match self {
            Self::Minutes => TimeDelta::try_minutes(quantity),
            Self::Hours => TimeDelta::try_hours(quantity),
            Self::Days => TimeDelta::try_days(quantity),
            Self::Weeks => TimeDelta::try_weeks(quantity),
        }
    }
}

impl fmt::Display for WindowUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Minutes => "minute(s)",
            Self::Hours => "hour(s)",
            Self::Days => "day(s)",
            Self::Weeks => "week(s)",
        })
    }
}

/// A parsed window specification. The original string is kept as the window label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpec {
    label: String,
    pub quantity: i64,
    pub unit: WindowUnit,
    span: TimeDelta,
}

impl WindowSpec {
    /// The spec string exactly as given (e.g. `"1D"`).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Length of the window.
    pub fn span(&self) -> TimeDelta {
        self.span
    }
}

impl FromStr for WindowSpec {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| PipelineError::InvalidWindowSpec {
            spec: s.to_string(),
            message: message.to_string(),
        };

        let last = s.chars().last().ok_or_else(|| invalid("window is empty"))?;
        let unit = WindowUnit::from_letter(last).ok_or_else(|| PipelineError::InvalidWindowUnit {
            spec: s.to_string(),
            unit: last.to_string(),
        })?;

        let digits = &s[..s.len() - last.len_utf8()];
        let quantity: i64 = digits
            .parse()
            .map_err(|_| invalid("quantity must be an integer"))?;
        if quantity <= 0 {
            return Err(invalid("quantity must be positive"));
        }
        let span = unit
            .span(quantity)
            .ok_or_else(|| invalid("window is too large"))?;

        Ok(Self {
            label: s.to_string(),
            quantity,
            unit,
            span,
        })
    }
}

/// The rows of a dataset that fall in one window.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub spec: WindowSpec,
    /// Latest `date_time` in the source dataset; `None` when it has no timestamps.
    pub latest: Option<NaiveDateTime>,
    /// Earliest `date_time` kept (`latest - span`, saturating).
    pub floor: Option<NaiveDateTime>,
    /// Normalized rows inside the window, in source order.
    pub dataset: DataSet,
    /// Position of every kept row in the source dataset.
    pub source_rows: Vec<usize>,
}

impl Window {
    pub fn label(&self) -> &str {
        self.spec.label()
    }
}

/// Windows keyed by label, in the order they were requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Windows {
    windows: Vec<Window>,
}

impl Windows {
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Look up a window by label.
    pub fn get(&self, label: &str) -> Option<&Window> {
        self.windows.iter().find(|w| w.label() == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.windows.iter().map(Window::label)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Window> {
        self.windows.iter()
    }
}

impl<'a> IntoIterator for &'a Windows {
    type Item = &'a Window;
    type IntoIter = std::slice::Iter<'a, Window>;

    fn into_iter(self) -> Self::IntoIter {
        self.windows.iter()
    }
}

/// Normalize `dataset` and keep the rows that fall in the window described by `spec`.
///
/// Returns a single-entry [`Windows`] keyed by `spec`.
///
/// # Errors
///
/// - normalization errors ([`PipelineError::MissingColumn`], [`PipelineError::TypeCoercion`])
/// - [`PipelineError::InvalidWindowUnit`] / [`PipelineError::InvalidWindowSpec`] for a bad spec
///
/// # Examples
///
/// ```rust
/// use repair_order_pipeline::processing::window_by_datetime;
/// use repair_order_pipeline::types::{DataSet, DataType, Field, Schema, Value};
///
/// let schema = Schema::new(vec![
///     Field::new("order_id", DataType::Utf8),
///     Field::new("date_time", DataType::Utf8),
///     Field::new("cost", DataType::Utf8),
/// ]);
/// let text = |s: &str| Value::Utf8(s.to_string());
/// let ds = DataSet::new(
///     schema,
///     vec![
///         vec![text("111"), text("2023-08-10T12:34:56"), text("100.00")],
///         vec![text("222"), text("2023-08-11T12:34:56"), text("200.00")],
///         vec![text("333"), text("2023-08-12T12:34:56"), text("300.00")],
///     ],
/// );
///
/// let windows = window_by_datetime(&ds, "1D").unwrap();
/// let day = windows.get("1D").unwrap();
/// assert_eq!(day.dataset.row_count(), 2);
/// assert_eq!(day.source_rows, vec![1, 2]);
/// ```
pub fn window_by_datetime(dataset: &DataSet, spec: &str) -> PipelineResult<Windows> {
    window_many(dataset, &[spec])
}

/// Like [`window_by_datetime`] for several specs at once; `dataset` is normalized once.
///
/// A label given twice keeps its first position.
pub fn window_many<S: AsRef<str>>(dataset: &DataSet, specs: &[S]) -> PipelineResult<Windows> {
    let normalized = normalize_columns(dataset)?;

    let parsed = specs
        .iter()
        .map(|s| s.as_ref().parse::<WindowSpec>())
        .collect::<PipelineResult<Vec<_>>>()?;

    tracing::info!(windows = parsed.len(), "windowing the data");

    let latest = max_timestamp(&normalized, DATE_TIME);
    let ts_idx = normalized
        .schema
        .index_of(DATE_TIME)
        .ok_or_else(|| PipelineError::MissingColumn {
            column: DATE_TIME.to_string(),
        })?;

    let mut out = Windows::default();
    for spec in parsed {
        if out.get(spec.label()).is_some() {
            continue;
        }
        tracing::info!(window = spec.label(), "window of time identified: {} {}", spec.quantity, spec.unit);

        let floor = latest.map(|l| l.checked_sub_signed(spec.span()).unwrap_or(NaiveDateTime::MIN));
        let mut source_rows = Vec::new();
        let mut rows = Vec::new();
        if let (Some(latest), Some(floor)) = (latest, floor) {
            for (idx, row) in normalized.rows.iter().enumerate() {
                if matches!(row[ts_idx], Value::Timestamp(ts) if floor <= ts && ts <= latest) {
                    source_rows.push(idx);
                    rows.push(row.clone());
                }
            }
        }

        tracing::info!(window = spec.label(), rows = rows.len(), "finished windowing the data");
        out.windows.push(Window {
            spec,
            latest,
            floor,
            dataset: DataSet::new(normalized.schema.clone(), rows),
            source_rows,
        });
    }

    Ok(out)
}
