//! Core data model types.
//!
//! Documents are flattened into [`Record`]s, stacked into an in-memory [`DataSet`] described by
//! a [`Schema`] (a list of typed [`Field`]s), and carried through windowing and reshaping.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Logical data type for a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// UTF-8 string.
    Utf8,
    /// Timestamp without time zone.
    Timestamp,
    /// Ordered sequence of strings (repeated attribute values).
    List,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A list of fields describing the shape of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Timestamp without time zone.
    Timestamp(NaiveDateTime),
    /// Sequence of strings.
    List(Vec<String>),
}

impl Value {
    /// Convenience constructor for a list of string slices.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// The flattened form of one document.
///
/// Keys keep the order in which they were first inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterate keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or overwrite `key`, keeping its original position when it already exists.
    pub fn set(&mut self, key: &str, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Append `item` to the list stored under `key`.
    ///
    /// A missing key starts a new list; a text value is promoted to a list holding the text
    /// followed by `item`.
    pub fn push(&mut self, key: &str, item: String) {
        let Some((_, slot)) = self.entries.iter_mut().find(|(k, _)| k == key) else {
            self.entries.push((key.to_string(), Value::List(vec![item])));
            return;
        };
        if let Value::List(items) = &mut *slot {
            items.push(item);
            return;
        }
        *slot = match std::mem::replace(slot, Value::Null) {
            Value::Utf8(text) => Value::List(vec![text, item]),
            _ => Value::List(vec![item]),
        };
    }
}

/// A document read from disk (or supplied in memory) before it has been parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Where the text came from, if it was read from a file.
    pub source: Option<PathBuf>,
    /// Full document text.
    pub text: String,
}

impl RawDocument {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            source: None,
            text: text.into(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        Self {
            source: Some(path.as_ref().to_path_buf()),
            text: text.into(),
        }
    }
}

impl fmt::Display for RawDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(path) => write!(f, "{}", path.display()),
            None => f.write_str("<inline document>"),
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Stack records into a dataset.
    ///
    /// Columns are the union of record keys in order of first appearance; keys a record lacks
    /// are [`Value::Null`] in its row. A column is typed [`DataType::List`] if any row holds a
    /// list, [`DataType::Utf8`] otherwise.
    pub fn from_records(records: &[Record]) -> Self {
        let mut names: Vec<&str> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !names.contains(&key) {
                    names.push(key);
                }
            }
        }

        let rows: Vec<Vec<Value>> = records
            .iter()
            .map(|record| {
                names
                    .iter()
                    .map(|name| record.get(name).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        let fields = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let is_list = rows.iter().any(|row| matches!(row[idx], Value::List(_)));
                let data_type = if is_list { DataType::List } else { DataType::Utf8 };
                Field::new(*name, data_type)
            })
            .collect();

        Self::new(Schema::new(fields), rows)
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterate the values of one column, or `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
        let idx = self.schema.index_of(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Create a new dataset containing only rows that match `predicate`.
    ///
    /// The returned dataset preserves the original schema.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row.as_slice()))
            .cloned()
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Create a new dataset by applying `mapper` to every row.
    ///
    /// The returned dataset preserves the original schema.
    ///
    /// # Panics
    ///
    /// Panics if `mapper` returns a row with a different length than the schema field count.
    pub fn map_rows<F>(&self, mut mapper: F) -> Self
    where
        F: FnMut(&[Value]) -> Vec<Value>,
    {
        let expected_len = self.schema.fields.len();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let out = mapper(row.as_slice());
                assert!(
                    out.len() == expected_len,
                    "mapped row length {} does not match schema length {}",
                    out.len(),
                    expected_len
                );
                out
            })
            .collect();

        Self {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Reduce (fold) all rows into an accumulator value.
    ///
    /// This is similar to `Iterator::fold`, but provides each row as `&[Value]`.
    pub fn reduce_rows<A, F>(&self, init: A, mut reducer: F) -> A
    where
        F: FnMut(A, &[Value]) -> A,
    {
        self.rows
            .iter()
            .fold(init, |acc, row| reducer(acc, row.as_slice()))
    }

    /// Set column `name` to `value` in every row.
    ///
    /// An existing column of that name is overwritten in place and retyped; otherwise the
    /// column is appended.
    pub fn with_constant_column(mut self, name: impl Into<String>, data_type: DataType, value: Value) -> Self {
        let name = name.into();
        match self.schema.index_of(&name) {
            Some(idx) => {
                self.schema.fields[idx].data_type = data_type;
                for cell in self.rows.iter_mut().filter_map(|row| row.get_mut(idx)) {
                    *cell = value.clone();
                }
            }
            None => {
                self.schema.fields.push(Field::new(name, data_type));
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
        self
    }

    /// Rename column `from` to `to`. Returns `false` (and changes nothing) if `from` is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.schema.index_of(from) {
            Some(idx) => {
                self.schema.fields[idx].name = to.to_string();
                true
            }
            None => false,
        }
    }
}
