//! SQLite sink: one table per window.
//!
//! Each write runs in a single transaction:
//!
//! 1. `DROP TABLE IF EXISTS` the destination;
//! 2. `CREATE TABLE` with an `"index" INTEGER` column followed by the table columns;
//! 3. `CREATE INDEX ix_<table>_index` on the row-index column;
//! 4. insert every row.
//!
//! A failure anywhere rolls the transaction back, so readers see either the previous table or
//! the new one, never a half-written mix.

use std::path::{Path, PathBuf};

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};

use crate::error::PipelineResult;
use crate::processing::RepairOrderTable;
use crate::types::{DataType, Value};

use super::{format_timestamp, render_cell, TableSink, INDEX_COLUMN};

/// Writes repair-order tables into a SQLite database file.
///
/// The connection is opened on first use; constructing the sink never touches the file.
pub struct SqliteSink {
    target: PathBuf,
    conn: Option<Connection>,
}

/// Contents of a stored table, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl StoredTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

impl SqliteSink {
    /// Sink for the database file at `path` (created on first write if missing).
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            target: path.as_ref().to_path_buf(),
            conn: None,
        }
    }

    /// Sink writing through an already open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            target: PathBuf::from(":connection:"),
            conn: Some(conn),
        }
    }

    /// Sink backed by a private in-memory database.
    pub fn in_memory() -> PipelineResult<Self> {
        let mut sink = Self::from_connection(Connection::open_in_memory()?);
        sink.target = PathBuf::from(":memory:");
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.target
    }

    fn connection(&mut self) -> PipelineResult<&mut Connection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                tracing::debug!(path = %self.target.display(), "opening sqlite database");
                Connection::open(&self.target)?
            }
        };
        Ok(self.conn.insert(conn))
    }

    /// Names of all user tables, sorted.
    pub fn table_names(&mut self) -> PipelineResult<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Read a stored table back, rows in insertion order.
    pub fn read_table(&mut self, name: &str) -> PipelineResult<StoredTable> {
        let conn = self.connection()?;
        let sql = format!("SELECT * FROM {} ORDER BY rowid", quote_identifier(name));
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StoredTable { columns, rows })
    }
}

impl TableSink for SqliteSink {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.target.display())
    }

    fn write_table(&mut self, table: &RepairOrderTable) -> PipelineResult<()> {
        let name = table.destination_name();
        let quoted = quote_identifier(&name);
        let schema = &table.dataset.schema;

        let mut column_defs = vec![format!("{} INTEGER", quote_identifier(INDEX_COLUMN))];
        column_defs.extend(
            schema
                .fields
                .iter()
                .map(|f| format!("{} {}", quote_identifier(&f.name), sql_type(&f.data_type))),
        );
        let placeholders = vec!["?"; schema.fields.len() + 1].join(", ");

        let conn = self.connection()?;
        let tx = conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {quoted}"), [])?;
        tx.execute(&format!("CREATE TABLE {quoted} ({})", column_defs.join(", ")), [])?;
        tx.execute(
            &format!(
                "CREATE INDEX {} ON {quoted} ({})",
                quote_identifier(&format!("ix_{name}_{INDEX_COLUMN}")),
                quote_identifier(INDEX_COLUMN)
            ),
            [],
        )?;
        {
            let mut insert = tx.prepare(&format!("INSERT INTO {quoted} VALUES ({placeholders})"))?;
            for (row, source_row) in table.dataset.rows.iter().zip(&table.row_index) {
                let index = SqlValue::Integer(*source_row as i64);
                let cells = row.iter().map(sql_value);
                insert.execute(params_from_iter(std::iter::once(index).chain(cells)))?;
            }
        }
        tx.commit()?;

        tracing::debug!(table = %name, rows = table.row_count(), "sqlite table replaced");
        Ok(())
    }
}

fn sql_type(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Int64 => "INTEGER",
        DataType::Float64 => "REAL",
        DataType::Timestamp => "TIMESTAMP",
        DataType::Utf8 | DataType::List => "TEXT",
    }
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Int64(v) => SqlValue::Integer(*v),
        Value::Float64(v) => SqlValue::Real(*v),
        Value::Utf8(s) => SqlValue::Text(s.clone()),
        Value::Timestamp(ts) => SqlValue::Text(format_timestamp(ts)),
        Value::List(_) => render_cell(value).map(SqlValue::Text).unwrap_or(SqlValue::Null),
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
