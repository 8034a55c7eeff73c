//! CSV sink: one `<label>_repair_orders.csv` file per window.

use std::path::{Path, PathBuf};

use crate::error::PipelineResult;
use crate::processing::RepairOrderTable;

use super::{render_cell, TableSink, INDEX_COLUMN};

/// Writes each table to `<dir>/<table>.csv`, replacing an existing file.
///
/// Nulls are written as empty fields. The directory is created on the first write.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File a table is written to.
    pub fn file_for(&self, table: &RepairOrderTable) -> PathBuf {
        self.dir.join(format!("{}.csv", table.destination_name()))
    }
}

impl TableSink for CsvSink {
    fn describe(&self) -> String {
        format!("csv:{}", self.dir.display())
    }

    fn write_table(&mut self, table: &RepairOrderTable) -> PipelineResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.file_for(table);
        // Written next to the destination and renamed over it once complete.
        let partial = path.with_extension("csv.partial");

        let mut wtr = ::csv::Writer::from_path(&partial)?;
        let header = std::iter::once(INDEX_COLUMN).chain(table.dataset.schema.field_names());
        wtr.write_record(header)?;
        for (row, source_row) in table.dataset.rows.iter().zip(&table.row_index) {
            let cells = row.iter().map(|v| render_cell(v).unwrap_or_default());
            wtr.write_record(std::iter::once(source_row.to_string()).chain(cells))?;
        }
        wtr.flush()?;
        drop(wtr);

        std::fs::rename(&partial, &path)?;
        tracing::debug!(path = %path.display(), rows = table.row_count(), "csv file written");
        Ok(())
    }
}
