use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by every stage of the pipeline.
///
/// One enum is shared across collection, extraction, normalization, windowing and persistence so
/// callers can tell "document unparseable" apart from "database locked" by matching on the
/// variant.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Underlying I/O error (e.g. directory not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A matched input file could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source directory contained no files with the expected extension.
    #[error("no .{extension} files found in '{}'", dir.display())]
    NoInput { dir: PathBuf, extension: String },

    /// A document is not well-formed XML.
    #[error("malformed document {document}: {message}")]
    MalformedDocument { document: String, message: String },

    /// A column required by a processing step is absent from the dataset.
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    /// A value could not be coerced into the column's required type.
    #[error("failed to coerce value at row {row} column '{column}': {message} (raw='{raw}')")]
    TypeCoercion {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// The window specification ends with an unknown unit letter.
    #[error("invalid window unit '{unit}' in '{spec}': expected m (minutes), h (hours), d (days) or w (weeks)")]
    InvalidWindowUnit { spec: String, unit: String },

    /// The window specification quantity is not a positive integer.
    #[error("invalid window '{spec}': {message}")]
    InvalidWindowSpec { spec: String, message: String },

    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// CSV writer error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Writing a table to a sink failed.
    #[error("could not save table '{table}': {source}")]
    Persistence {
        table: String,
        #[source]
        source: Box<PipelineError>,
    },

    /// The configuration file could not be decoded.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl PipelineError {
    /// Wrap a sink error with the destination table it was writing.
    pub fn persistence(table: impl Into<String>, source: PipelineError) -> Self {
        Self::Persistence {
            table: table.into(),
            source: Box::new(source),
        }
    }
}
