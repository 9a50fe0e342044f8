//! Error types for parquet-studio

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the engine, the table model and the editing session
#[derive(Debug, Error)]
pub enum StudioError {
    /// The Parquet file to load does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file is neither named nor shaped like a Parquet file
    #[error("Unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// An edit or save was attempted before any file was opened
    #[error("No data loaded. Please open a file first.")]
    NoDataLoaded,

    /// A save was attempted on a table without columns
    #[error("No columns to save")]
    NoColumns,

    /// Column add/delete was rejected
    #[error("{0}")]
    InvalidColumn(String),

    /// Cell coordinates outside the table
    #[error("Cell ({row}, {column}) is outside the table ({rows} rows x {columns} columns)")]
    CellOutOfRange {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    },

    /// Text could not be converted to the column type
    #[error("Error converting value to {column_type}: {reason}")]
    Conversion { column_type: String, reason: String },

    /// A cell does not fit the Arrow type of its column
    #[error("Value in column '{column}' at row {row} is not compatible with {expected}")]
    TypeMismatch {
        column: String,
        row: usize,
        expected: String,
    },

    /// The schema file is missing or has an unsupported extension
    #[error("{0}")]
    SchemaFile(String),

    /// The schema file is not valid JSON for a schema structure
    #[error("Failed to parse schema file {}: {source}", path.display())]
    SchemaParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A transform was requested before its inputs were loaded
    #[error("{0}")]
    SchemaNotReady(&'static str),

    /// The schema file does not cover exactly the table's columns
    #[error("The schema does not have the same fields as the parquet file: {0}")]
    StrictMode(String),

    /// The save destination exists and overwriting was not allowed
    #[error("File already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Closing would drop unsaved edits
    #[error("Unsaved changes in {}", .0.display())]
    UnsavedChanges(PathBuf),

    #[error("Query engine error: {0}")]
    Engine(#[from] datafusion::error::DataFusionError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StudioError {
    pub(crate) fn invalid_column(message: impl Into<String>) -> Self {
        StudioError::InvalidColumn(message.into())
    }
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, StudioError>;
