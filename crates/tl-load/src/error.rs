//! Error types for tl-load

use thiserror::Error;
use tl_core::CoreError;
use tl_db::DbError;

/// Loading error type
#[derive(Error, Debug)]
pub enum LoadError {
    /// L001: Input file could not be opened
    #[error("[L001] Failed to open '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// L002: Malformed delimited input
    #[error("[L002] Parse error in {source_name}: {source}")]
    Parse {
        source_name: String,
        source: csv::Error,
    },

    /// L003: Data row wider than the header line
    #[error("[L003] {source_name} line {line}: {found} fields but the header has {expected}")]
    RowWidth {
        source_name: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    /// L004: Input has no header line
    #[error("[L004] {source_name} has no header line")]
    MissingHeader { source_name: String },

    /// L005: Separator is not a single-byte character
    #[error("[L005] Invalid separator {0:?}: must be a single ASCII character")]
    InvalidDelimiter(char),

    /// L006: Nothing was scanned, so there are no columns to define
    #[error("[L006] No column definitions for table '{table}'")]
    NoColumns { table: String },

    /// L007: Statements requested before they were built
    #[error("[L007] SQL statements for table '{table}' have not been built")]
    NotPrepared { table: String },

    /// L008: A value does not fit the column type inferred for it
    #[error("[L008] {source_name}: cannot store '{value}' in column '{column}' as {sql_type}")]
    Conversion {
        source_name: String,
        column: String,
        value: String,
        sql_type: &'static str,
    },

    /// Database error
    #[error(transparent)]
    Db(#[from] DbError),

    /// Core error
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for LoadError
pub type LoadResult<T> = Result<T, LoadError>;
