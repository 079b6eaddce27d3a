//! Error types for tl-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Reading metadata, reading a column, or advancing a cursor failed (D004)
    #[error("[D004] Result cursor failed: {0}")]
    CursorError(String),

    /// The cursor was closed after an earlier failure (D005)
    ///
    /// Fatal: the sequence that raised it yields nothing further.
    #[error("[D005] Result sequence aborted: {source}")]
    SequenceAborted {
        #[source]
        source: Box<DbError>,
    },

    /// Next record requested from an exhausted sequence (D006)
    #[error("[D006] No more records in sequence")]
    Exhausted,

    /// Operation the sequence does not support (D007)
    #[error("[D007] Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Mutex poisoned (D008)
    #[error("[D008] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Internal error (D009)
    #[error("[D009] Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// True for failures that permanently end a result sequence
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DbError::Exhausted | DbError::Unsupported(_))
    }
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error carries no structured catalog variant, so missing
        // relations are recognised from the message text.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("View with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

impl From<tl_core::CoreError> for DbError {
    fn from(err: tl_core::CoreError) -> Self {
        DbError::Internal(err.to_string())
    }
}
