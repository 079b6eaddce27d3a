//! The inbound cursor contract
//!
//! A [`ResultCursor`] is a live, forward-only pointer over the rows of an
//! executed query. It starts positioned before the first row; each
//! [`advance`](ResultCursor::advance) moves to the next row, and the typed
//! getters read a column of the current row. A [`StatementHandle`] executes
//! query strings and hands out cursors.

use crate::error::DbResult;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// Declared SQL type of a result column.
///
/// Only the types with a dedicated decoding rule have their own variant.
/// Everything else is `Other` and decodes to its string representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Date,
    Time,
    Timestamp,
    BigInt,
    Double,
    Float,
    Integer,
    SmallInt,
    Numeric,
    /// Any other type, carrying its raw type code
    Other(i32),
}

impl SqlType {
    /// Type code for generic character data
    pub const VARCHAR_CODE: i32 = 12;
    /// Type code for types with no standard mapping
    pub const OTHER_CODE: i32 = 1111;

    /// Integer type code (JDBC `java.sql.Types` numbering)
    pub fn code(self) -> i32 {
        match self {
            SqlType::Date => 91,
            SqlType::Time => 92,
            SqlType::Timestamp => 93,
            SqlType::BigInt => -5,
            SqlType::Double => 8,
            SqlType::Float => 6,
            SqlType::Integer => 4,
            SqlType::SmallInt => 5,
            SqlType::Numeric => 2,
            SqlType::Other(code) => code,
        }
    }

    /// Map a type code back to a type; unknown codes become `Other`
    pub fn from_code(code: i32) -> Self {
        match code {
            91 => SqlType::Date,
            92 => SqlType::Time,
            93 => SqlType::Timestamp,
            -5 => SqlType::BigInt,
            8 => SqlType::Double,
            6 => SqlType::Float,
            4 => SqlType::Integer,
            5 => SqlType::SmallInt,
            2 => SqlType::Numeric,
            other => SqlType::Other(other),
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Date => write!(f, "DATE"),
            SqlType::Time => write!(f, "TIME"),
            SqlType::Timestamp => write!(f, "TIMESTAMP"),
            SqlType::BigInt => write!(f, "BIGINT"),
            SqlType::Double => write!(f, "DOUBLE"),
            SqlType::Float => write!(f, "FLOAT"),
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::SmallInt => write!(f, "SMALLINT"),
            SqlType::Numeric => write!(f, "NUMERIC"),
            SqlType::Other(code) => write!(f, "OTHER({code})"),
        }
    }
}

/// Per-column metadata captured once per query execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name as reported by the source
    pub name: String,
    /// Column label (alias) as reported by the source
    pub label: String,
    /// Owning table name; empty when the source does not report it
    pub table_name: String,
    /// Source-side type name of the values in this column
    pub class_name: String,
    /// Declared SQL type
    pub sql_type: SqlType,
}

/// A live, forward-only cursor over query results.
///
/// Column indexes are zero-based. Getters return `Ok(None)` for SQL NULL.
/// Reading a column before the first successful `advance`, or after `close`,
/// is an error.
pub trait ResultCursor {
    /// Move to the next row. Returns `false` when no row remains.
    fn advance(&mut self) -> DbResult<bool>;

    /// Number of columns in the result
    fn column_count(&self) -> DbResult<usize>;

    /// Metadata for the column at `idx`
    fn column_descriptor(&self, idx: usize) -> DbResult<ColumnDescriptor>;

    fn get_date(&self, idx: usize) -> DbResult<Option<NaiveDate>>;
    fn get_time(&self, idx: usize) -> DbResult<Option<NaiveTime>>;
    fn get_timestamp(&self, idx: usize) -> DbResult<Option<NaiveDateTime>>;
    fn get_i64(&self, idx: usize) -> DbResult<Option<i64>>;
    fn get_f64(&self, idx: usize) -> DbResult<Option<f64>>;
    fn get_f32(&self, idx: usize) -> DbResult<Option<f32>>;
    fn get_i32(&self, idx: usize) -> DbResult<Option<i32>>;
    fn get_i16(&self, idx: usize) -> DbResult<Option<i16>>;

    /// Arbitrary-precision numeric, narrowed to `f64`
    fn get_numeric(&self, idx: usize) -> DbResult<Option<f64>>;

    /// String representation of any column type
    fn get_string(&self, idx: usize) -> DbResult<Option<String>>;

    /// Release the cursor. Calling `close` twice is not an error.
    fn close(&mut self) -> DbResult<()>;
}

/// Executes query strings and hands out result cursors.
///
/// The cursor may borrow the handle, so at most one cursor per handle is
/// alive at a time.
pub trait StatementHandle {
    type Cursor<'a>: ResultCursor
    where
        Self: 'a;

    /// Execute `sql` and return a cursor positioned before the first row
    fn execute_query(&mut self, sql: &str) -> DbResult<Self::Cursor<'_>>;
}

impl<S: StatementHandle + ?Sized> StatementHandle for &mut S {
    type Cursor<'a>
        = S::Cursor<'a>
    where
        Self: 'a;

    fn execute_query(&mut self, sql: &str) -> DbResult<Self::Cursor<'_>> {
        (**self).execute_query(sql)
    }
}
