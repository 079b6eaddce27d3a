//! DuckDB database backend implementation

use crate::cursor::{ColumnDescriptor, ResultCursor, SqlType, StatementHandle};
use crate::error::{DbError, DbResult};
use crate::traits::Database;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use duckdb::arrow::array::Array;
use duckdb::arrow::datatypes::DataType;
use duckdb::arrow::util::display::array_value_to_string;
use duckdb::types::{EnumType, ListType, ToSqlOutput, ValueRef};
use duckdb::{Connection, Row, Rows, ToSql};
use fallible_streaming_iterator::FallibleStreamingIterator;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tl_core::sql_utils::{quote_qualified, split_qualified_name};
use tl_core::Value;

/// Type code for BOOLEAN columns
const BOOLEAN_CODE: i32 = 16;
/// Type code for TINYINT columns
const TINYINT_CODE: i32 = -6;

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", e, path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Run `f` with a statement handle on this connection.
    ///
    /// The connection stays locked for the whole call, so every cursor the
    /// statement produces must be finished inside `f`.
    pub fn with_statement<T>(
        &self,
        f: impl FnOnce(&mut DuckDbStatement<'_>) -> DbResult<T>,
    ) -> DbResult<T> {
        let conn = self.lock()?;
        let mut statement = DuckDbStatement::new(&conn);
        f(&mut statement)
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(DbError::from)
    }

    /// Query count synchronously
    fn query_count_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
            row.get(0)
        })?;
        usize::try_from(count).map_err(|e| DbError::Internal(e.to_string()))
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let conn = self.lock()?;
        let (schema, table) = split_qualified_name(name);
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
            [schema, table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert every row with one prepared statement inside a transaction
    fn insert_rows_sync(&self, sql: &str, rows: &[Vec<Value>]) -> DbResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx
                .prepare(sql)
                .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?;
            for row in rows {
                inserted += stmt.execute(duckdb::params_from_iter(row.iter().map(SqlParam)))?;
            }
        }
        tx.commit()?;
        log::debug!("Committed batch of {} rows", inserted);
        Ok(inserted)
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.query_count_sync(sql)
    }

    async fn drop_if_exists(&self, name: &str) -> DbResult<()> {
        // Dropping a table as a view (or the reverse) fails, so try both
        let quoted = quote_qualified(name);
        let _ = self.execute_sync(&format!("DROP VIEW IF EXISTS {}", quoted));
        let _ = self.execute_sync(&format!("DROP TABLE IF EXISTS {}", quoted));
        Ok(())
    }

    async fn insert_rows(&self, sql: &str, rows: &[Vec<Value>]) -> DbResult<usize> {
        self.insert_rows_sync(sql, rows)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

/// Reusable statement handle over a borrowed DuckDB connection.
///
/// Each execution prepares the query afresh; the returned cursor borrows the
/// handle until it is dropped.
pub struct DuckDbStatement<'conn> {
    conn: &'conn Connection,
    prepared: Option<duckdb::Statement<'conn>>,
}

impl<'conn> DuckDbStatement<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            prepared: None,
        }
    }
}

impl<'conn> StatementHandle for DuckDbStatement<'conn> {
    type Cursor<'a>
        = DuckDbCursor<'a>
    where
        Self: 'a;

    fn execute_query(&mut self, sql: &str) -> DbResult<Self::Cursor<'_>> {
        let prepared = self.prepared.insert(self.conn.prepare(sql)?);
        let rows = prepared.query([])?;
        Ok(DuckDbCursor { rows: Some(rows) })
    }
}

/// [`ResultCursor`] over DuckDB [`Rows`]
pub struct DuckDbCursor<'stmt> {
    rows: Option<Rows<'stmt>>,
}

impl<'stmt> DuckDbCursor<'stmt> {
    fn current(&self) -> DbResult<&Row<'stmt>> {
        let rows = self
            .rows
            .as_ref()
            .ok_or_else(|| DbError::CursorError("cursor is closed".to_string()))?;
        FallibleStreamingIterator::get(rows)
            .ok_or_else(|| DbError::CursorError("cursor is not positioned on a row".to_string()))
    }

    fn read<T: duckdb::types::FromSql>(&self, idx: usize) -> DbResult<Option<T>> {
        self.current()?
            .get::<_, Option<T>>(idx)
            .map_err(|e| DbError::CursorError(format!("column {}: {}", idx, e)))
    }

    fn read_ref(&self, idx: usize) -> DbResult<ValueRef<'_>> {
        self.current()?
            .get_ref(idx)
            .map_err(|e| DbError::CursorError(format!("column {}: {}", idx, e)))
    }
}

impl ResultCursor for DuckDbCursor<'_> {
    fn advance(&mut self) -> DbResult<bool> {
        let rows = self
            .rows
            .as_mut()
            .ok_or_else(|| DbError::CursorError("cursor is closed".to_string()))?;
        FallibleStreamingIterator::advance(rows).map_err(|e| DbError::CursorError(e.to_string()))?;
        Ok(FallibleStreamingIterator::get(rows).is_some())
    }

    fn column_count(&self) -> DbResult<usize> {
        Ok(self.current()?.as_ref().column_count())
    }

    fn column_descriptor(&self, idx: usize) -> DbResult<ColumnDescriptor> {
        let stmt = self.current()?.as_ref();
        if idx >= stmt.column_count() {
            return Err(DbError::CursorError(format!(
                "column index {} out of range",
                idx
            )));
        }
        let name = stmt
            .column_name(idx)
            .map_err(|e| DbError::CursorError(e.to_string()))?
            .to_string();
        let data_type = stmt.column_type(idx);
        Ok(ColumnDescriptor {
            label: name.clone(),
            name,
            // DuckDB does not report the originating table
            table_name: String::new(),
            class_name: data_type.to_string(),
            sql_type: sql_type_for(&data_type),
        })
    }

    fn get_date(&self, idx: usize) -> DbResult<Option<NaiveDate>> {
        self.read(idx)
    }

    fn get_time(&self, idx: usize) -> DbResult<Option<NaiveTime>> {
        self.read(idx)
    }

    fn get_timestamp(&self, idx: usize) -> DbResult<Option<NaiveDateTime>> {
        self.read(idx)
    }

    fn get_i64(&self, idx: usize) -> DbResult<Option<i64>> {
        self.read(idx)
    }

    fn get_f64(&self, idx: usize) -> DbResult<Option<f64>> {
        self.read(idx)
    }

    fn get_f32(&self, idx: usize) -> DbResult<Option<f32>> {
        self.read(idx)
    }

    fn get_i32(&self, idx: usize) -> DbResult<Option<i32>> {
        self.read(idx)
    }

    fn get_i16(&self, idx: usize) -> DbResult<Option<i16>> {
        self.read(idx)
    }

    fn get_numeric(&self, idx: usize) -> DbResult<Option<f64>> {
        match self.read_ref(idx)? {
            ValueRef::Null => Ok(None),
            ValueRef::Decimal(d) => d.to_string().parse::<f64>().map(Some).map_err(|e| {
                DbError::CursorError(format!("column {}: decimal {}: {}", idx, d, e))
            }),
            ValueRef::HugeInt(v) => Ok(Some(v as f64)),
            _ => self.read(idx),
        }
    }

    fn get_string(&self, idx: usize) -> DbResult<Option<String>> {
        let text = match self.read_ref(idx)? {
            ValueRef::Null => return Ok(None),
            ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            ValueRef::Boolean(b) => b.to_string(),
            ValueRef::TinyInt(v) => v.to_string(),
            ValueRef::SmallInt(v) => v.to_string(),
            ValueRef::Int(v) => v.to_string(),
            ValueRef::BigInt(v) => v.to_string(),
            ValueRef::HugeInt(v) => v.to_string(),
            ValueRef::UTinyInt(v) => v.to_string(),
            ValueRef::USmallInt(v) => v.to_string(),
            ValueRef::UInt(v) => v.to_string(),
            ValueRef::UBigInt(v) => v.to_string(),
            ValueRef::Float(v) => v.to_string(),
            ValueRef::Double(v) => v.to_string(),
            ValueRef::UHugeInt(v) => v.to_string(),
            ValueRef::Decimal(d) => d.to_string(),
            ValueRef::Blob(bytes) | ValueRef::Geometry(bytes) => hex(bytes),
            ValueRef::Date32(days) => epoch_date(idx, days)?.format("%Y-%m-%d").to_string(),
            ValueRef::Time64(unit, v) => time_text(idx, unit.to_micros(v))?,
            ValueRef::Timestamp(unit, v) => timestamp_text(idx, unit.to_micros(v))?,
            ValueRef::Interval {
                months,
                days,
                nanos,
            } => interval_text(months, days, nanos),
            ValueRef::List(ListType::Regular(arr), row) => nested_text(idx, arr, row)?,
            ValueRef::List(ListType::Large(arr), row) => nested_text(idx, arr, row)?,
            ValueRef::Enum(EnumType::UInt8(arr), row) => nested_text(idx, arr, row)?,
            ValueRef::Enum(EnumType::UInt16(arr), row) => nested_text(idx, arr, row)?,
            ValueRef::Enum(EnumType::UInt32(arr), row) => nested_text(idx, arr, row)?,
            ValueRef::Struct(arr, row) => nested_text(idx, arr, row)?,
            ValueRef::Array(arr, row) => nested_text(idx, arr, row)?,
            ValueRef::Map(arr, row) => nested_text(idx, arr, row)?,
            ValueRef::Union(arr, row) => nested_text(idx, arr.as_ref(), row)?,
            other => {
                return Err(DbError::CursorError(format!(
                    "column {}: no text form for {} values",
                    idx,
                    other.data_type()
                )))
            }
        };
        Ok(Some(text))
    }

    fn close(&mut self) -> DbResult<()> {
        self.rows = None;
        Ok(())
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn epoch_date(idx: usize, days: i32) -> DbResult<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_signed(TimeDelta::days(i64::from(days))))
        .ok_or_else(|| DbError::CursorError(format!("column {}: date out of range", idx)))
}

fn time_text(idx: usize, micros: i64) -> DbResult<String> {
    let secs = u32::try_from(micros.div_euclid(1_000_000)).ok();
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    secs.and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, nanos))
        .map(|t| t.format("%H:%M:%S%.f").to_string())
        .ok_or_else(|| DbError::CursorError(format!("column {}: time out of range", idx)))
}

fn timestamp_text(idx: usize, micros: i64) -> DbResult<String> {
    DateTime::from_timestamp_micros(micros)
        .map(|ts| ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
        .ok_or_else(|| DbError::CursorError(format!("column {}: timestamp out of range", idx)))
}

/// Interval text in DuckDB's own form, e.g. `1 year 2 months 3 days 04:05:06.5`
fn interval_text(months: i32, days: i32, nanos: i64) -> String {
    fn unit(n: i64, name: &str) -> String {
        if n.abs() == 1 {
            format!("{} {}", n, name)
        } else {
            format!("{} {}s", n, name)
        }
    }

    let mut parts = Vec::new();
    let (years, months) = (i64::from(months / 12), i64::from(months % 12));
    if years != 0 {
        parts.push(unit(years, "year"));
    }
    if months != 0 {
        parts.push(unit(months, "month"));
    }
    if days != 0 {
        parts.push(unit(i64::from(days), "day"));
    }

    let micros = nanos / 1_000;
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let micros = micros.unsigned_abs();
        let secs = micros / 1_000_000;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        let frac = micros % 1_000_000;
        if frac != 0 {
            let digits = format!("{:06}", frac);
            clock.push('.');
            clock.push_str(digits.trim_end_matches('0'));
        }
        parts.push(clock);
    }
    parts.join(" ")
}

/// Render row `row` of a nested Arrow array (list, enum, struct, map)
fn nested_text(idx: usize, array: &dyn Array, row: usize) -> DbResult<String> {
    array_value_to_string(array, row)
        .map_err(|e| DbError::CursorError(format!("column {}: {}", idx, e)))
}

/// Map the Arrow type DuckDB reports for a result column to a [`SqlType`]
fn sql_type_for(data_type: &DataType) -> SqlType {
    match data_type {
        DataType::Date32 | DataType::Date64 => SqlType::Date,
        DataType::Time32(_) | DataType::Time64(_) => SqlType::Time,
        DataType::Timestamp(_, _) => SqlType::Timestamp,
        DataType::Int64 => SqlType::BigInt,
        DataType::Float64 => SqlType::Double,
        DataType::Float32 => SqlType::Float,
        DataType::Int32 => SqlType::Integer,
        DataType::Int16 => SqlType::SmallInt,
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => SqlType::Numeric,
        DataType::Utf8 | DataType::LargeUtf8 => SqlType::Other(SqlType::VARCHAR_CODE),
        DataType::Boolean => SqlType::Other(BOOLEAN_CODE),
        DataType::Int8 => SqlType::Other(TINYINT_CODE),
        _ => SqlType::Other(SqlType::OTHER_CODE),
    }
}

/// Binds a record value as a DuckDB parameter
struct SqlParam<'a>(&'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        match self.0 {
            Value::Null => Ok(ToSqlOutput::Owned(duckdb::types::Value::Null)),
            Value::Date(d) => d.to_sql(),
            Value::Time(t) => t.to_sql(),
            Value::Timestamp(ts) => ts.to_sql(),
            Value::BigInt(v) => v.to_sql(),
            Value::Double(v) => v.to_sql(),
            Value::Float(v) => v.to_sql(),
            Value::Integer(v) => v.to_sql(),
            Value::SmallInt(v) => v.to_sql(),
            Value::Text(s) => s.to_sql(),
        }
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
