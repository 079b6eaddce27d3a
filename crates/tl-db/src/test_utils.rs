//! Scripted cursors for exercising the type-mapped cursor without a database

use crate::cursor::{ColumnDescriptor, ResultCursor, SqlType, StatementHandle};
use crate::error::{DbError, DbResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tl_core::Value;

/// Build a descriptor whose name and label are both `label`
pub fn column(label: &str, sql_type: SqlType) -> ColumnDescriptor {
    ColumnDescriptor {
        name: label.to_string(),
        label: label.to_string(),
        table_name: "scripted".to_string(),
        class_name: format!("{sql_type}"),
        sql_type,
    }
}

/// Counters shared between a scripted cursor and the test that owns it
#[derive(Debug, Default, Clone)]
pub struct CursorProbe {
    closes: Arc<AtomicUsize>,
    open: Arc<AtomicUsize>,
}

impl CursorProbe {
    /// Number of `close` calls seen
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Cursors handed out and not yet closed
    pub fn open_cursors(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

/// In-memory [`ResultCursor`] that replays fixed rows.
///
/// Getters are strict: asking for an `i64` from a cell holding text is a
/// cursor error, which is how tests inject malformed values.
#[derive(Debug)]
pub struct ScriptedCursor {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<Value>>,
    position: Option<usize>,
    closed: bool,
    fail_advance_at: Option<usize>,
    fail_metadata: bool,
    fail_close: bool,
    probe: CursorProbe,
}

impl ScriptedCursor {
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<Value>>) -> Self {
        let probe = CursorProbe::default();
        probe.open.fetch_add(1, Ordering::SeqCst);
        Self {
            columns,
            rows,
            position: None,
            closed: false,
            fail_advance_at: None,
            fail_metadata: false,
            fail_close: false,
            probe,
        }
    }

    /// Fail the advance that would move onto row `row` (zero-based)
    pub fn fail_advance_at(mut self, row: usize) -> Self {
        self.fail_advance_at = Some(row);
        self
    }

    /// Fail every metadata read
    pub fn fail_metadata(mut self) -> Self {
        self.fail_metadata = true;
        self
    }

    /// Make `close` report an error (after marking the cursor closed)
    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Share counters with an existing probe
    pub fn with_probe(mut self, probe: &CursorProbe) -> Self {
        self.probe.open.fetch_sub(1, Ordering::SeqCst);
        self.probe = probe.clone();
        self.probe.open.fetch_add(1, Ordering::SeqCst);
        self
    }

    /// Handle to this cursor's counters
    pub fn probe(&self) -> CursorProbe {
        self.probe.clone()
    }

    fn cell(&self, idx: usize) -> DbResult<&Value> {
        if self.closed {
            return Err(DbError::CursorError("cursor is closed".to_string()));
        }
        let row = self
            .position
            .and_then(|pos| self.rows.get(pos))
            .ok_or_else(|| DbError::CursorError("no current row".to_string()))?;
        row.get(idx)
            .ok_or_else(|| DbError::CursorError(format!("column index {idx} out of range")))
    }

    fn typed<T>(
        &self,
        idx: usize,
        want: &str,
        pick: impl Fn(&Value) -> Option<T>,
    ) -> DbResult<Option<T>> {
        let value = self.cell(idx)?;
        if value.is_null() {
            return Ok(None);
        }
        pick(value).map(Some).ok_or_else(|| {
            DbError::CursorError(format!(
                "cannot read {} value '{}' as {}",
                value.kind(),
                value,
                want
            ))
        })
    }
}

impl ResultCursor for ScriptedCursor {
    fn advance(&mut self) -> DbResult<bool> {
        if self.closed {
            return Err(DbError::CursorError("cursor is closed".to_string()));
        }
        let next = self.position.map_or(0, |pos| pos + 1);
        if self.fail_advance_at == Some(next) {
            return Err(DbError::CursorError(format!("connection lost before row {next}")));
        }
        self.position = Some(next);
        Ok(next < self.rows.len())
    }

    fn column_count(&self) -> DbResult<usize> {
        if self.fail_metadata {
            return Err(DbError::CursorError("metadata unavailable".to_string()));
        }
        Ok(self.columns.len())
    }

    fn column_descriptor(&self, idx: usize) -> DbResult<ColumnDescriptor> {
        if self.fail_metadata {
            return Err(DbError::CursorError("metadata unavailable".to_string()));
        }
        self.columns
            .get(idx)
            .cloned()
            .ok_or_else(|| DbError::CursorError(format!("column index {idx} out of range")))
    }

    fn get_date(&self, idx: usize) -> DbResult<Option<NaiveDate>> {
        self.typed(idx, "date", |v| match v {
            Value::Date(d) => Some(*d),
            _ => None,
        })
    }

    fn get_time(&self, idx: usize) -> DbResult<Option<NaiveTime>> {
        self.typed(idx, "time", |v| match v {
            Value::Time(t) => Some(*t),
            _ => None,
        })
    }

    fn get_timestamp(&self, idx: usize) -> DbResult<Option<NaiveDateTime>> {
        self.typed(idx, "timestamp", |v| match v {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        })
    }

    fn get_i64(&self, idx: usize) -> DbResult<Option<i64>> {
        self.typed(idx, "i64", Value::as_i64)
    }

    fn get_f64(&self, idx: usize) -> DbResult<Option<f64>> {
        self.typed(idx, "f64", Value::as_f64)
    }

    fn get_f32(&self, idx: usize) -> DbResult<Option<f32>> {
        self.typed(idx, "f32", |v| v.as_f64().map(|f| f as f32))
    }

    fn get_i32(&self, idx: usize) -> DbResult<Option<i32>> {
        self.typed(idx, "i32", |v| v.as_i64().and_then(|i| i32::try_from(i).ok()))
    }

    fn get_i16(&self, idx: usize) -> DbResult<Option<i16>> {
        self.typed(idx, "i16", |v| v.as_i64().and_then(|i| i16::try_from(i).ok()))
    }

    fn get_numeric(&self, idx: usize) -> DbResult<Option<f64>> {
        self.typed(idx, "numeric", |v| match v {
            Value::Text(s) => s.parse().ok(),
            other => other.as_f64(),
        })
    }

    fn get_string(&self, idx: usize) -> DbResult<Option<String>> {
        self.typed(idx, "string", |v| Some(v.to_string()))
    }

    fn close(&mut self) -> DbResult<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        if !self.closed {
            self.closed = true;
            self.probe.open.fetch_sub(1, Ordering::SeqCst);
        }
        if self.fail_close {
            return Err(DbError::CursorError("close failed".to_string()));
        }
        Ok(())
    }
}

/// Scripted result for one query string
#[derive(Debug, Clone)]
pub struct ScriptedResult {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<Value>>,
}

/// In-memory [`StatementHandle`] serving scripted results by query text.
///
/// Like most drivers, it refuses to execute while a cursor it handed out is
/// still open.
#[derive(Debug, Default)]
pub struct ScriptedStatement {
    results: HashMap<String, ScriptedResult>,
    executed: Vec<String>,
    probe: CursorProbe,
}

impl ScriptedStatement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the result returned for `sql`
    pub fn with_result(
        mut self,
        sql: &str,
        columns: Vec<ColumnDescriptor>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        self.results.insert(sql.to_string(), ScriptedResult { columns, rows });
        self
    }

    /// Queries executed so far, in order
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Counters shared by every cursor this statement hands out
    pub fn probe(&self) -> CursorProbe {
        self.probe.clone()
    }
}

impl StatementHandle for ScriptedStatement {
    type Cursor<'a> = ScriptedCursor;

    fn execute_query(&mut self, sql: &str) -> DbResult<Self::Cursor<'_>> {
        if self.probe.open_cursors() > 0 {
            return Err(DbError::ExecutionError(
                "statement already has an open result cursor".to_string(),
            ));
        }
        let result = self
            .results
            .get(sql)
            .ok_or_else(|| DbError::ExecutionError(format!("no scripted result for: {sql}")))?;
        self.executed.push(sql.to_string());
        let cursor = ScriptedCursor::new(result.columns.clone(), result.rows.clone());
        Ok(cursor.with_probe(&self.probe))
    }
}
