//! Type-mapped result cursor
//!
//! [`TypeMappedCursor`] wraps a live [`ResultCursor`] and exposes it as a
//! pull sequence of [`Record`]s. Column metadata is captured once, on the
//! first row; labels go through the header normalizer; every column is
//! decoded by its declared [`SqlType`]. Exactly one record is decoded ahead
//! of the caller, so [`has_next`](TypeMappedCursor::has_next) never touches
//! the underlying cursor.
//!
//! # Resource ownership
//!
//! The wrapper owns the underlying cursor. It is closed automatically on
//! natural exhaustion and on any read failure. A caller that stops pulling
//! early should call [`close`](TypeMappedCursor::close); dropping the
//! wrapper also closes it, but any close error is then only logged.

use crate::cursor::{ColumnDescriptor, ResultCursor, SqlType};
use crate::error::{DbError, DbResult};
use std::collections::HashMap;
use std::iter::FusedIterator;
use std::sync::Arc;
use tl_core::{normalize_headers, Record, Value};

/// Origin label attached to every record read from the database
pub const DB_ORIGIN: &str = "db";

/// Lookahead state
#[derive(Debug)]
enum State {
    /// The next record, already decoded
    Buffered(Record),
    /// No rows remain
    Exhausted,
    /// A read failed; the error is held until the caller pulls it
    Failed(Option<DbError>),
}

/// Lazy, single-pass sequence of records over a query result.
pub struct TypeMappedCursor<C: ResultCursor> {
    cursor: Option<C>,
    descriptors: Vec<ColumnDescriptor>,
    headers: Arc<[String]>,
    by_name: HashMap<String, usize>,
    state: State,
}

impl<C: ResultCursor> TypeMappedCursor<C> {
    /// Wrap a cursor positioned before its first row.
    ///
    /// An empty result closes the cursor immediately and yields an
    /// exhausted sequence. A failure while reading the first row or the
    /// column metadata closes the cursor and is returned here.
    pub fn new(mut cursor: C) -> DbResult<Self> {
        let has_row = match cursor.advance() {
            Ok(has_row) => has_row,
            Err(err) => return Err(abort(cursor, err)),
        };

        if !has_row {
            log::debug!("Query returned no rows; closing cursor");
            close_quietly(cursor);
            return Ok(Self {
                cursor: None,
                descriptors: Vec::new(),
                headers: Arc::from(Vec::<String>::new()),
                by_name: HashMap::new(),
                state: State::Exhausted,
            });
        }

        let descriptors = match read_descriptors(&cursor) {
            Ok(descriptors) => descriptors,
            Err(err) => return Err(abort(cursor, err)),
        };
        let labels: Vec<&str> = descriptors.iter().map(|d| d.label.as_str()).collect();
        let headers: Arc<[String]> = normalize_headers(&labels).into();
        let by_name = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        log::debug!("Opened result cursor with {} columns", descriptors.len());

        let mut this = Self {
            cursor: Some(cursor),
            descriptors,
            headers,
            by_name,
            state: State::Exhausted,
        };
        this.fill();
        if let State::Failed(pending) = &mut this.state {
            if let Some(err) = pending.take() {
                return Err(err);
            }
        }
        Ok(this)
    }

    /// Normalized field names, in column order. Empty for an empty result.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Column metadata, in column order. Empty for an empty result.
    pub fn column_descriptors(&self) -> &[ColumnDescriptor] {
        &self.descriptors
    }

    /// Metadata for the column behind a normalized field name
    pub fn column_descriptor(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.by_name.get(name).map(|&idx| &self.descriptors[idx])
    }

    /// True when a record is buffered and `take_next` will return it.
    ///
    /// A read failure is not a record: it is reported by the next
    /// [`take_next`](Self::take_next) call, see [`has_failed`](Self::has_failed).
    pub fn has_next(&self) -> bool {
        matches!(self.state, State::Buffered(_))
    }

    /// True once a read failure has ended the sequence
    pub fn has_failed(&self) -> bool {
        matches!(self.state, State::Failed(_))
    }

    /// True while the underlying cursor is still held open
    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    /// Return the buffered record and decode the one after it.
    ///
    /// Fails with [`DbError::Exhausted`] when nothing is buffered. If
    /// decoding the following row fails, the record is still returned and
    /// the failure is raised by the next call.
    pub fn take_next(&mut self) -> DbResult<Record> {
        match std::mem::replace(&mut self.state, State::Exhausted) {
            State::Buffered(record) => {
                self.fill();
                Ok(record)
            }
            State::Failed(pending) => {
                self.state = State::Failed(None);
                Err(pending.unwrap_or(DbError::Exhausted))
            }
            State::Exhausted => Err(DbError::Exhausted),
        }
    }

    /// In-place removal is not supported.
    pub fn remove(&mut self) -> DbResult<()> {
        Err(DbError::Unsupported("record removal during iteration"))
    }

    /// Close the underlying cursor before exhaustion.
    ///
    /// Any buffered record is discarded. Closing an already closed sequence
    /// does nothing.
    pub fn close(&mut self) -> DbResult<()> {
        if let State::Buffered(_) = self.state {
            self.state = State::Exhausted;
        }
        match self.cursor.take() {
            Some(mut cursor) => {
                log::debug!("Closing result cursor before exhaustion");
                cursor.close()
            }
            None => Ok(()),
        }
    }

    /// Decode the current row into the lookahead buffer, then step the
    /// underlying cursor.
    fn fill(&mut self) {
        let Some(cursor) = self.cursor.as_mut() else {
            self.state = State::Exhausted;
            return;
        };

        match read_row(cursor, &self.descriptors, &self.headers) {
            Ok((record, more)) => {
                if !more {
                    log::debug!("Result cursor exhausted");
                    self.release();
                }
                self.state = State::Buffered(record);
            }
            Err(err) => {
                self.release();
                self.state = State::Failed(Some(DbError::SequenceAborted {
                    source: Box::new(err),
                }));
            }
        }
    }

    fn release(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            close_quietly(cursor);
        }
    }
}

impl<C: ResultCursor> Iterator for TypeMappedCursor<C> {
    type Item = DbResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::Buffered(_) | State::Failed(Some(_)) => Some(self.take_next()),
            State::Exhausted | State::Failed(None) => None,
        }
    }
}

impl<C: ResultCursor> FusedIterator for TypeMappedCursor<C> {}

impl<C: ResultCursor> Drop for TypeMappedCursor<C> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<C: ResultCursor> std::fmt::Debug for TypeMappedCursor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMappedCursor")
            .field("headers", &self.headers)
            .field("open", &self.cursor.is_some())
            .field("state", &self.state)
            .finish()
    }
}

fn read_descriptors<C: ResultCursor>(cursor: &C) -> DbResult<Vec<ColumnDescriptor>> {
    let count = cursor.column_count()?;
    (0..count).map(|idx| cursor.column_descriptor(idx)).collect()
}

/// Decode the current row and advance. Returns the record and whether a
/// further row exists.
fn read_row<C: ResultCursor>(
    cursor: &mut C,
    descriptors: &[ColumnDescriptor],
    headers: &Arc<[String]>,
) -> DbResult<(Record, bool)> {
    let values = descriptors
        .iter()
        .enumerate()
        .map(|(idx, descriptor)| decode_column(&*cursor, idx, descriptor.sql_type))
        .collect::<DbResult<Vec<_>>>()?;
    let record = Record::new(DB_ORIGIN, Arc::clone(headers), values)?;
    let more = cursor.advance()?;
    Ok((record, more))
}

/// Read one column of the current row according to its declared type.
fn decode_column<C: ResultCursor>(cursor: &C, idx: usize, sql_type: SqlType) -> DbResult<Value> {
    let value = match sql_type {
        SqlType::Date => cursor.get_date(idx)?.map(Value::Date),
        SqlType::Time => cursor.get_time(idx)?.map(Value::Time),
        SqlType::Timestamp => cursor.get_timestamp(idx)?.map(Value::Timestamp),
        SqlType::BigInt => cursor.get_i64(idx)?.map(Value::BigInt),
        SqlType::Double => cursor.get_f64(idx)?.map(Value::Double),
        SqlType::Float => cursor.get_f32(idx)?.map(Value::Float),
        SqlType::Integer => cursor.get_i32(idx)?.map(Value::Integer),
        SqlType::SmallInt => cursor.get_i16(idx)?.map(Value::SmallInt),
        SqlType::Numeric => cursor.get_numeric(idx)?.map(Value::Double),
        SqlType::Other(_) => cursor.get_string(idx)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Close the cursor after `err` and wrap `err` as a fatal sequence error.
fn abort<C: ResultCursor>(cursor: C, err: DbError) -> DbError {
    close_quietly(cursor);
    DbError::SequenceAborted {
        source: Box::new(err),
    }
}

fn close_quietly<C: ResultCursor>(mut cursor: C) {
    if let Err(err) = cursor.close() {
        log::warn!("Ignoring error while closing result cursor: {err}");
    }
}

#[cfg(test)]
#[path = "type_mapped_test.rs"]
mod tests;
