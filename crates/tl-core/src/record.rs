//! Generic record: an ordered, string-keyed row of typed values
//!
//! Records are the row representation that crosses every crate boundary in
//! tableload. The delimited reader produces them, the database cursor
//! produces them, and the table loader consumes them. Field order is the
//! order of the headers the record was built from.

use crate::error::{CoreError, CoreResult};
use crate::value::Value;
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// One row of named values, tagged with where it came from.
///
/// Headers are shared between all records of one sequence, so building a
/// record per row only allocates the value vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    origin: Arc<str>,
    headers: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// Build a record from shared headers and one value per header.
    pub fn new(
        origin: impl Into<Arc<str>>,
        headers: Arc<[String]>,
        values: Vec<Value>,
    ) -> CoreResult<Self> {
        if headers.len() != values.len() {
            return Err(CoreError::RecordShape {
                headers: headers.len(),
                values: values.len(),
            });
        }
        Ok(Self {
            origin: origin.into(),
            headers,
            values,
        })
    }

    /// Provenance label (e.g. `"db"` or a source file name)
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Field names in order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Shared handle to the field names
    pub fn shared_headers(&self) -> Arc<[String]> {
        Arc::clone(&self.headers)
    }

    /// Values in field order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Look up a value by field name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.position(name).map(|idx| &self.values[idx])
    }

    /// Position of a field name, if present
    pub fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the record has no fields
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(name, value)` pairs in field order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Serializes as a map in field order.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
