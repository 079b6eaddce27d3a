//! Column type inference over generic records

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use tl_core::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Column type chosen for a loaded table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InferredType {
    BigInt,
    Double,
    Date,
    Time,
    Timestamp,
    Varchar,
}

impl InferredType {
    /// DuckDB type name used in `CREATE TABLE`
    pub fn sql_name(self) -> &'static str {
        match self {
            InferredType::BigInt => "BIGINT",
            InferredType::Double => "DOUBLE",
            InferredType::Date => "DATE",
            InferredType::Time => "TIME",
            InferredType::Timestamp => "TIMESTAMP",
            InferredType::Varchar => "VARCHAR",
        }
    }

    /// Convert a value into this column's representation.
    ///
    /// Returns `None` when the value cannot be stored in the column.
    pub fn convert(self, value: &Value) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }
        match self {
            InferredType::BigInt => value
                .as_i64()
                .or_else(|| value.as_str().and_then(parse_i64))
                .map(Value::BigInt),
            InferredType::Double => value
                .as_f64()
                .or_else(|| value.as_str().and_then(parse_f64))
                .map(Value::Double),
            InferredType::Date => match value {
                Value::Date(d) => Some(Value::Date(*d)),
                Value::Text(s) => parse_date(s).map(Value::Date),
                _ => None,
            },
            InferredType::Time => match value {
                Value::Time(t) => Some(Value::Time(*t)),
                _ => None,
            },
            InferredType::Timestamp => match value {
                Value::Timestamp(ts) => Some(Value::Timestamp(*ts)),
                Value::Text(s) => parse_timestamp(s).map(Value::Timestamp),
                _ => None,
            },
            InferredType::Varchar => Some(match value {
                Value::Text(s) => Value::Text(s.clone()),
                other => Value::Text(other.to_string()),
            }),
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// Running evidence about one column's values.
///
/// Each flag stays set while every non-null value seen so far fits that
/// type. Text is parsed; already-typed values only fit their own family
/// (an integer also fits DOUBLE).
#[derive(Debug, Clone)]
pub struct ColumnStats {
    non_null: u64,
    nulls: u64,
    max_width: usize,
    fits_int: bool,
    fits_float: bool,
    fits_date: bool,
    fits_time: bool,
    fits_timestamp: bool,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self {
            non_null: 0,
            nulls: 0,
            max_width: 0,
            fits_int: true,
            fits_float: true,
            fits_date: true,
            fits_time: true,
            fits_timestamp: true,
        }
    }
}

impl ColumnStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one value into the statistics
    pub fn observe(&mut self, value: &Value) {
        let (int, float, date, time, timestamp) = match value {
            Value::Null => {
                self.nulls += 1;
                return;
            }
            Value::BigInt(_) | Value::Integer(_) | Value::SmallInt(_) => {
                (true, true, false, false, false)
            }
            Value::Double(_) | Value::Float(_) => (false, true, false, false, false),
            Value::Date(_) => (false, false, true, false, false),
            Value::Time(_) => (false, false, false, true, false),
            Value::Timestamp(_) => (false, false, false, false, true),
            Value::Text(s) => (
                self.fits_int && parse_i64(s).is_some(),
                self.fits_float && parse_f64(s).is_some(),
                self.fits_date && parse_date(s).is_some(),
                false,
                self.fits_timestamp && parse_timestamp(s).is_some(),
            ),
        };
        self.non_null += 1;
        self.fits_int &= int;
        self.fits_float &= float;
        self.fits_date &= date;
        self.fits_time &= time;
        self.fits_timestamp &= timestamp;

        let width = match value {
            Value::Text(s) => s.chars().count(),
            other => other.to_string().chars().count(),
        };
        self.max_width = self.max_width.max(width);
    }

    /// Pick the narrowest type every observed value fits.
    ///
    /// A column with no non-null values is VARCHAR.
    pub fn resolve(&self) -> InferredType {
        if self.non_null == 0 {
            InferredType::Varchar
        } else if self.fits_int {
            InferredType::BigInt
        } else if self.fits_float {
            InferredType::Double
        } else if self.fits_date {
            InferredType::Date
        } else if self.fits_timestamp {
            InferredType::Timestamp
        } else if self.fits_time {
            InferredType::Time
        } else {
            InferredType::Varchar
        }
    }

    /// Count of non-null values seen
    pub fn non_null(&self) -> u64 {
        self.non_null
    }

    /// Count of null values seen
    pub fn nulls(&self) -> u64 {
        self.nulls
    }

    /// Widest value seen, in characters
    pub fn max_width(&self) -> usize {
        self.max_width
    }
}

fn parse_i64(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

fn parse_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
#[path = "infer_test.rs"]
mod tests;
