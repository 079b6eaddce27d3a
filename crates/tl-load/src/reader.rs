//! Delimited-file source producing generic records

use crate::error::{LoadError, LoadResult};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tl_core::{normalize_headers, LoadConfig, Record, Value};

/// A delimited text file with a header line.
///
/// The source is re-readable: each call to [`records`](Self::records) opens
/// the file again, so the same source can be scanned for column types and
/// then loaded.
#[derive(Debug, Clone)]
pub struct DelimitedSource {
    path: PathBuf,
    delimiter: u8,
    null_values: Vec<String>,
}

impl DelimitedSource {
    /// Create a source with no null tokens
    pub fn new(path: impl Into<PathBuf>, delimiter: char) -> LoadResult<Self> {
        Ok(Self {
            path: path.into(),
            delimiter: delimiter_byte(delimiter)?,
            null_values: Vec::new(),
        })
    }

    /// Create a source using the separator and null tokens from config
    pub fn from_config(path: impl Into<PathBuf>, config: &LoadConfig) -> LoadResult<Self> {
        Ok(Self::new(path, config.delimiter)?.with_null_values(config.null_values.iter().cloned()))
    }

    /// Field contents that read as [`Value::Null`]
    pub fn with_null_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name used to tag records and in diagnostics
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    /// Open the file and read its header line
    pub fn records(&self) -> LoadResult<DelimitedRecords> {
        let source_name = self.name();
        let file = File::open(&self.path).map_err(|e| LoadError::Io {
            path: source_name.clone(),
            source: e,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let raw_headers = reader
            .headers()
            .map_err(|e| LoadError::Parse {
                source_name: source_name.clone(),
                source: e,
            })?
            .clone();
        if raw_headers.is_empty() {
            return Err(LoadError::MissingHeader { source_name });
        }

        let labels: Vec<&str> = raw_headers.iter().collect();
        let headers: Arc<[String]> = normalize_headers(&labels).into();
        log::debug!(
            "Opened {} with {} columns: {:?}",
            source_name,
            headers.len(),
            headers
        );

        Ok(DelimitedRecords {
            reader,
            source_name: source_name.into(),
            headers,
            null_values: self.null_values.clone(),
            row: csv::StringRecord::new(),
            done: false,
        })
    }
}

fn delimiter_byte(delimiter: char) -> LoadResult<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(LoadError::InvalidDelimiter(delimiter))
    }
}

/// Records of one pass over a [`DelimitedSource`].
///
/// Every value is [`Value::Text`] or [`Value::Null`]. Rows shorter than the
/// header are padded with nulls. The iterator ends after the first error.
pub struct DelimitedRecords {
    reader: csv::Reader<File>,
    source_name: Arc<str>,
    headers: Arc<[String]>,
    null_values: Vec<String>,
    row: csv::StringRecord,
    done: bool,
}

impl DelimitedRecords {
    /// Normalized header names
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn convert_row(&self) -> LoadResult<Record> {
        let expected = self.headers.len();
        if self.row.len() > expected {
            return Err(LoadError::RowWidth {
                source_name: self.source_name.to_string(),
                line: self.row.position().map_or(0, |p| p.line()),
                expected,
                found: self.row.len(),
            });
        }

        let mut values: Vec<Value> = self
            .row
            .iter()
            .map(|field| {
                if self.null_values.iter().any(|n| n == field) {
                    Value::Null
                } else {
                    Value::Text(field.to_string())
                }
            })
            .collect();
        values.resize(expected, Value::Null);

        Ok(Record::new(
            Arc::clone(&self.source_name),
            Arc::clone(&self.headers),
            values,
        )?)
    }
}

impl Iterator for DelimitedRecords {
    type Item = LoadResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = match self.reader.read_record(&mut self.row) {
            Ok(false) => {
                self.done = true;
                return None;
            }
            Ok(true) => self.convert_row(),
            Err(e) => Err(LoadError::Parse {
                source_name: self.source_name.to_string(),
                source: e,
            }),
        };
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

#[cfg(test)]
#[path = "reader_test.rs"]
mod tests;
