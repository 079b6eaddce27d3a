//! Table definition and bulk loading from generic records

use crate::error::{LoadError, LoadResult};
use crate::infer::{ColumnStats, InferredType};
use crate::reader::DelimitedRecords;
use tl_core::sql_utils::{quote_ident, quote_qualified};
use tl_core::{Record, Value};
use tl_db::Database;

const DEFAULT_BATCH_SIZE: usize = 1000;

static NULL: Value = Value::Null;

/// One column of the table being loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name, as the record header
    pub name: String,
    /// Inferred storage type
    pub sql_type: InferredType,
    /// Widest value seen while scanning, in characters
    pub max_width: usize,
}

/// Creates a table shaped like a record stream and loads the stream into it.
///
/// Usage is a fixed sequence: [`scan_for_defs`](Self::scan_for_defs),
/// [`build_sql_statements`](Self::build_sql_statements),
/// [`create_table`](Self::create_table), then
/// [`load_data`](Self::load_data) over a fresh pass of the same records.
#[derive(Debug, Clone)]
pub struct TableControl {
    table: String,
    batch_size: usize,
    defs: Vec<ColumnDef>,
    create_sql: Option<String>,
    insert_sql: Option<String>,
}

impl TableControl {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            defs: Vec::new(),
            create_sql: None,
            insert_sql: None,
        }
    }

    /// Rows per insert transaction (at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column_defs(&self) -> &[ColumnDef] {
        &self.defs
    }

    /// The `CREATE TABLE` statement, once built
    pub fn create_sql(&self) -> Option<&str> {
        self.create_sql.as_deref()
    }

    /// The parameterized `INSERT` statement, once built
    pub fn insert_sql(&self) -> Option<&str> {
        self.insert_sql.as_deref()
    }

    /// Scan every record and derive one column definition per field.
    ///
    /// Column names and order come from the first record. Later records are
    /// matched by name; fields they lack count as null. Returns the number of
    /// records scanned.
    pub fn scan_for_defs<I, E>(&mut self, source_name: &str, records: I) -> LoadResult<u64>
    where
        I: IntoIterator<Item = Result<Record, E>>,
        LoadError: From<E>,
    {
        self.scan(source_name, Vec::new(), records)
    }

    /// Scan a delimited file, taking column names from its header line.
    ///
    /// Unlike [`scan_for_defs`](Self::scan_for_defs), a file with a header but
    /// no data rows still yields definitions, all `VARCHAR`.
    pub fn scan_delimited(
        &mut self,
        source_name: &str,
        records: DelimitedRecords,
    ) -> LoadResult<u64> {
        let names = records.headers().to_vec();
        self.scan(source_name, names, records)
    }

    fn scan<I, E>(
        &mut self,
        source_name: &str,
        mut names: Vec<String>,
        records: I,
    ) -> LoadResult<u64>
    where
        I: IntoIterator<Item = Result<Record, E>>,
        LoadError: From<E>,
    {
        let mut stats: Vec<ColumnStats> = vec![ColumnStats::new(); names.len()];
        let mut rows: u64 = 0;

        for record in records {
            let record = record?;
            if rows == 0 && names.is_empty() {
                names = record.headers().to_vec();
                stats = vec![ColumnStats::new(); names.len()];
            }
            for (idx, (name, column)) in names.iter().zip(stats.iter_mut()).enumerate() {
                column.observe(field(&record, idx, name));
            }
            rows += 1;
        }

        self.defs = names
            .into_iter()
            .zip(stats)
            .map(|(name, column)| ColumnDef {
                sql_type: column.resolve(),
                max_width: column.max_width(),
                name,
            })
            .collect();
        self.create_sql = None;
        self.insert_sql = None;

        log::debug!(
            "Scanned {} rows from {}: {}",
            rows,
            source_name,
            self.defs
                .iter()
                .map(|d| format!("{} {}", d.name, d.sql_type))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(rows)
    }

    /// Build the `CREATE TABLE` and `INSERT` statements from the column
    /// definitions.
    pub fn build_sql_statements(&mut self) -> LoadResult<()> {
        if self.defs.is_empty() {
            return Err(LoadError::NoColumns {
                table: self.table.clone(),
            });
        }

        let table = quote_qualified(&self.table);
        let columns: Vec<String> = self.defs.iter().map(|d| quote_ident(&d.name)).collect();
        let column_defs: Vec<String> = self
            .defs
            .iter()
            .zip(&columns)
            .map(|(def, quoted)| format!("{} {}", quoted, def.sql_type.sql_name()))
            .collect();
        let placeholders = vec!["?"; columns.len()].join(", ");

        self.create_sql = Some(format!(
            "CREATE TABLE {} ({})",
            table,
            column_defs.join(", ")
        ));
        self.insert_sql = Some(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        ));
        Ok(())
    }

    /// Drop any existing table of the same name and create it afresh
    pub async fn create_table(&self, db: &dyn Database) -> LoadResult<()> {
        let create_sql = self.create_sql.as_deref().ok_or_else(|| self.not_prepared())?;
        db.drop_if_exists(&self.table).await?;
        db.execute_batch(create_sql).await?;
        log::debug!("Created table {} on {}", self.table, db.db_type());
        Ok(())
    }

    /// Insert every record, in transactions of `batch_size` rows.
    ///
    /// Each field is converted to its column's type first; a value that does
    /// not fit stops the load. Batches already committed stay committed.
    /// Returns the number of rows inserted.
    pub async fn load_data<I, E>(
        &self,
        source_name: &str,
        records: I,
        db: &dyn Database,
    ) -> LoadResult<u64>
    where
        I: IntoIterator<Item = Result<Record, E>>,
        LoadError: From<E>,
    {
        let insert_sql = self.insert_sql.as_deref().ok_or_else(|| self.not_prepared())?;
        let mut batch: Vec<Vec<Value>> = Vec::with_capacity(self.batch_size);
        let mut inserted: u64 = 0;

        for record in records {
            let record = record?;
            batch.push(self.convert_record(source_name, &record)?);
            if batch.len() >= self.batch_size {
                inserted += db.insert_rows(insert_sql, &batch).await? as u64;
                log::debug!("Inserted {} rows into {}", inserted, self.table);
                batch.clear();
            }
        }
        if !batch.is_empty() {
            inserted += db.insert_rows(insert_sql, &batch).await? as u64;
        }

        log::debug!(
            "Loaded {} rows from {} into {}",
            inserted,
            source_name,
            self.table
        );
        Ok(inserted)
    }

    fn convert_record(&self, source_name: &str, record: &Record) -> LoadResult<Vec<Value>> {
        self.defs
            .iter()
            .enumerate()
            .map(|(idx, def)| {
                let value = field(record, idx, &def.name);
                def.sql_type
                    .convert(value)
                    .ok_or_else(|| LoadError::Conversion {
                        source_name: source_name.to_string(),
                        column: def.name.clone(),
                        value: value.to_string(),
                        sql_type: def.sql_type.sql_name(),
                    })
            })
            .collect()
    }

    fn not_prepared(&self) -> LoadError {
        LoadError::NotPrepared {
            table: self.table.clone(),
        }
    }
}

/// Field `name`, expected at position `idx`; null when the record lacks it
fn field<'r>(record: &'r Record, idx: usize, name: &str) -> &'r Value {
    match record.headers().get(idx) {
        Some(header) if header == name => &record.values()[idx],
        _ => record.get(name).unwrap_or(&NULL),
    }
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
