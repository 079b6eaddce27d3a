//! Query sources: a statement handle bound to a fixed query string

use crate::cursor::StatementHandle;
use crate::error::{DbError, DbResult};
use crate::type_mapped::TypeMappedCursor;
use std::fmt;

/// A re-runnable query.
///
/// Every call to [`produce_sequence`](Self::produce_sequence) executes the
/// query again and returns an independent [`TypeMappedCursor`].
///
/// # One sequence at a time
///
/// A statement handle supports a single open cursor. The returned sequence
/// mutably borrows the source, so a second sequence cannot be produced
/// while the first is still alive. Finish, [`close`](TypeMappedCursor::close)
/// or drop the first sequence before asking for another:
///
/// ```compile_fail
/// use tl_db::{build_source, DuckDbBackend, DbResult};
///
/// fn overlapping(db: &DuckDbBackend) -> DbResult<()> {
///     db.with_statement(|stmt| {
///         let mut source = build_source(stmt, "range(3)", ["range"]);
///         let first = source.produce_sequence()?;
///         let second = source.produce_sequence()?;
///         drop((first, second));
///         Ok(())
///     })
/// }
/// ```
pub struct QuerySource<S: StatementHandle> {
    statement: S,
    query: String,
}

impl<S: StatementHandle> QuerySource<S> {
    pub fn new(statement: S, query: impl Into<String>) -> Self {
        Self {
            statement,
            query: query.into(),
        }
    }

    /// The query string this source executes
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Execute the query and wrap its cursor.
    ///
    /// Execution failures are fatal and come back as
    /// [`DbError::ExecutionError`] naming the query.
    pub fn produce_sequence(&mut self) -> DbResult<TypeMappedCursor<S::Cursor<'_>>> {
        log::debug!("Executing query source: {}", self.query);
        let cursor = self
            .statement
            .execute_query(&self.query)
            .map_err(|e| match e {
                DbError::ExecutionError(msg) => {
                    DbError::ExecutionError(format!("{}: {}", msg, self.query))
                }
                other => other,
            })?;
        TypeMappedCursor::new(cursor)
    }

    /// Give back the statement handle
    pub fn into_statement(self) -> S {
        self.statement
    }
}

impl<S: StatementHandle> fmt::Display for QuerySource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

impl<S: StatementHandle> fmt::Debug for QuerySource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySource")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

/// Assemble `SELECT <terms> FROM <table>`.
///
/// Terms are comma-joined verbatim with no quoting or escaping. An empty
/// term list produces the incomplete `SELECT  FROM <table>`.
///
/// # Examples
/// ```
/// use tl_db::build_query;
/// assert_eq!(build_query("T", ["a", "b", "c"]), "SELECT a,b,c FROM T");
/// assert_eq!(build_query("T", Vec::<String>::new()), "SELECT  FROM T");
/// ```
pub fn build_query<I>(table: &str, terms: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut query = String::from("SELECT ");
    for (i, term) in terms.into_iter().enumerate() {
        if i > 0 {
            query.push(',');
        }
        query.push_str(term.as_ref());
    }
    query.push_str(" FROM ");
    query.push_str(table);
    query
}

/// Build a [`QuerySource`] selecting `terms` from `table` on `statement`.
pub fn build_source<S, I>(statement: S, table: &str, terms: I) -> QuerySource<S>
where
    S: StatementHandle,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    QuerySource::new(statement, build_query(table, terms))
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
