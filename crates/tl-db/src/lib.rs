//! tl-db - Database layer for tableload
//!
//! The heart of this crate is [`TypeMappedCursor`], which adapts a live,
//! forward-only result cursor into a lazy sequence of generic
//! [`Record`](tl_core::Record)s, decoding every column according to its
//! declared SQL type. [`QuerySource`] binds a reusable statement handle to a
//! query string and hands out a fresh cursor per iteration.
//!
//! The [`Database`] trait and [`DuckDbBackend`] cover the write side used by
//! the table loader.

pub mod cursor;
pub mod duckdb;
pub mod error;
pub mod query;
pub mod traits;
pub mod type_mapped;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use cursor::{ColumnDescriptor, ResultCursor, SqlType, StatementHandle};
pub use duckdb::{DuckDbBackend, DuckDbCursor, DuckDbStatement};
pub use error::{DbError, DbResult};
pub use query::{build_query, build_source, QuerySource};
pub use traits::Database;
pub use type_mapped::{TypeMappedCursor, DB_ORIGIN};
