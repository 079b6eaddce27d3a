//! tl-load - Table loading for tableload
//!
//! Reads delimited files into generic records, infers a column type for
//! every field, then creates a table and bulk-inserts the records through
//! the [`Database`](tl_db::Database) trait. Records produced by a database
//! cursor load the same way as records read from a file.

pub mod error;
pub mod infer;
pub mod reader;
pub mod table;

pub use error::{LoadError, LoadResult};
pub use infer::{ColumnStats, InferredType};
pub use reader::{DelimitedRecords, DelimitedSource};
pub use table::{ColumnDef, TableControl};
