//! tl-core - Core library for tableload
//!
//! This crate provides the types shared by every tableload component: the
//! generic [`Record`] that crosses crate boundaries, the [`Value`] kinds it
//! carries, the header normalizer, SQL identifier quoting, and configuration
//! parsing for `tableload.yml`.

pub mod config;
pub mod error;
pub mod header;
pub mod record;
pub mod sql_utils;
pub mod value;

pub use config::{Config, DatabaseConfig, LoadConfig};
pub use error::{CoreError, CoreResult};
pub use header::normalize_headers;
pub use record::Record;
pub use value::Value;
