//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use tl_core::Config;
use tl_db::{Database, DuckDbBackend};

use crate::cli::GlobalArgs;

/// Exit code for database failures
pub(crate) const DATABASE_FAILURE: i32 = 4;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main exits with the code without printing
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load the config named by `--config`, or `tableload.yml` from the current
/// directory when present.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path))
            .with_context(|| format!("Failed to load config {}", path))?,
        None => Config::load_from_dir(Path::new(".")).context("Failed to load config")?,
    };
    if global.verbose {
        eprintln!(
            "[verbose] Config: database {}, separator {:?}, batch size {}",
            config.database.path, config.load.delimiter, config.load.batch_size
        );
    }
    Ok(config)
}

/// Open the database at `--database`, falling back to the config path
pub(crate) fn connect(
    override_path: Option<&str>,
    config: &Config,
    global: &GlobalArgs,
) -> Result<DuckDbBackend> {
    let path = override_path.unwrap_or(&config.database.path);
    if global.verbose {
        eprintln!("[verbose] Connecting to {}", path);
    }
    let db = DuckDbBackend::new(path).context("Failed to connect to database")?;
    log::debug!("Opened {} database at {}", db.db_type(), path);
    Ok(db)
}
