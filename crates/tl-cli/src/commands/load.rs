//! Load command implementation

use anyhow::{Context, Result};
use tl_db::Database;
use tl_load::{DelimitedSource, LoadError, LoadResult, TableControl};

use crate::cli::{GlobalArgs, LoadArgs};
use crate::commands::common::{self, ExitCode, DATABASE_FAILURE};

/// Execute the load command
pub async fn execute(args: &LoadArgs, global: &GlobalArgs) -> Result<()> {
    let mut config = common::load_config(global)?;
    if let Some(sep) = args.sep {
        config.load.delimiter = sep;
    }
    if let Some(batch_size) = args.batch_size {
        config.load.batch_size = batch_size;
    }
    config.validate().context("Invalid load options")?;

    let db = common::connect(args.database.as_deref(), &config, global)?;
    let source = DelimitedSource::from_config(&args.input, &config.load)?;
    let source_name = source.name();

    if global.verbose {
        eprintln!(
            "[verbose] Loading {} into {} (separator {:?})",
            source_name, args.table, config.load.delimiter
        );
    }

    let mut control = TableControl::new(&args.table).with_batch_size(config.load.batch_size);
    let scanned = control
        .scan_delimited(&source_name, source.records()?)
        .with_context(|| format!("Failed to scan {}", source_name))?;
    control.build_sql_statements()?;

    if global.verbose {
        eprintln!("[verbose] Scanned {} rows", scanned);
        for def in control.column_defs() {
            eprintln!(
                "[verbose]   {} {} (width {})",
                def.name, def.sql_type, def.max_width
            );
        }
    }

    match create_and_load(&control, &source, &db).await {
        Ok(inserted) => {
            println!("done, wrote {} rows", inserted);
            Ok(())
        }
        Err(LoadError::Db(e)) => {
            eprintln!("Error: failed to load {}: {}", args.table, e);
            Err(ExitCode(DATABASE_FAILURE).into())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", source_name)),
    }
}

async fn create_and_load(
    control: &TableControl,
    source: &DelimitedSource,
    db: &dyn Database,
) -> LoadResult<u64> {
    control.create_table(db).await?;
    control
        .load_data(&source.name(), source.records()?, db)
        .await
}
