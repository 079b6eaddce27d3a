//! Dump command implementation

use anyhow::Result;
use std::io::Write;
use tl_core::Record;
use tl_db::{build_source, DbError, DbResult};

use crate::cli::{DumpArgs, DumpFormat, GlobalArgs};
use crate::commands::common::{self, ExitCode, DATABASE_FAILURE};

/// Execute the dump command
pub async fn execute(args: &DumpArgs, global: &GlobalArgs) -> Result<()> {
    let config = common::load_config(global)?;
    let db = common::connect(args.database.as_deref(), &config, global)?;

    let terms: Vec<&str> = if args.columns.is_empty() {
        vec!["*"]
    } else {
        args.columns.iter().map(|c| c.trim()).collect()
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = db.with_statement(|stmt| {
        let mut source = build_source(stmt, &args.table, &terms);
        if global.verbose {
            eprintln!("[verbose] Query: {}", source);
        }

        let mut rows: u64 = 0;
        for record in source.produce_sequence()? {
            let record = record?;
            if rows == 0 && args.format == DumpFormat::Tsv {
                writeln!(out, "{}", record.headers().join("\t")).map_err(write_failed)?;
            }
            write_record(&mut out, &record, args.format)?;
            rows += 1;
        }
        out.flush().map_err(write_failed)?;
        Ok(rows)
    });

    match result {
        Ok(rows) => {
            if global.verbose {
                eprintln!("[verbose] Wrote {} rows", rows);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: failed to dump {}: {}", args.table, e);
            Err(ExitCode(DATABASE_FAILURE).into())
        }
    }
}

fn write_record(out: &mut impl Write, record: &Record, format: DumpFormat) -> DbResult<()> {
    match format {
        DumpFormat::Tsv => {
            let fields: Vec<String> = record.values().iter().map(|v| v.to_string()).collect();
            writeln!(out, "{}", fields.join("\t")).map_err(write_failed)
        }
        DumpFormat::Json => {
            let line = serde_json::to_string(record)
                .map_err(|e| DbError::Internal(format!("failed to encode row: {}", e)))?;
            writeln!(out, "{}", line).map_err(write_failed)
        }
    }
}

fn write_failed(e: std::io::Error) -> DbError {
    DbError::Internal(format!("failed to write output: {}", e))
}
