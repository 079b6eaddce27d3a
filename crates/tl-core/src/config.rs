//! Configuration types and parsing for tableload.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File names probed by [`Config::load_from_dir`], in order.
const CONFIG_FILE_NAMES: &[&str] = &["tableload.yml", "tableload.yaml"];

const DEFAULT_DB_PATH: &str = ":memory:";

/// Top-level configuration from tableload.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Delimited-file loading options
    #[serde(default)]
    pub load: LoadConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file or `:memory:`)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Options controlling how delimited files are read and inserted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    /// Field separator (default: comma)
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Rows per INSERT transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Field contents that are read as SQL NULL
    #[serde(default = "default_null_values")]
    pub null_values: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            batch_size: default_batch_size(),
            null_values: default_null_values(),
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_batch_size() -> usize {
    1000
}

fn default_null_values() -> Vec<String> {
    vec![String::new(), "NA".to_string(), "NULL".to_string()]
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, falling back to defaults when
    /// neither tableload.yml nor tableload.yaml is present
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Self::load(&candidate);
            }
        }
        log::debug!("No config file in {}, using defaults", dir.display());
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.load.batch_size == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "load.batch_size must be at least 1".to_string(),
            });
        }

        if !self.load.delimiter.is_ascii() {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "load.delimiter must be a single ASCII character, found '{}'",
                    self.load.delimiter
                ),
            });
        }

        if self.database.path.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
