//! Configuration module for the bulk-insert loader
//!
//! This module handles all configuration aspects including:
//! - Input source settings (file path, field delimiter)
//! - Load settings (target table, suffix-tagged columns, flush threshold)
//! - Database connection settings with environment variable overrides

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

/// Complete configuration for a bulk-load run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkInsertConfig {
    /// Input source configuration
    pub source: SourceConfig,

    /// Load/batching configuration
    pub load: LoadConfig,

    /// Database connection configuration (unused in dry-run mode)
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Input source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the delimited text file to load
    pub path: String,

    /// Field delimiter, interpreted as a regular expression pattern
    /// (e.g. ",", "\t", "[,;]")
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

/// Load/batching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Target table name
    pub table_name: String,

    /// Ordered column names, positionally aligned with input fields.
    /// A `_s` suffix quotes the field as a string, `_i` coerces it to an
    /// integer, any other name passes the field through unmodified.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Number of pending rows that triggers a flush
    #[serde(default = "default_threshold")]
    pub threshold: usize,

    /// Print the composed SQL instead of executing it
    #[serde(default)]
    pub dry_run: bool,
}

/// Database connection configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// MySQL connection URL (e.g. "mysql://user@localhost:3306/mydb")
    #[serde(default)]
    pub url: String,

    /// Optional username override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Optional password override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

// Default value functions
fn default_delimiter() -> String {
    ",".to_string()
}

fn default_threshold() -> usize {
    100
}

impl BulkInsertConfig {
    /// Load configuration from TOML file
    ///
    /// The config file path must be specified via BULK_INSERT_CONFIG_PATH
    /// environment variable. Environment variables can override the database
    /// URL and credentials.
    pub fn load() -> Result<Self> {
        let config_path = env::var("BULK_INSERT_CONFIG_PATH").map_err(|_| {
            Error::config(
                "BULK_INSERT_CONFIG_PATH environment variable must be set to the path of the TOML configuration file",
            )
        })?;

        Self::from_file(&config_path)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file '{}': {}", path, e))
        })?;

        let mut config: Self = toml::from_str(&contents)
            .map_err(|e| Error::config(format!("Failed to parse TOML config: {}", e)))?;

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides for the connection URL and
    /// credentials. Secrets should not live in config files.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("BULK_INSERT_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(username) = env::var("BULK_INSERT_DB_USERNAME") {
            self.database.username = Some(username);
        }
        if let Ok(password) = env::var("BULK_INSERT_DB_PASSWORD") {
            self.database.password = Some(password);
        }
    }

    /// Validate configuration
    ///
    /// All three load settings (threshold, table_name, columns) must be set
    /// before the first row is processed; a missing one aborts the run.
    pub fn validate(&self) -> Result<()> {
        if self.source.path.is_empty() {
            return Err(Error::config("source path cannot be empty"));
        }
        if self.source.delimiter.is_empty() {
            return Err(Error::config("delimiter cannot be empty"));
        }

        if self.load.threshold == 0 {
            return Err(Error::config(
                "set threshold, table_name and columns: threshold must be greater than zero",
            ));
        }
        if self.load.table_name.is_empty() {
            return Err(Error::config(
                "set threshold, table_name and columns: table_name cannot be empty",
            ));
        }
        if self.load.columns.is_empty() {
            return Err(Error::config(
                "set threshold, table_name and columns: columns cannot be empty",
            ));
        }

        // Dry runs never touch the database, so the URL may be absent
        if !self.load.dry_run && self.database.url.is_empty() {
            return Err(Error::config("database URL cannot be empty"));
        }

        Ok(())
    }
}
