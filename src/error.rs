//! Error types for the bulk-insert loader.

use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while configuring or running a bulk load.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration. Fatal before any row is processed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The loader API was used incorrectly (e.g. running the row pump
    /// without a registered handler).
    #[error("usage error: {0}")]
    Usage(String),

    /// The configured delimiter is not a valid pattern.
    #[error("invalid delimiter pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Reading the input source failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Executing a composed INSERT statement failed. Propagated to the
    /// caller as-is; the loader performs no retry or rollback.
    #[error("sql execution failed: {0}")]
    Execution(#[from] mysql_async::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Error::Usage(msg.into())
    }
}
