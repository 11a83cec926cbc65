//! SQL execution module for the bulk-insert loader
//!
//! The batch formatter only needs a capability to execute a composed SQL
//! string against an established connection. [`SqlExecutor`] is that seam;
//! [`MySqlExecutor`] is the live implementation. Driver errors propagate
//! unchanged — no retry, no rollback.

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder};
use tracing::info;

/// Capability to execute a raw SQL statement.
#[async_trait]
pub trait SqlExecutor: Send {
    /// Execute one SQL statement to completion.
    async fn execute(&mut self, sql: &str) -> Result<()>;
}

/// Executes statements against a MySQL connection.
#[derive(Debug)]
pub struct MySqlExecutor {
    conn: Conn,
}

impl MySqlExecutor {
    /// Establish a connection from the database configuration.
    ///
    /// Credentials supplied via config or environment overrides take
    /// precedence over those embedded in the URL.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let opts = Opts::from_url(&config.url).map_err(|e| {
            Error::config(format!("invalid database URL '{}': {}", config.url, e))
        })?;

        let mut builder = OptsBuilder::from_opts(opts);
        if let Some(username) = &config.username {
            builder = builder.user(Some(username.as_str()));
        }
        if let Some(password) = &config.password {
            builder = builder.pass(Some(password.as_str()));
        }

        let opts: Opts = builder.into();
        info!("Connecting to MySQL at {}", opts.ip_or_hostname());

        let conn = Conn::new(opts).await?;
        Ok(Self { conn })
    }

    /// Cleanly close the connection.
    pub async fn disconnect(self) -> Result<()> {
        self.conn.disconnect().await?;
        Ok(())
    }
}

#[async_trait]
impl SqlExecutor for MySqlExecutor {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn.query_drop(sql).await?;
        Ok(())
    }
}

/// Inert executor for dry runs, where no connection is established and the
/// formatter never reaches the execution path.
#[derive(Debug, Default)]
pub struct NullExecutor;

#[async_trait]
impl SqlExecutor for NullExecutor {
    async fn execute(&mut self, _sql: &str) -> Result<()> {
        Ok(())
    }
}
