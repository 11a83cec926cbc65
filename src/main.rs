//! Bulk-insert loader binary
//!
//! Reads a delimited text file and loads it into a MySQL table using
//! grouped INSERT statements.

use bulk_insert::{
    BatchFormatter, BulkInsertConfig, MySqlExecutor, NullExecutor, Result, RowPump, SqlExecutor,
};
use tokio::fs::File;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging first
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,bulk_insert=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .ok(); // Ignore error if already initialized

    tracing::info!("Starting bulk-insert loader");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration from TOML file (path from BULK_INSERT_CONFIG_PATH,
    // URL/credentials overridable via environment)
    let config = BulkInsertConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    // Validate configuration before any row is processed
    config.validate()?;

    tracing::info!("Configuration loaded and validated successfully");
    tracing::info!("Source: {} (delimiter '{}')", config.source.path, config.source.delimiter);
    tracing::info!("Table: {}", config.load.table_name);
    tracing::info!("Columns: {}", config.load.columns.join(", "));
    tracing::info!("Flush threshold: {} rows", config.load.threshold);

    if config.load.dry_run {
        tracing::info!("Dry run: SQL will be printed, not executed");
        let (rows, batches, _) = run_load(&config, NullExecutor).await?;
        tracing::info!("Dry run complete: {} rows in {} batches previewed", rows, batches);
    } else {
        let executor = MySqlExecutor::connect(&config.database).await?;
        let (rows, batches, executor) = run_load(&config, executor).await?;
        executor.disconnect().await?;
        tracing::info!("Load complete: {} rows in {} batches", rows, batches);
    }

    Ok(())
}

/// Drive the source file through the formatter, then finalize explicitly so
/// a trailing partial batch is flushed. Returns rows read, batches flushed,
/// and the executor (so the caller can close its connection).
async fn run_load<E: SqlExecutor>(
    config: &BulkInsertConfig,
    executor: E,
) -> Result<(u64, u64, E)> {
    let file = File::open(&config.source.path).await?;

    let mut formatter = BatchFormatter::new(&config.load, executor)?;
    let mut pump = RowPump::new(file, &config.source.delimiter)?;
    pump.attach(&mut formatter);

    let rows = pump.run().await?;
    formatter.finalize().await?;

    Ok((rows, formatter.batches_flushed(), formatter.into_executor()))
}
