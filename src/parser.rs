//! Line parsing module for the bulk-insert loader
//!
//! Turns a delimited text source into a lazy sequence of field arrays.
//! Each line is right-trimmed of its terminator, split on the configured
//! delimiter pattern, and handed to a registered [`RowHandler`] one row at
//! a time. Parsing is finite and non-restartable: running the pump consumes
//! it.

use crate::error::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::debug;

/// Receiver for parsed rows.
///
/// The row pump feeds every parsed field array to the handler, fully
/// serialized: the next line is not read until the handler returns.
#[async_trait]
pub trait RowHandler: Send {
    /// Process one row of input fields, positionally ordered.
    async fn handle_row(&mut self, row: Vec<String>) -> Result<()>;
}

/// Splits lines into fields on a delimiter pattern.
///
/// The delimiter is compiled as a regular expression, not matched as a
/// literal substring, so "[,;]" or "\t+" are valid delimiters.
#[derive(Debug, Clone)]
pub struct LineParser {
    pattern: Regex,
}

impl LineParser {
    /// Compile a delimiter pattern.
    pub fn new(delimiter: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(delimiter)?,
        })
    }

    /// Split one line (already trimmed of its terminator) into fields.
    pub fn split(&self, line: &str) -> Vec<String> {
        self.pattern.split(line).map(str::to_string).collect()
    }
}

/// Drives a text source line-by-line through a [`RowHandler`].
///
/// A handler must be registered with [`attach`](Self::attach) before
/// [`run`](Self::run); running without one is a usage error and processes
/// zero rows. The pump does not finalize its handler — callers invoke the
/// handler's own finalization after the pump completes.
pub struct RowPump<'h, R> {
    lines: Lines<BufReader<R>>,
    parser: LineParser,
    handler: Option<&'h mut dyn RowHandler>,
}

impl<'h, R> RowPump<'h, R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Create a pump over a text source with the given delimiter pattern.
    pub fn new(source: R, delimiter: &str) -> Result<Self> {
        Ok(Self {
            lines: BufReader::new(source).lines(),
            parser: LineParser::new(delimiter)?,
            handler: None,
        })
    }

    /// Register the handler that receives parsed rows.
    pub fn attach(&mut self, handler: &'h mut dyn RowHandler) {
        self.handler = Some(handler);
    }

    /// Consume the source, feeding each parsed row to the registered
    /// handler. Returns the number of rows processed.
    pub async fn run(mut self) -> Result<u64> {
        let handler = self
            .handler
            .take()
            .ok_or_else(|| Error::usage("no row handler registered"))?;

        let mut rows = 0u64;
        while let Some(line) = self.lines.next_line().await? {
            let row = self.parser.split(&line);
            debug!("Parsed row {} with {} fields", rows + 1, row.len());
            handler.handle_row(row).await?;
            rows += 1;
        }

        Ok(rows)
    }
}
