//! Batch formatting module for the bulk-insert loader
//!
//! Accumulates formatted row-tuples and flushes them as one grouped INSERT
//! statement whenever the pending count reaches the configured threshold.
//! Each field is coerced by the type hint encoded in its column name:
//! `_s` quotes the value, `_i` coerces it to an integer (lossy, non-numeric
//! input degrades to zero), anything else passes through unmodified.
//!
//! Flushing is eager and synchronous: a threshold flush completes before
//! the next row is accepted. End-of-input requires an explicit
//! [`finalize`](BatchFormatter::finalize) call, otherwise a trailing
//! partial batch would be lost.

use crate::config::LoadConfig;
use crate::error::{Error, Result};
use crate::executor::SqlExecutor;
use crate::parser::RowHandler;
use async_trait::async_trait;
use tracing::{debug, info};

/// Per-column coercion rule, encoded as a two-character column-name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    /// `_s`: wrap the field in double quotes
    Str,
    /// `_i`: coerce the field to an integer, zero on non-numeric input
    Int,
    /// No recognized suffix: pass the field through unmodified
    Raw,
}

/// One column of the spec: display name plus coercion rule.
#[derive(Debug, Clone)]
pub struct Column {
    display: String,
    hint: TypeHint,
}

impl Column {
    /// Parse a suffix-tagged column name.
    ///
    /// Any trailing `_` plus word character is stripped from the display
    /// name, whether or not it is a recognized hint; only `_s` and `_i`
    /// affect coercion.
    pub fn parse(tagged: &str) -> Self {
        let hint = if tagged.ends_with("_s") {
            TypeHint::Str
        } else if tagged.ends_with("_i") {
            TypeHint::Int
        } else {
            TypeHint::Raw
        };

        Self {
            display: strip_suffix_tag(tagged).to_string(),
            hint,
        }
    }

    /// Column name as it appears in the generated SQL column list.
    pub fn display_name(&self) -> &str {
        &self.display
    }

    /// Coercion rule for fields in this column's position.
    pub fn hint(&self) -> TypeHint {
        self.hint
    }
}

/// Strip a trailing `_<word char>` tag from a column name.
fn strip_suffix_tag(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() >= 2
        && bytes[bytes.len() - 2] == b'_'
        && (bytes[bytes.len() - 1].is_ascii_alphanumeric() || bytes[bytes.len() - 1] == b'_')
    {
        &name[..name.len() - 2]
    } else {
        name
    }
}

/// Lossy integer coercion: optional leading whitespace and sign, then the
/// leading digit run. Anything else coerces to zero, silently.
fn coerce_int(field: &str) -> i64 {
    let s = field.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    let digits = &rest[..end];
    if digits.is_empty() {
        return 0;
    }

    match digits.parse::<i64>() {
        Ok(n) => {
            if negative {
                -n
            } else {
                n
            }
        }
        // Digit run longer than i64: saturate
        Err(_) => {
            if negative {
                i64::MIN
            } else {
                i64::MAX
            }
        }
    }
}

/// Accumulates formatted row-tuples and flushes them in grouped INSERTs.
///
/// Owns its configuration and mutable batch buffer, so sequential load
/// sessions cannot interfere with each other. In dry-run mode a flush
/// prints the composed SQL to stdout instead of executing it, and the
/// executor is never invoked.
pub struct BatchFormatter<E> {
    table_name: String,
    columns: Vec<Column>,
    threshold: usize,
    dry_run: bool,
    insert_prefix: Option<String>,
    pending: Vec<String>,
    flushes: u64,
    executor: E,
}

impl<E: SqlExecutor> BatchFormatter<E> {
    /// Create a formatter from the load configuration.
    ///
    /// Threshold, table name and columns must all be set; a missing one is
    /// a fatal configuration error raised before any row is processed.
    pub fn new(load: &LoadConfig, executor: E) -> Result<Self> {
        if load.threshold == 0 {
            return Err(Error::config(
                "set threshold, table_name and columns: threshold must be greater than zero",
            ));
        }
        if load.table_name.is_empty() {
            return Err(Error::config(
                "set threshold, table_name and columns: table_name cannot be empty",
            ));
        }
        if load.columns.is_empty() {
            return Err(Error::config(
                "set threshold, table_name and columns: columns cannot be empty",
            ));
        }

        Ok(Self {
            table_name: load.table_name.clone(),
            columns: load.columns.iter().map(|c| Column::parse(c)).collect(),
            threshold: load.threshold,
            dry_run: load.dry_run,
            insert_prefix: None,
            pending: Vec::new(),
            flushes: 0,
            executor,
        })
    }

    /// Format one row and append it to the pending batch, flushing if the
    /// threshold is reached.
    ///
    /// Fields are matched to columns by position. A field beyond the column
    /// spec passes through unhinted; a missing field is simply absent from
    /// the tuple.
    pub async fn format_row(&mut self, row: &[String]) -> Result<()> {
        if self.insert_prefix.is_none() {
            let prefix = self.build_prefix();
            debug!("Cached INSERT prefix: {}", prefix);
            self.insert_prefix = Some(prefix);
        }

        let tuple = self.format_tuple(row);
        self.pending.push(tuple);

        if self.pending.len() >= self.threshold {
            self.flush().await?;
        }

        Ok(())
    }

    /// Flush any remaining partial batch. Mandatory at end-of-input; a
    /// no-op when nothing is pending.
    pub async fn finalize(&mut self) -> Result<()> {
        self.flush().await
    }

    /// Number of rows currently buffered.
    pub fn pending_rows(&self) -> usize {
        self.pending.len()
    }

    /// Number of batches flushed so far.
    pub fn batches_flushed(&self) -> u64 {
        self.flushes
    }

    /// Give back the executor, e.g. to close its connection.
    pub fn into_executor(self) -> E {
        self.executor
    }

    fn build_prefix(&self) -> String {
        let column_list = self
            .columns
            .iter()
            .map(Column::display_name)
            .collect::<Vec<_>>()
            .join(", ");

        format!("INSERT INTO {} ({}) VALUES", self.table_name, column_list)
    }

    fn format_tuple(&self, row: &[String]) -> String {
        let fields: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let hint = self
                    .columns
                    .get(idx)
                    .map(Column::hint)
                    .unwrap_or(TypeHint::Raw);

                match hint {
                    // No escaping of embedded quotes, by contract
                    TypeHint::Str => format!("\"{}\"", field),
                    TypeHint::Int => coerce_int(field).to_string(),
                    TypeHint::Raw => field.clone(),
                }
            })
            .collect();

        format!("({})", fields.join(", "))
    }

    /// Compose and emit the pending batch as one INSERT statement.
    ///
    /// Pending rows are cleared only after the executor returns success, so
    /// a failed flush propagates with the rows still buffered.
    async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        // The prefix is cached on the first formatted row, so a non-empty
        // pending buffer implies it is set.
        let sql = match &self.insert_prefix {
            Some(prefix) => format!("{} {}", prefix, self.pending.join(", ")),
            None => return Ok(()),
        };

        if self.dry_run {
            println!("{}", sql);
        } else {
            info!("Insert {} rows...", self.pending.len());
            self.executor.execute(&sql).await?;
        }

        self.pending.clear();
        self.flushes += 1;
        Ok(())
    }
}

#[async_trait]
impl<E: SqlExecutor> RowHandler for BatchFormatter<E> {
    async fn handle_row(&mut self, row: Vec<String>) -> Result<()> {
        self.format_row(&row).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadConfig;

    /// Records every executed statement.
    #[derive(Debug, Default)]
    struct RecordingExecutor {
        executed: Vec<String>,
    }

    #[async_trait]
    impl SqlExecutor for RecordingExecutor {
        async fn execute(&mut self, sql: &str) -> Result<()> {
            self.executed.push(sql.to_string());
            Ok(())
        }
    }

    fn load_config(threshold: usize, dry_run: bool) -> LoadConfig {
        LoadConfig {
            table_name: "t".to_string(),
            columns: vec!["name_s".to_string(), "age_i".to_string()],
            threshold,
            dry_run,
        }
    }

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_column_parse() {
        let col = Column::parse("name_s");
        assert_eq!(col.display_name(), "name");
        assert_eq!(col.hint(), TypeHint::Str);

        let col = Column::parse("age_i");
        assert_eq!(col.display_name(), "age");
        assert_eq!(col.hint(), TypeHint::Int);

        let col = Column::parse("city");
        assert_eq!(col.display_name(), "city");
        assert_eq!(col.hint(), TypeHint::Raw);

        // Unrecognized tags still strip from the display name but do not
        // affect coercion
        let col = Column::parse("score_x");
        assert_eq!(col.display_name(), "score");
        assert_eq!(col.hint(), TypeHint::Raw);

        // An interior underscore is not a tag
        let col = Column::parse("foo_bar");
        assert_eq!(col.display_name(), "foo_bar");
        assert_eq!(col.hint(), TypeHint::Raw);
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(coerce_int("42"), 42);
        assert_eq!(coerce_int("x"), 0);
        assert_eq!(coerce_int(""), 0);
        assert_eq!(coerce_int("-7"), -7);
        assert_eq!(coerce_int("+9"), 9);
        assert_eq!(coerce_int(" 12"), 12);
        assert_eq!(coerce_int("42abc"), 42);
        assert_eq!(coerce_int("-x"), 0);
    }

    #[test]
    fn test_new_rejects_missing_settings() {
        let executor = RecordingExecutor::default();
        let mut load = load_config(0, false);
        let err = BatchFormatter::new(&load, executor).err().unwrap();
        assert!(matches!(err, Error::Config(_)));

        load.threshold = 100;
        load.table_name.clear();
        let executor = RecordingExecutor::default();
        assert!(BatchFormatter::new(&load, executor).is_err());

        load.table_name = "t".to_string();
        load.columns.clear();
        let executor = RecordingExecutor::default();
        assert!(BatchFormatter::new(&load, executor).is_err());
    }

    #[tokio::test]
    async fn test_prefix_strips_column_suffixes() {
        let load = LoadConfig {
            table_name: "people".to_string(),
            columns: vec![
                "name_s".to_string(),
                "age_i".to_string(),
                "city".to_string(),
            ],
            threshold: 1,
            dry_run: false,
        };
        let mut formatter = BatchFormatter::new(&load, RecordingExecutor::default()).unwrap();

        formatter
            .format_row(&row(&["Alice", "30", "Berlin"]))
            .await
            .unwrap();

        let executor = formatter.into_executor();
        assert_eq!(
            executor.executed,
            vec!["INSERT INTO people (name, age, city) VALUES (\"Alice\", 30, Berlin)"]
        );
    }

    #[tokio::test]
    async fn test_single_flush_under_threshold() {
        let mut formatter =
            BatchFormatter::new(&load_config(5, false), RecordingExecutor::default()).unwrap();

        for _ in 0..3 {
            formatter.format_row(&row(&["Alice", "30"])).await.unwrap();
        }
        assert_eq!(formatter.pending_rows(), 3);
        assert_eq!(formatter.batches_flushed(), 0);

        formatter.finalize().await.unwrap();
        assert_eq!(formatter.pending_rows(), 0);
        assert_eq!(formatter.batches_flushed(), 1);

        let executor = formatter.into_executor();
        assert_eq!(executor.executed.len(), 1);
        assert_eq!(
            executor.executed[0],
            "INSERT INTO t (name, age) VALUES (\"Alice\", 30), (\"Alice\", 30), (\"Alice\", 30)"
        );
    }

    #[tokio::test]
    async fn test_flush_at_threshold_and_remainder() {
        let mut formatter =
            BatchFormatter::new(&load_config(2, false), RecordingExecutor::default()).unwrap();

        for _ in 0..5 {
            formatter.format_row(&row(&["Bob", "1"])).await.unwrap();
            // Pending never exceeds the threshold at rest
            assert!(formatter.pending_rows() < 2);
        }
        assert_eq!(formatter.batches_flushed(), 2);
        assert_eq!(formatter.pending_rows(), 1);

        formatter.finalize().await.unwrap();
        assert_eq!(formatter.batches_flushed(), 3);

        let executor = formatter.into_executor();
        assert_eq!(executor.executed.len(), 3);
    }

    #[tokio::test]
    async fn test_no_trailing_flush_on_zero_remainder() {
        let mut formatter =
            BatchFormatter::new(&load_config(2, false), RecordingExecutor::default()).unwrap();

        for _ in 0..4 {
            formatter.format_row(&row(&["Bob", "1"])).await.unwrap();
        }
        assert_eq!(formatter.batches_flushed(), 2);

        formatter.finalize().await.unwrap();
        assert_eq!(formatter.batches_flushed(), 2);
        assert_eq!(formatter.into_executor().executed.len(), 2);
    }

    #[tokio::test]
    async fn test_threshold_scenario_exact_sql() {
        let mut formatter =
            BatchFormatter::new(&load_config(2, false), RecordingExecutor::default()).unwrap();

        formatter.format_row(&row(&["Alice", "30"])).await.unwrap();
        formatter.format_row(&row(&["Bob", "x"])).await.unwrap();
        formatter.format_row(&row(&["Carol", "25"])).await.unwrap();
        formatter.finalize().await.unwrap();

        let executor = formatter.into_executor();
        assert_eq!(
            executor.executed,
            vec![
                "INSERT INTO t (name, age) VALUES (\"Alice\", 30), (\"Bob\", 0)",
                "INSERT INTO t (name, age) VALUES (\"Carol\", 25)",
            ]
        );
    }

    #[tokio::test]
    async fn test_identical_rows_format_identically() {
        let mut formatter =
            BatchFormatter::new(&load_config(1, false), RecordingExecutor::default()).unwrap();

        formatter.format_row(&row(&["Alice", "30"])).await.unwrap();
        formatter.format_row(&row(&["Alice", "30"])).await.unwrap();

        let executor = formatter.into_executor();
        assert_eq!(executor.executed.len(), 2);
        assert_eq!(executor.executed[0], executor.executed[1]);
    }

    #[tokio::test]
    async fn test_dry_run_never_invokes_executor() {
        let mut formatter =
            BatchFormatter::new(&load_config(2, true), RecordingExecutor::default()).unwrap();

        for _ in 0..5 {
            formatter.format_row(&row(&["Alice", "30"])).await.unwrap();
        }
        formatter.finalize().await.unwrap();

        assert!(formatter.into_executor().executed.is_empty());
    }

    #[tokio::test]
    async fn test_finalize_with_no_rows_is_noop() {
        let mut formatter =
            BatchFormatter::new(&load_config(2, false), RecordingExecutor::default()).unwrap();

        formatter.finalize().await.unwrap();
        assert_eq!(formatter.batches_flushed(), 0);
        assert!(formatter.into_executor().executed.is_empty());
    }

    #[tokio::test]
    async fn test_pump_into_formatter_pipeline() {
        use crate::parser::RowPump;

        let input: &[u8] = b"Alice,30\nBob,x\nCarol,25\n";
        let mut formatter =
            BatchFormatter::new(&load_config(2, false), RecordingExecutor::default()).unwrap();
        let mut pump = RowPump::new(input, ",").unwrap();
        pump.attach(&mut formatter);

        let rows = pump.run().await.unwrap();
        assert_eq!(rows, 3);

        // One threshold flush happened mid-stream; the remainder waits for
        // an explicit finalize
        assert_eq!(formatter.batches_flushed(), 1);
        assert_eq!(formatter.pending_rows(), 1);

        formatter.finalize().await.unwrap();
        let executor = formatter.into_executor();
        assert_eq!(
            executor.executed,
            vec![
                "INSERT INTO t (name, age) VALUES (\"Alice\", 30), (\"Bob\", 0)",
                "INSERT INTO t (name, age) VALUES (\"Carol\", 25)",
            ]
        );
    }

    #[tokio::test]
    async fn test_extra_fields_pass_through_unhinted() {
        let mut formatter =
            BatchFormatter::new(&load_config(1, false), RecordingExecutor::default()).unwrap();

        formatter
            .format_row(&row(&["Alice", "30", "extra"]))
            .await
            .unwrap();

        let executor = formatter.into_executor();
        assert_eq!(
            executor.executed,
            vec!["INSERT INTO t (name, age) VALUES (\"Alice\", 30, extra)"]
        );
    }

    #[tokio::test]
    async fn test_embedded_quotes_are_not_escaped() {
        let mut formatter =
            BatchFormatter::new(&load_config(1, false), RecordingExecutor::default()).unwrap();

        formatter
            .format_row(&row(&["Al\"ice", "30"]))
            .await
            .unwrap();

        let executor = formatter.into_executor();
        assert_eq!(
            executor.executed,
            vec!["INSERT INTO t (name, age) VALUES (\"Al\"ice\", 30)"]
        );
    }
}
