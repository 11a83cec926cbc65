//! Bulk loader for delimited text files
//!
//! Batches delimited-text records into grouped SQL INSERT statements,
//! avoiding one-round-trip-per-row overhead when loading bulk data into
//! MySQL.
//!
//! # How it works
//!
//! A [`RowPump`](parser::RowPump) reads the input line-by-line, splits each
//! line on a configurable delimiter pattern, and feeds the field arrays to
//! a [`BatchFormatter`](formatter::BatchFormatter). The formatter coerces
//! each field by the type hint encoded in its column name (`name_s` quotes,
//! `age_i` coerces to integer, anything else passes through), buffers the
//! formatted tuples, and flushes one grouped INSERT per `threshold` rows.
//! End-of-input is finalized explicitly with one last flush.
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! path = "people.csv"
//! delimiter = ","
//!
//! [load]
//! table_name = "people"
//! columns = ["name_s", "age_i", "city"]
//! threshold = 100
//! dry_run = false
//!
//! [database]
//! url = "mysql://root@localhost:3306/mydb"
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod parser;

pub use config::BulkInsertConfig;
pub use error::{Error, Result};
pub use executor::{MySqlExecutor, NullExecutor, SqlExecutor};
pub use formatter::BatchFormatter;
pub use parser::{LineParser, RowHandler, RowPump};
