//! `SQLite` backend over `rusqlite`, pooled with bb8.
//!
//! - config: pool manager and options
//! - params: `RowValues` to `rusqlite` values
//! - query: rows to [`RecordSet`](crate::results::RecordSet)
//! - link: autocommit and transaction links
//! - metadata: `PRAGMA table_info` lookups

pub mod config;
pub mod link;
pub mod metadata;
pub mod params;
pub mod query;

pub use config::{SharedSqliteConnection, SqliteManager, SqliteOptions, SqliteOptionsBuilder};
pub use link::{SqliteLink, SqliteTxLink};
pub use metadata::table_fields;
pub use params::Params as SqliteParams;
pub use query::build_result_set;
