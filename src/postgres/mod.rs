//! PostgreSQL backend over `tokio-postgres`, pooled with bb8.
//!
//! - config: pool manager and options
//! - params: `ToSql` for `RowValues`
//! - query: rows to [`RecordSet`](crate::results::RecordSet)
//! - link: autocommit and transaction links
//! - metadata: primary-key lookups from the catalog

pub mod config;
pub mod link;
pub mod metadata;
pub mod params;
pub mod query;

pub use config::{PgManager, PostgresOptions, PostgresOptionsBuilder};
pub use link::{PgLink, PgTxLink};
pub use metadata::table_fields;
pub use params::Params as PostgresParams;
pub use query::build_result_set;
