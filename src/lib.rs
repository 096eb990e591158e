//! Dialect-aware INSERT/UPDATE/DELETE execution.
//!
//! Builds mutation SQL for each supported dialect and negotiates a RETURNING (or SQL Server
//! OUTPUT) clause when rows are requested back. An explicit request the dialect cannot honour
//! fails with [`NotSupported`](error::NotSupported); the automatic primary-key fallback degrades
//! silently. Returned rows can be bound onto caller-owned object graphs with the
//! [`Materializer`](materialize::Materializer).
//!
//! ```rust,no_run
//! use sql_mutation::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlMutationError> {
//! let db = ConfigAndPool::sqlite_builder("app.db").build().await?;
//! let ctx = CallContext::new();
//!
//! let inserted = db
//!     .insert("users")
//!     .columns(["name"])
//!     .values(vec!["alice".into()])
//!     .execute(&ctx)
//!     .await?;
//! let id = inserted.last_insert_id()?;
//!
//! let renamed = db
//!     .update("users")
//!     .set("name", "alicia")
//!     .where_eq("id", id)
//!     .returning(["id", "name"])
//!     .execute(&ctx)
//!     .await?;
//! assert_eq!(renamed.rows_affected(), 1);
//! # Ok(())
//! # }
//! ```

pub mod dialect;
pub mod error;
pub mod executor;
pub mod link;
pub mod materialize;
pub mod options;
pub mod prelude;
pub mod query_builder;
pub mod results;
mod scan;
pub mod statement;
pub mod translation;
pub mod types;

#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub mod pool;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::{NotSupported, SqlMutationError};
pub use types::{ConversionMode, ParamConverter, RowValues};

/// Convert parameters with the given backend converter.
///
/// # Errors
/// Whatever the converter reports for an unrepresentable value.
pub fn convert_sql_params<'a, T: ParamConverter<'a>>(
    params: &'a [RowValues],
    mode: ConversionMode,
) -> Result<T::Converted, SqlMutationError> {
    T::convert_sql_params(params, mode)
}
