//! Convenient imports for common functionality.

pub use crate::dialect::{Cardinality, Dialect, Operation, ServerVersion};
pub use crate::error::{NotSupported, SqlMutationError};
pub use crate::executor::MutationExecutor;
pub use crate::link::{CallContext, Link, LinkSource, NativeOutcome, TableField, Transaction};
pub use crate::materialize::{
    BindingCardinality, CorrelationKeys, Entity, Keyed, Materializer, RelationBinding,
};
pub use crate::options::{InsertOption, MutationOptions, Returning};
pub use crate::query_builder::{MutationBuilder, MutationSource};
pub use crate::results::{LastInsertId, MutationResult, Record, RecordSet};
pub use crate::statement::Filter;
pub use crate::types::RowValues;

#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub use crate::pool::{ConfigAndPool, MiddlewarePool};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresOptions, PostgresOptionsBuilder};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteOptionsBuilder};
