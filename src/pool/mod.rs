//! Connection pools and the [`LinkSource`] they provide.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::dialect::{Dialect, ServerVersion, VersionCache};
use crate::error::SqlMutationError;
use crate::link::{Link, LinkSource, TableField, Transaction};

#[cfg(feature = "postgres")]
use crate::postgres::{PgLink, PgManager, PgTxLink};
#[cfg(feature = "sqlite")]
use crate::sqlite::{SqliteLink, SqliteManager, SqliteTxLink};

/// Connection pool for one database engine.
#[derive(Clone)]
pub enum MiddlewarePool {
    #[cfg(feature = "postgres")]
    Postgres(bb8::Pool<PgManager>),
    #[cfg(feature = "sqlite")]
    Sqlite(bb8::Pool<SqliteManager>),
}

impl fmt::Debug for MiddlewarePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => f.debug_tuple("Postgres").field(&pool.state()).finish(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => f.debug_tuple("Sqlite").field(&pool.state()).finish(),
        }
    }
}

/// A pool plus what the mutation layer needs to know about it.
///
/// Cloning is cheap and clones share the pool and the cached server version.
#[derive(Clone, Debug)]
pub struct ConfigAndPool {
    pub pool: MiddlewarePool,
    pub dialect: Dialect,
    versions: Arc<VersionCache>,
}

impl ConfigAndPool {
    pub(crate) fn from_pool(pool: MiddlewarePool, dialect: Dialect) -> Self {
        Self {
            pool,
            dialect,
            versions: Arc::new(VersionCache::new()),
        }
    }

    /// Server version if it has been probed already.
    #[must_use]
    pub fn cached_server_version(&self) -> Option<Option<ServerVersion>> {
        self.versions.cached()
    }

    /// Open a transaction on a dedicated connection.
    ///
    /// # Errors
    /// Returns `SqlMutationError` if no connection is available or `BEGIN` fails.
    pub async fn begin(&self) -> Result<Transaction, SqlMutationError> {
        match &self.pool {
            #[cfg(feature = "postgres")]
            MiddlewarePool::Postgres(pool) => Ok(Transaction::new(Arc::new(
                PgTxLink::begin(pool).await?,
            ))),
            #[cfg(feature = "sqlite")]
            MiddlewarePool::Sqlite(pool) => Ok(Transaction::new(Arc::new(
                SqliteTxLink::begin(pool).await?,
            ))),
        }
    }
}

#[async_trait]
impl LinkSource for ConfigAndPool {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn master_link(&self) -> Result<Arc<dyn Link>, SqlMutationError> {
        match &self.pool {
            #[cfg(feature = "postgres")]
            MiddlewarePool::Postgres(pool) => Ok(Arc::new(PgLink::checkout(pool).await?)),
            #[cfg(feature = "sqlite")]
            MiddlewarePool::Sqlite(pool) => Ok(Arc::new(SqliteLink::checkout(pool).await?)),
        }
    }

    async fn table_fields(
        &self,
        link: &dyn Link,
        table: &str,
    ) -> Result<Vec<TableField>, SqlMutationError> {
        match &self.pool {
            #[cfg(feature = "postgres")]
            MiddlewarePool::Postgres(_) => crate::postgres::table_fields(link, table).await,
            #[cfg(feature = "sqlite")]
            MiddlewarePool::Sqlite(_) => crate::sqlite::table_fields(link, table).await,
        }
    }

    async fn server_version(&self, link: &dyn Link) -> Option<ServerVersion> {
        self.versions.get_or_probe(link).await
    }
}
