use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use bb8::{ManageConnection, Pool};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::SqlMutationError;
use crate::pool::{ConfigAndPool, MiddlewarePool};

use super::link::run_blocking;

/// A `rusqlite` connection shared between the async side and blocking workers.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// bb8 manager that opens `rusqlite` connections for one database path.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    path: String,
}

impl SqliteManager {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn is_memory(&self) -> bool {
        self.path == ":memory:" || self.path.contains("mode=memory")
    }

    /// Build a pool from this manager.
    ///
    /// In-memory databases are private to one connection, so their pool holds exactly one.
    ///
    /// # Errors
    /// Returns `SqlMutationError` if pool creation fails.
    pub async fn build_pool(
        self,
        max_size: Option<u32>,
    ) -> Result<Pool<SqliteManager>, SqlMutationError> {
        let max_size = if self.is_memory() {
            1
        } else {
            max_size.unwrap_or(10)
        };
        Pool::builder()
            .max_size(max_size)
            .build(self)
            .await
            .map_err(|e| SqlMutationError::ConnectionError(format!("sqlite pool error: {e}")))
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = rusqlite::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let path = self.path.clone();
        async move {
            let conn = if path == ":memory:" {
                rusqlite::Connection::open_in_memory()?
            } else {
                rusqlite::Connection::open(PathBuf::from(&path))?
            };
            // per-connection setting
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(Arc::new(Mutex::new(conn)))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let handle = Arc::clone(conn);
        async move {
            let guard = handle.lock().await;
            guard.execute_batch("SELECT 1")
        }
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Options for configuring a `SQLite` pool.
///
/// Deserializable so the same settings can come from a config file:
/// ```rust
/// use sql_mutation::sqlite::SqliteOptions;
///
/// let opts: SqliteOptions = serde_json::from_str(r#"{ "db_path": "app.db" }"#).unwrap();
/// assert!(opts.wal);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    #[serde(default)]
    pub max_size: Option<u32>,
    /// Switch file databases to WAL journaling on startup.
    #[serde(default = "default_wal")]
    pub wal: bool,
}

fn default_wal() -> bool {
    true
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            max_size: None,
            wal: true,
        }
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn max_size(mut self, max_size: u32) -> Self {
        self.opts.max_size = Some(max_size);
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a `ConfigAndPool` for `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqlMutationError` if pool creation or the initial smoke test fails.
    pub async fn build(self) -> Result<ConfigAndPool, SqlMutationError> {
        ConfigAndPool::new_sqlite(self.finish()).await
    }
}

impl ConfigAndPool {
    #[must_use]
    pub fn sqlite_builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Open a `SQLite` pool.
    ///
    /// # Errors
    /// Returns `SqlMutationError::ConnectionError` if pool creation or the connection test fails.
    pub async fn new_sqlite(opts: SqliteOptions) -> Result<Self, SqlMutationError> {
        let manager = SqliteManager::new(opts.db_path.clone());
        let in_memory = manager.is_memory();
        let pool = manager.build_pool(opts.max_size).await?;

        {
            let conn = pool.get().await.map_err(|e| {
                SqlMutationError::ConnectionError(format!("sqlite checkout error: {e}"))
            })?;
            let wal = opts.wal && !in_memory;
            run_blocking(Arc::clone(&*conn), move |guard| {
                // journal mode is stored in the database file, once is enough
                if wal {
                    guard.execute_batch("PRAGMA journal_mode = WAL;")?;
                }
                guard.execute_batch("SELECT 1")?;
                Ok(())
            })
            .await?;
        }
        debug!(path = %opts.db_path, in_memory, "sqlite pool ready");

        Ok(ConfigAndPool::from_pool(
            MiddlewarePool::Sqlite(pool),
            Dialect::Sqlite,
        ))
    }
}
