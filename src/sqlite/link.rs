use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use tracing::{debug, trace};

use crate::convert_sql_params;
use crate::dialect::Dialect;
use crate::error::SqlMutationError;
use crate::link::{Link, NativeOutcome, TxControl};
use crate::results::RecordSet;
use crate::types::{ConversionMode, RowValues};

use super::config::{SharedSqliteConnection, SqliteManager};
use super::params::Params;
use super::query::build_result_set;

pub(crate) type SqlitePooledConnection = PooledConnection<'static, SqliteManager>;

/// Run synchronous `rusqlite` work on the blocking pool.
pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlMutationError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlMutationError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlMutationError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}

async fn checkout(pool: &Pool<SqliteManager>) -> Result<SqlitePooledConnection, SqlMutationError> {
    pool.get_owned()
        .await
        .map_err(|e| SqlMutationError::ConnectionError(format!("sqlite checkout error: {e}")))
}

fn exec_blocking(
    guard: &mut rusqlite::Connection,
    sql: &str,
    params: &Params,
) -> Result<NativeOutcome, SqlMutationError> {
    let mut stmt = guard.prepare_cached(sql)?;
    let affected = stmt.execute(&params.as_refs()[..])?;
    // Connection-wide: the most recent successful insert, not necessarily this statement.
    let rowid = guard.last_insert_rowid();
    Ok(NativeOutcome {
        affected: affected as u64,
        last_insert_id: (rowid != 0).then_some(rowid),
    })
}

fn query_blocking(
    guard: &mut rusqlite::Connection,
    sql: &str,
    params: &Params,
) -> Result<RecordSet, SqlMutationError> {
    let mut stmt = guard.prepare_cached(sql)?;
    build_result_set(&mut stmt, &params.0)
}

async fn exec_on(
    handle: SharedSqliteConnection,
    sql: &str,
    params: &[RowValues],
) -> Result<NativeOutcome, SqlMutationError> {
    let sql = sql.to_owned();
    let params = convert_sql_params::<Params>(params, ConversionMode::Execute)?;
    run_blocking(handle, move |guard| exec_blocking(guard, &sql, &params)).await
}

async fn query_on(
    handle: SharedSqliteConnection,
    sql: &str,
    params: &[RowValues],
) -> Result<RecordSet, SqlMutationError> {
    let sql = sql.to_owned();
    let params = convert_sql_params::<Params>(params, ConversionMode::Query)?;
    run_blocking(handle, move |guard| query_blocking(guard, &sql, &params)).await
}

async fn batch_on(handle: SharedSqliteConnection, sql: &'static str) -> Result<(), SqlMutationError> {
    run_blocking(handle, move |guard| {
        guard.execute_batch(sql)?;
        Ok(())
    })
    .await
}

/// A pooled `SQLite` connection in autocommit mode.
pub struct SqliteLink {
    conn: SqlitePooledConnection,
}

impl SqliteLink {
    /// Check a connection out of the pool.
    ///
    /// # Errors
    /// Returns `ConnectionError` if the pool cannot hand out a connection.
    pub async fn checkout(pool: &Pool<SqliteManager>) -> Result<Self, SqlMutationError> {
        Ok(Self {
            conn: checkout(pool).await?,
        })
    }

    fn handle(&self) -> SharedSqliteConnection {
        Arc::clone(&*self.conn)
    }

    /// Run raw `rusqlite` work (schema setup, pragmas) on this connection.
    ///
    /// # Errors
    /// Whatever `func` returns, or a join error from the blocking pool.
    pub async fn with_connection<F, R>(&self, func: F) -> Result<R, SqlMutationError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlMutationError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(self.handle(), func).await
    }
}

#[async_trait]
impl Link for SqliteLink {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn is_transaction(&self) -> bool {
        false
    }

    async fn exec(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<NativeOutcome, SqlMutationError> {
        exec_on(self.handle(), sql, params).await
    }

    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<RecordSet, SqlMutationError> {
        query_on(self.handle(), sql, params).await
    }
}

/// A `SQLite` connection holding an open `BEGIN` block.
///
/// The pooled connection is released as soon as the transaction finishes. Dropping an
/// unfinished transaction rolls it back.
pub struct SqliteTxLink {
    conn: Mutex<Option<SqlitePooledConnection>>,
}

impl SqliteTxLink {
    /// Check out a connection and open a transaction on it.
    ///
    /// # Errors
    /// Returns `SqlMutationError` if checkout or `BEGIN` fails.
    pub async fn begin(pool: &Pool<SqliteManager>) -> Result<Self, SqlMutationError> {
        let conn = checkout(pool).await?;
        batch_on(Arc::clone(&*conn), "BEGIN").await?;
        trace!("sqlite transaction started");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn handle(&self) -> Result<SharedSqliteConnection, SqlMutationError> {
        self.conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|conn| Arc::clone(&**conn))
            .ok_or_else(|| {
                SqlMutationError::ExecutionError("SQLite transaction already completed".into())
            })
    }

    fn take(&self) -> Result<SqlitePooledConnection, SqlMutationError> {
        self.conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| {
                SqlMutationError::ExecutionError("SQLite transaction already completed".into())
            })
    }

    async fn finish(&self, statement: &'static str) -> Result<(), SqlMutationError> {
        let conn = self.take()?;
        let handle = Arc::clone(&*conn);
        let res = batch_on(Arc::clone(&handle), statement).await;
        if res.is_err() && statement == "COMMIT" {
            // A failed COMMIT can leave the transaction open on the pooled connection.
            let _ = batch_on(handle, "ROLLBACK").await;
        }
        debug!(statement, ok = res.is_ok(), "sqlite transaction finished");
        res
    }
}

#[async_trait]
impl Link for SqliteTxLink {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn is_transaction(&self) -> bool {
        true
    }

    async fn exec(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<NativeOutcome, SqlMutationError> {
        exec_on(self.handle()?, sql, params).await
    }

    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<RecordSet, SqlMutationError> {
        query_on(self.handle()?, sql, params).await
    }
}

#[async_trait]
impl TxControl for SqliteTxLink {
    async fn commit(&self) -> Result<(), SqlMutationError> {
        self.finish("COMMIT").await
    }

    async fn rollback(&self) -> Result<(), SqlMutationError> {
        self.finish("ROLLBACK").await
    }
}

impl Drop for SqliteTxLink {
    fn drop(&mut self) {
        let Some(conn) = self
            .conn
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        let handle = Arc::clone(&*conn);
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(async move {
                let _ = batch_on(handle, "ROLLBACK").await;
                drop(conn);
            });
        } else if let Ok(guard) = handle.try_lock() {
            let _ = guard.execute_batch("ROLLBACK");
        }
    }
}
