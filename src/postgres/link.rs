use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use tokio::sync::Mutex;
use tokio_postgres::Client;
use tracing::{debug, trace};

use crate::convert_sql_params;
use crate::dialect::Dialect;
use crate::error::SqlMutationError;
use crate::link::{Link, NativeOutcome, TxControl};
use crate::results::RecordSet;
use crate::types::{ConversionMode, RowValues};

use super::config::PgManager;
use super::params::Params;
use super::query::build_result_set;

type PgPooledConnection = PooledConnection<'static, PgManager>;

async fn checkout(pool: &Pool<PgManager>) -> Result<PgPooledConnection, SqlMutationError> {
    pool.get_owned()
        .await
        .map_err(|e| SqlMutationError::ConnectionError(format!("postgres checkout error: {e}")))
}

// Postgres has no native last-inserted-id; identifiers only come back through RETURNING.
async fn exec_on(
    client: &Client,
    sql: &str,
    params: &[RowValues],
) -> Result<NativeOutcome, SqlMutationError> {
    let converted = convert_sql_params::<Params>(params, ConversionMode::Execute)?;
    let affected = client.execute(sql, converted.as_refs()).await?;
    Ok(NativeOutcome {
        affected,
        last_insert_id: None,
    })
}

async fn query_on(
    client: &Client,
    sql: &str,
    params: &[RowValues],
) -> Result<RecordSet, SqlMutationError> {
    let stmt = client.prepare(sql).await?;
    let converted = convert_sql_params::<Params>(params, ConversionMode::Query)?;
    let rows = client.query(&stmt, converted.as_refs()).await?;
    build_result_set(&stmt, &rows)
}

/// A pooled Postgres client in autocommit mode.
pub struct PgLink {
    conn: PgPooledConnection,
}

impl PgLink {
    /// Check a client out of the pool.
    ///
    /// # Errors
    /// Returns `ConnectionError` if the pool cannot hand out a client.
    pub async fn checkout(pool: &Pool<PgManager>) -> Result<Self, SqlMutationError> {
        Ok(Self {
            conn: checkout(pool).await?,
        })
    }

    /// The underlying client, for schema setup and other raw work.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.conn
    }
}

#[async_trait]
impl Link for PgLink {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn is_transaction(&self) -> bool {
        false
    }

    async fn exec(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<NativeOutcome, SqlMutationError> {
        exec_on(&self.conn, sql, params).await
    }

    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<RecordSet, SqlMutationError> {
        query_on(&self.conn, sql, params).await
    }
}

/// A Postgres client holding an open `BEGIN` block.
///
/// Statements on one transaction are serialized. Dropping an unfinished transaction issues a
/// `ROLLBACK` on the runtime before the client goes back to the pool.
pub struct PgTxLink {
    conn: Mutex<Option<PgPooledConnection>>,
}

impl PgTxLink {
    /// Check out a client and open a transaction on it.
    ///
    /// # Errors
    /// Returns `SqlMutationError` if checkout or `BEGIN` fails.
    pub async fn begin(pool: &Pool<PgManager>) -> Result<Self, SqlMutationError> {
        let conn = checkout(pool).await?;
        conn.simple_query("BEGIN").await?;
        trace!("postgres transaction started");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    async fn finish(&self, statement: &'static str) -> Result<(), SqlMutationError> {
        let conn = self.conn.lock().await.take().ok_or_else(completed)?;
        let res = conn.simple_query(statement).await.map(|_| ());
        if res.is_err() && statement == "COMMIT" {
            let _ = conn.simple_query("ROLLBACK").await;
        }
        debug!(statement, ok = res.is_ok(), "postgres transaction finished");
        res.map_err(SqlMutationError::from)
    }
}

fn completed() -> SqlMutationError {
    SqlMutationError::ExecutionError("Postgres transaction already completed".into())
}

#[async_trait]
impl Link for PgTxLink {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn is_transaction(&self) -> bool {
        true
    }

    async fn exec(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<NativeOutcome, SqlMutationError> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(completed)?;
        exec_on(conn, sql, params).await
    }

    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<RecordSet, SqlMutationError> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(completed)?;
        query_on(conn, sql, params).await
    }
}

#[async_trait]
impl TxControl for PgTxLink {
    async fn commit(&self) -> Result<(), SqlMutationError> {
        self.finish("COMMIT").await
    }

    async fn rollback(&self) -> Result<(), SqlMutationError> {
        self.finish("ROLLBACK").await
    }
}

impl Drop for PgTxLink {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.get_mut().take()
            && let Ok(handle) = tokio::runtime::Handle::try_current()
        {
            handle.spawn(async move {
                let _ = conn.simple_query("ROLLBACK").await;
            });
        }
    }
}
