//! The execution seam: a live connection or transaction, and the source that hands them out.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::dialect::{Dialect, ServerVersion};
use crate::error::SqlMutationError;
use crate::results::RecordSet;
use crate::types::RowValues;

/// What a driver reports after a statement that produced no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeOutcome {
    pub affected: u64,
    /// `None` when the driver has no native last-inserted-id (e.g. PostgreSQL).
    pub last_insert_id: Option<i64>,
}

/// A live connection or transaction bound to one dialect.
#[async_trait]
pub trait Link: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn is_transaction(&self) -> bool;

    /// Run a statement through the driver's native exec path.
    async fn exec(&self, sql: &str, params: &[RowValues])
    -> Result<NativeOutcome, SqlMutationError>;

    /// Run a row-producing statement.
    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<RecordSet, SqlMutationError>;
}

/// A transaction link that can be finished.
///
/// Once committed or rolled back, further statements on the link fail.
#[async_trait]
pub trait TxControl: Link {
    async fn commit(&self) -> Result<(), SqlMutationError>;

    async fn rollback(&self) -> Result<(), SqlMutationError>;
}

/// Column metadata used for primary-key detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableField {
    pub name: String,
    pub type_name: String,
    pub primary_key: bool,
    pub ordinal: usize,
}

impl TableField {
    /// True for integer-like column types (`INTEGER`, `bigint`, `bigserial`, ...).
    #[must_use]
    pub fn is_integer(&self) -> bool {
        let lower = self.type_name.to_ascii_lowercase();
        lower.contains("int") || lower.contains("serial")
    }
}

/// Hands out links and answers metadata questions for one connection class.
#[async_trait]
pub trait LinkSource: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// A fresh link to the primary (writable) database.
    async fn master_link(&self) -> Result<Arc<dyn Link>, SqlMutationError>;

    async fn table_fields(
        &self,
        link: &dyn Link,
        table: &str,
    ) -> Result<Vec<TableField>, SqlMutationError>;

    /// Server version, probed lazily and cached; `None` when unknown.
    async fn server_version(&self, link: &dyn Link) -> Option<ServerVersion>;
}

/// Per-call context: an optional ambient transaction plus cancellation and deadline.
#[derive(Clone, Default)]
pub struct CallContext {
    tx: Option<Arc<dyn Link>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_transaction(mut self, tx: Arc<dyn Link>) -> Self {
        self.tx = Some(tx);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn transaction(&self) -> Option<&Arc<dyn Link>> {
        self.tx.as_ref()
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field(
                "tx",
                &self.tx.as_ref().map(|tx| (tx.dialect(), tx.is_transaction())),
            )
            .field("cancelled", &self.cancel.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// An open transaction handed out by a pool.
///
/// Put [`Transaction::link`] into a [`CallContext`] (or pass it explicitly) to run mutations
/// inside it, then [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback).
/// Dropping an unfinished transaction rolls it back on a best-effort basis.
pub struct Transaction {
    inner: Arc<dyn TxControl>,
}

impl Transaction {
    #[must_use]
    pub fn new(inner: Arc<dyn TxControl>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn link(&self) -> Arc<dyn Link> {
        self.inner.clone()
    }

    /// # Errors
    /// Returns `SqlMutationError` if the driver rejects the commit.
    pub async fn commit(self) -> Result<(), SqlMutationError> {
        self.inner.commit().await
    }

    /// # Errors
    /// Returns `SqlMutationError` if the driver rejects the rollback.
    pub async fn rollback(self) -> Result<(), SqlMutationError> {
        self.inner.rollback().await
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("dialect", &self.inner.dialect())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_types_are_detected_case_insensitively() {
        let field = |t: &str| TableField {
            name: "id".into(),
            type_name: t.into(),
            primary_key: true,
            ordinal: 0,
        };
        assert!(field("INTEGER").is_integer());
        assert!(field("bigserial").is_integer());
        assert!(field("BIGINT UNSIGNED").is_integer());
        assert!(!field("uuid").is_integer());
        assert!(!field("varchar(36)").is_integer());
    }
}
