//! Scripted in-memory links for exercising dialects without a server.
//!
//! A [`MockLink`] speaks any [`Dialect`], records every statement it receives, and answers
//! from queues of canned replies. [`MockSource`] wraps one link and serves fixed table metadata
//! and a preset server version.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::dialect::{Dialect, ServerVersion, VersionCache};
use crate::error::SqlMutationError;
use crate::link::{Link, LinkSource, NativeOutcome, TableField};
use crate::results::RecordSet;
use crate::types::RowValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Exec,
    Query,
}

/// One statement as the link received it.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub kind: CallKind,
    pub sql: String,
    pub params: Vec<RowValues>,
}

#[derive(Default)]
struct Script {
    log: Vec<Executed>,
    queries: VecDeque<Result<RecordSet, SqlMutationError>>,
    execs: VecDeque<Result<NativeOutcome, SqlMutationError>>,
}

/// A [`Link`] that answers from scripted replies.
///
/// With nothing queued, `query` returns an empty record set and `exec` reports one affected
/// row and no native id.
pub struct MockLink {
    dialect: Dialect,
    transaction: bool,
    delay: Option<Duration>,
    script: Mutex<Script>,
}

impl MockLink {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            transaction: false,
            delay: None,
            script: Mutex::new(Script::default()),
        }
    }

    /// Report itself as a transaction link.
    #[must_use]
    pub fn in_transaction(mut self) -> Self {
        self.transaction = true;
        self
    }

    /// Sleep this long before answering each statement.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_query(&self, records: RecordSet) -> &Self {
        self.script().queries.push_back(Ok(records));
        self
    }

    pub fn push_query_error(&self, err: SqlMutationError) -> &Self {
        self.script().queries.push_back(Err(err));
        self
    }

    pub fn push_exec(&self, outcome: NativeOutcome) -> &Self {
        self.script().execs.push_back(Ok(outcome));
        self
    }

    pub fn push_exec_error(&self, err: SqlMutationError) -> &Self {
        self.script().execs.push_back(Err(err));
        self
    }

    /// Every statement received so far, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<Executed> {
        self.script().log.clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<Executed> {
        self.script().log.last().cloned()
    }

    fn record(&self, kind: CallKind, sql: &str, params: &[RowValues]) {
        self.script().log.push(Executed {
            kind,
            sql: sql.to_owned(),
            params: params.to_vec(),
        });
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Link for MockLink {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn is_transaction(&self) -> bool {
        self.transaction
    }

    async fn exec(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<NativeOutcome, SqlMutationError> {
        self.record(CallKind::Exec, sql, params);
        self.pause().await;
        let reply = self.script().execs.pop_front();
        reply.unwrap_or(Ok(NativeOutcome {
            affected: 1,
            last_insert_id: None,
        }))
    }

    async fn query(&self, sql: &str, params: &[RowValues]) -> Result<RecordSet, SqlMutationError> {
        self.record(CallKind::Query, sql, params);
        self.pause().await;
        let reply = self.script().queries.pop_front();
        reply.unwrap_or_else(|| Ok(RecordSet::default()))
    }
}

/// A [`LinkSource`] over one shared [`MockLink`].
pub struct MockSource {
    link: Arc<MockLink>,
    tables: HashMap<String, Vec<TableField>>,
    versions: VersionCache,
    master_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
}

impl MockSource {
    /// Source whose server version is known to be unknown; no probe runs.
    #[must_use]
    pub fn new(link: Arc<MockLink>) -> Self {
        Self {
            link,
            tables: HashMap::new(),
            versions: VersionCache::known(None),
            master_calls: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: ServerVersion) -> Self {
        self.versions = VersionCache::known(Some(version));
        self
    }

    /// Probe the version through the link on first use.
    #[must_use]
    pub fn probing(mut self) -> Self {
        self.versions = VersionCache::new();
        self
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>, fields: Vec<TableField>) -> Self {
        self.tables.insert(table.into(), fields);
        self
    }

    #[must_use]
    pub fn link(&self) -> Arc<MockLink> {
        Arc::clone(&self.link)
    }

    #[must_use]
    pub fn master_calls(&self) -> usize {
        self.master_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkSource for MockSource {
    fn dialect(&self) -> Dialect {
        self.link.dialect()
    }

    async fn master_link(&self) -> Result<Arc<dyn Link>, SqlMutationError> {
        self.master_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.link.clone())
    }

    async fn table_fields(
        &self,
        _link: &dyn Link,
        table: &str,
    ) -> Result<Vec<TableField>, SqlMutationError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| SqlMutationError::NotFound(format!("table `{table}`")))
    }

    async fn server_version(&self, link: &dyn Link) -> Option<ServerVersion> {
        self.versions.get_or_probe(link).await
    }
}

/// Record set with the given columns and rows.
#[must_use]
pub fn records(columns: &[&str], rows: Vec<Vec<RowValues>>) -> RecordSet {
    let mut set = RecordSet::with_columns(columns.iter().map(|c| (*c).to_owned()).collect());
    for row in rows {
        set.add_row_values(row);
    }
    set
}

/// Column metadata entry.
#[must_use]
pub fn field(name: &str, type_name: &str, primary_key: bool, ordinal: usize) -> TableField {
    TableField {
        name: name.to_owned(),
        type_name: type_name.to_owned(),
        primary_key,
        ordinal,
    }
}
