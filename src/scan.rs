//! Return-and-scan helpers: run a mutation with `RETURNING *` and scan the rows into entities.
//!
//! Unlike a plain `execute`, these never fall back. A dialect that cannot return rows for the
//! operation fails with `NotSupported`, and a statement that touched no rows fails with
//! `NotFound`.

use tracing::debug;

use crate::dialect::Operation;
use crate::error::{NotSupported, SqlMutationError};
use crate::link::CallContext;
use crate::materialize::{Entity, Materializer};
use crate::query_builder::MutationBuilder;

impl MutationBuilder<'_> {
    /// # Errors
    /// `ParameterError` on a non-insert builder, otherwise see [`scan_returning`](Self::scan_returning).
    pub async fn insert_and_scan<T: Entity>(
        self,
        ctx: &CallContext,
    ) -> Result<Vec<T>, SqlMutationError> {
        self.expect_operation(Operation::Insert, "insert_and_scan")?
            .scan_returning(ctx)
            .await
    }

    /// `INSERT` that skips conflicting rows; skipped rows are not returned.
    ///
    /// # Errors
    /// See [`insert_and_scan`](Self::insert_and_scan).
    pub async fn insert_ignore_and_scan<T: Entity>(
        self,
        ctx: &CallContext,
    ) -> Result<Vec<T>, SqlMutationError> {
        self.expect_operation(Operation::Insert, "insert_ignore_and_scan")?
            .ignore()
            .scan_returning(ctx)
            .await
    }

    /// # Errors
    /// See [`insert_and_scan`](Self::insert_and_scan).
    pub async fn replace_and_scan<T: Entity>(
        self,
        ctx: &CallContext,
    ) -> Result<Vec<T>, SqlMutationError> {
        self.expect_operation(Operation::Insert, "replace_and_scan")?
            .replace()
            .scan_returning(ctx)
            .await
    }

    /// Upsert on `conflict_columns` and scan the stored rows.
    ///
    /// # Errors
    /// See [`insert_and_scan`](Self::insert_and_scan).
    pub async fn save_and_scan<T, I, S>(
        self,
        conflict_columns: I,
        ctx: &CallContext,
    ) -> Result<Vec<T>, SqlMutationError>
    where
        T: Entity,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expect_operation(Operation::Insert, "save_and_scan")?
            .save(conflict_columns)
            .scan_returning(ctx)
            .await
    }

    /// Rows as they are after the update.
    ///
    /// # Errors
    /// `ParameterError` on a non-update builder, otherwise see [`scan_returning`](Self::scan_returning).
    pub async fn update_and_scan<T: Entity>(
        self,
        ctx: &CallContext,
    ) -> Result<Vec<T>, SqlMutationError> {
        self.expect_operation(Operation::Update, "update_and_scan")?
            .scan_returning(ctx)
            .await
    }

    /// Rows as they were before the delete.
    ///
    /// # Errors
    /// `ParameterError` on a non-delete builder, otherwise see [`scan_returning`](Self::scan_returning).
    pub async fn delete_and_scan<T: Entity>(
        self,
        ctx: &CallContext,
    ) -> Result<Vec<T>, SqlMutationError> {
        self.expect_operation(Operation::Delete, "delete_and_scan")?
            .scan_returning(ctx)
            .await
    }

    /// Force `RETURNING *`, execute, and scan every returned row into a fresh `T`.
    ///
    /// # Errors
    /// `NotSupported` when the dialect cannot return rows for the operation, `NotFound` when no
    /// row came back, plus any execution or materialization error.
    pub async fn scan_returning<T: Entity>(
        self,
        ctx: &CallContext,
    ) -> Result<Vec<T>, SqlMutationError> {
        let dialect = self
            .link
            .as_ref()
            .map_or_else(|| self.source.dialect(), |link| link.dialect());
        let op = self.mutation.operation();
        let table = self.mutation.table().to_owned();

        let result = self.returning_all().execute(ctx).await?;
        let records = result.into_records().ok_or_else(|| {
            NotSupported::new(dialect, format!("returning rows from {op}"))
                .with_detail("no records were produced")
        })?;
        if records.is_empty() {
            debug!(%dialect, %op, table = %table, "returning clause produced no rows");
            return Err(SqlMutationError::NotFound(
                "no records returned from returning clause".into(),
            ));
        }
        Materializer::new(&records).scan()
    }

    fn expect_operation(self, op: Operation, method: &str) -> Result<Self, SqlMutationError> {
        if self.mutation.operation() == op {
            Ok(self)
        } else {
            Err(SqlMutationError::ParameterError(format!(
                "`{method}` needs a {op} builder, got {}",
                self.mutation.operation()
            )))
        }
    }
}
