use std::future::Future;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::dialect::{Cardinality, Dialect, Operation, negotiate};
use crate::error::{NotSupported, SqlMutationError};
use crate::link::{CallContext, Link, LinkSource};
use crate::options::{InsertOption, MutationOptions, Returning};
use crate::results::{LastInsertId, MutationResult, RecordSet};
use crate::statement::Mutation;

/// Drive `fut` unless the context is cancelled or its deadline passes first.
///
/// No partial result escapes: a cancelled or expired future is dropped.
pub(crate) async fn guarded<T, F>(ctx: &CallContext, fut: F) -> Result<T, SqlMutationError>
where
    F: Future<Output = Result<T, SqlMutationError>>,
{
    let cancel = ctx.cancellation();
    if cancel.is_cancelled() {
        return Err(SqlMutationError::Cancelled);
    }
    match ctx.deadline() {
        Some(deadline) if Instant::now() >= deadline => Err(SqlMutationError::Timeout),
        Some(deadline) => tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SqlMutationError::Cancelled),
            res = tokio::time::timeout_at(deadline, fut) => match res {
                Ok(inner) => inner,
                Err(_) => Err(SqlMutationError::Timeout),
            },
        },
        None => tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SqlMutationError::Cancelled),
            res = fut => res,
        },
    }
}

pub(super) async fn run(
    source: &dyn LinkSource,
    link: &dyn Link,
    ctx: &CallContext,
    mutation: &Mutation,
    opts: &MutationOptions,
) -> Result<MutationResult, SqlMutationError> {
    if opts.returning.is_requested() {
        return run_explicit(source, link, ctx, mutation, opts).await;
    }

    if mutation.operation() == Operation::Insert
        && opts.insert_option == InsertOption::Default
        && let Some(result) = run_auto_primary_key(source, link, ctx, mutation, opts).await?
    {
        return Ok(result);
    }

    run_plain(link, ctx, mutation, opts).await
}

fn cardinality(mutation: &Mutation, opts: &MutationOptions) -> Cardinality {
    match mutation {
        Mutation::Insert(stmt) if stmt.rows.len() > 1 => Cardinality::Multi,
        Mutation::Insert(_) => Cardinality::Single,
        _ if opts.single_row => Cardinality::Single,
        _ => Cardinality::Multi,
    }
}

async fn run_explicit(
    source: &dyn LinkSource,
    link: &dyn Link,
    ctx: &CallContext,
    mutation: &Mutation,
    opts: &MutationOptions,
) -> Result<MutationResult, SqlMutationError> {
    let dialect = link.dialect();
    let op = mutation.operation();
    // dialects without any returning clause are refused before the version round trip
    let version = if dialect.returning_cardinality(op).is_some() {
        guarded(ctx, async { Ok(source.server_version(link).await) }).await?
    } else {
        None
    };
    let clause = negotiate(
        dialect,
        op,
        &opts.returning,
        version,
        cardinality(mutation, opts),
    )
    .inspect_err(|reason| debug!(%dialect, %op, %reason, "explicit returning refused"))?;
    let rendered = mutation.render(dialect, &opts.insert_option, clause.as_ref())?;
    trace!(sql = %rendered.sql, params = rendered.params.len(), "returning query");

    let records = guarded(ctx, link.query(&rendered.sql, &rendered.params)).await?;
    if opts.single_row && matches!(op, Operation::Update | Operation::Delete) {
        match records.len() {
            0 => {
                debug!(
                    %dialect,
                    %op,
                    table = mutation.table(),
                    "single-row mutation matched nothing"
                );
                return Err(SqlMutationError::NotFound(format!(
                    "{op} on `{}` returned no rows",
                    mutation.table()
                )));
            }
            1 => {}
            // the statement already ran; report every row it touched
            rows => warn!(
                %dialect,
                %op,
                table = mutation.table(),
                rows,
                "single-row mutation touched several rows"
            ),
        }
    }
    Ok(MutationResult::with_records(
        records,
        NotSupported::new(dialect, "last insert id").with_detail("custom returning clause in use"),
    ))
}

/// Best-effort `RETURNING <pk>` for a plain insert. `Ok(None)` falls through to the native path.
async fn run_auto_primary_key(
    source: &dyn LinkSource,
    link: &dyn Link,
    ctx: &CallContext,
    mutation: &Mutation,
    opts: &MutationOptions,
) -> Result<Option<MutationResult>, SqlMutationError> {
    let dialect = link.dialect();
    if dialect.returning_cardinality(Operation::Insert).is_none() {
        return Ok(None);
    }
    let Some(primary_key) = auto_primary_key(source, link, ctx, mutation, opts).await? else {
        return Ok(None);
    };

    let version = guarded(ctx, async { Ok(source.server_version(link).await) }).await?;
    let returning = Returning::Fields(vec![primary_key.clone()]);
    let clause = match negotiate(
        dialect,
        Operation::Insert,
        &returning,
        version,
        cardinality(mutation, opts),
    ) {
        Ok(Some(clause)) => clause,
        Ok(None) => return Ok(None),
        Err(reason) => {
            debug!(%dialect, %reason, "primary key returning unavailable, using native exec");
            return Ok(None);
        }
    };

    let rendered = mutation.render(dialect, &opts.insert_option, Some(&clause))?;
    trace!(sql = %rendered.sql, pk = %primary_key, "insert with primary key returning");
    let records = guarded(ctx, link.query(&rendered.sql, &rendered.params)).await?;
    let last_insert_id = last_primary_key(dialect, &records, &primary_key);
    Ok(Some(MutationResult::plain(
        records.len() as u64,
        last_insert_id,
    )))
}

/// The single integer primary-key column, from the hint or from table metadata.
async fn auto_primary_key(
    source: &dyn LinkSource,
    link: &dyn Link,
    ctx: &CallContext,
    mutation: &Mutation,
    opts: &MutationOptions,
) -> Result<Option<String>, SqlMutationError> {
    if let Some(hint) = &opts.primary_key {
        return Ok(Some(hint.clone()));
    }
    let fields = match guarded(ctx, source.table_fields(link, mutation.table())).await {
        Ok(fields) => fields,
        Err(err @ (SqlMutationError::Cancelled | SqlMutationError::Timeout)) => return Err(err),
        Err(err) => {
            debug!(table = mutation.table(), error = %err, "table metadata unavailable");
            return Ok(None);
        }
    };
    let mut keys = fields.iter().filter(|f| f.primary_key);
    match (keys.next(), keys.next()) {
        (Some(key), None) if key.is_integer() => Ok(Some(key.name.clone())),
        _ => Ok(None),
    }
}

fn last_primary_key(dialect: Dialect, records: &RecordSet, primary_key: &str) -> LastInsertId {
    let value = records.last().and_then(|row| {
        row.get(primary_key)
            .or_else(|| row.get_ignore_case(primary_key))
    });
    match value.and_then(|v| v.to_identifier()) {
        Some(id) => LastInsertId::Value(id),
        None => LastInsertId::Unavailable(
            NotSupported::new(dialect, "last insert id").with_detail(format!(
                "primary key `{primary_key}` did not return an integer value ({value:?})"
            )),
        ),
    }
}

async fn run_plain(
    link: &dyn Link,
    ctx: &CallContext,
    mutation: &Mutation,
    opts: &MutationOptions,
) -> Result<MutationResult, SqlMutationError> {
    let dialect = link.dialect();
    let rendered = mutation.render(dialect, &opts.insert_option, None)?;
    trace!(sql = %rendered.sql, params = rendered.params.len(), "native exec");
    let outcome = guarded(ctx, link.exec(&rendered.sql, &rendered.params)).await?;
    // drivers keep the id of the connection's previous insert, so only a row-producing
    // INSERT owns it
    let inserted = mutation.operation() == Operation::Insert && outcome.affected > 0;
    let last_insert_id = match outcome.last_insert_id {
        Some(id) if inserted => LastInsertId::Value(id),
        Some(_) => LastInsertId::Unavailable(
            NotSupported::new(dialect, "last insert id")
                .with_detail(format!("{} inserted no row", mutation.operation())),
        ),
        None => LastInsertId::Unavailable(
            NotSupported::new(dialect, "last insert id")
                .with_detail("driver does not report generated identifiers"),
        ),
    };
    Ok(MutationResult::plain(outcome.affected, last_insert_id))
}
