#![cfg(feature = "test-utils")]

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use sql_mutation::prelude::*;
use sql_mutation::test_utils::{MockLink, MockSource};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

fn slow_source(delay: Duration) -> (Arc<MockLink>, MockSource) {
    let link = Arc::new(MockLink::new(Dialect::Postgres).with_delay(delay));
    let source = MockSource::new(Arc::clone(&link));
    (link, source)
}

#[test]
fn deadline_expiry_is_a_timeout() -> Result<(), Box<dyn Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let (link, source) = slow_source(Duration::from_secs(5));
        let ctx = CallContext::new().with_timeout(Duration::from_millis(20));

        let err = source
            .update("jobs")
            .set("state", "done")
            .where_eq("id", 1)
            .execute(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, SqlMutationError::Timeout), "got {err:?}");
        // the statement was sent before the deadline passed
        assert_eq!(link.executed().len(), 1);
        Ok::<(), Box<dyn Error>>(())
    })
}

#[test]
fn an_elapsed_deadline_sends_nothing() -> Result<(), Box<dyn Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let (link, source) = slow_source(Duration::ZERO);
        let ctx = CallContext::new().with_timeout(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(1)).await;

        let err = source
            .delete("jobs")
            .where_eq("id", 1)
            .execute(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, SqlMutationError::Timeout));
        assert!(link.executed().is_empty());
        Ok::<(), Box<dyn Error>>(())
    })
}

#[test]
fn cancellation_aborts_in_flight_and_pending_calls() -> Result<(), Box<dyn Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let (link, source) = slow_source(Duration::from_secs(5));
        let token = CancellationToken::new();
        let ctx = CallContext::new().with_cancellation(token.clone());

        let canceller = tokio::spawn({
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                token.cancel();
            }
        });
        let err = source
            .insert("jobs")
            .columns(["state"])
            .values(vec!["queued".into()])
            .primary_key("id")
            .execute(&ctx)
            .await
            .unwrap_err();
        canceller.await?;
        assert!(matches!(err, SqlMutationError::Cancelled), "got {err:?}");
        assert_eq!(link.executed().len(), 1);

        // an already-cancelled context never reaches the link
        let err = source
            .insert("jobs")
            .columns(["state"])
            .values(vec!["queued".into()])
            .execute(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, SqlMutationError::Cancelled));
        assert_eq!(link.executed().len(), 1);
        assert_eq!(source.master_calls(), 1);
        Ok::<(), Box<dyn Error>>(())
    })
}

#[test]
fn driver_errors_pass_through_unchanged() -> Result<(), Box<dyn Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let (link, source) = slow_source(Duration::ZERO);
        link.push_exec_error(SqlMutationError::ExecutionError(
            "duplicate key value violates unique constraint".into(),
        ));
        let err = source
            .update("jobs")
            .set("state", "done")
            .where_eq("id", 1)
            .execute(&CallContext::new())
            .await
            .unwrap_err();
        assert!(
            matches!(&err, SqlMutationError::ExecutionError(msg) if msg.contains("duplicate key"))
        );

        link.push_query_error(SqlMutationError::ExecutionError("relation missing".into()));
        let err = source
            .delete("jobs")
            .where_eq("id", 1)
            .returning(["id"])
            .execute(&CallContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("relation missing"));
        Ok::<(), Box<dyn Error>>(())
    })
}
