//! Orchestration of one Insert/Update/Delete call.

mod dispatch;
mod targets;

use std::sync::Arc;

use tracing::debug;

pub(crate) use dispatch::guarded;
pub use targets::{LinkOrigin, ResolvedLink, resolve_link};

use crate::error::SqlMutationError;
use crate::link::{CallContext, Link, LinkSource};
use crate::options::MutationOptions;
use crate::results::MutationResult;
use crate::statement::Mutation;

/// Runs mutations against links handed out by one [`LinkSource`].
#[derive(Clone, Copy)]
pub struct MutationExecutor<'a> {
    source: &'a dyn LinkSource,
}

impl<'a> MutationExecutor<'a> {
    #[must_use]
    pub fn new(source: &'a dyn LinkSource) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn source(&self) -> &'a dyn LinkSource {
        self.source
    }

    /// Execute `mutation` exactly once.
    ///
    /// The link is resolved before any SQL is sent: `explicit` wins, then the context's
    /// transaction, then a fresh master connection.
    ///
    /// # Errors
    ///
    /// `NotSupported` when an explicit returning request cannot be honoured, `Cancelled` /
    /// `Timeout` from the call context, and driver errors unchanged.
    pub async fn execute(
        &self,
        ctx: &CallContext,
        explicit: Option<Arc<dyn Link>>,
        mutation: &Mutation,
        opts: &MutationOptions,
    ) -> Result<MutationResult, SqlMutationError> {
        let resolved = resolve_link(self.source, ctx, explicit).await?;
        debug!(
            dialect = %resolved.link.dialect(),
            op = %mutation.operation(),
            table = mutation.table(),
            origin = ?resolved.origin,
            "executing mutation"
        );
        dispatch::run(self.source, resolved.link.as_ref(), ctx, mutation, opts).await
    }
}
