use std::sync::Arc;

use crate::error::SqlMutationError;
use crate::executor::guarded;
use crate::link::{CallContext, Link, LinkSource};

/// Where the link for a call came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOrigin {
    Explicit,
    ContextTransaction,
    Master,
}

/// The link a call is bound to; it is never swapped afterwards.
pub struct ResolvedLink {
    pub link: Arc<dyn Link>,
    pub origin: LinkOrigin,
}

/// Resolve the link for one call.
///
/// # Errors
///
/// `ConfigError` when the resolved link speaks a different dialect than `source`; pool
/// errors from `master_link`; `Cancelled`/`Timeout` while waiting for a connection.
pub async fn resolve_link(
    source: &dyn LinkSource,
    ctx: &CallContext,
    explicit: Option<Arc<dyn Link>>,
) -> Result<ResolvedLink, SqlMutationError> {
    let resolved = if let Some(link) = explicit {
        ResolvedLink {
            link,
            origin: LinkOrigin::Explicit,
        }
    } else if let Some(tx) = ctx.transaction() {
        ResolvedLink {
            link: Arc::clone(tx),
            origin: LinkOrigin::ContextTransaction,
        }
    } else {
        ResolvedLink {
            link: guarded(ctx, source.master_link()).await?,
            origin: LinkOrigin::Master,
        }
    };

    if resolved.link.dialect() != source.dialect() {
        return Err(SqlMutationError::ConfigError(format!(
            "{:?} link speaks {} but the source is {}",
            resolved.origin,
            resolved.link.dialect(),
            source.dialect()
        )));
    }
    Ok(resolved)
}
