use std::fmt;

use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "postgres")]
use tokio_postgres;

use crate::dialect::Dialect;

/// A capability that was explicitly requested but cannot be provided by the backend.
///
/// Kept separate from [`SqlMutationError`] so results can store it and hand out copies on
/// every `last_insert_id()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotSupported {
    pub dialect: Dialect,
    pub capability: String,
    pub detail: Option<String>,
}

impl NotSupported {
    #[must_use]
    pub fn new(dialect: Dialect, capability: impl Into<String>) -> Self {
        Self {
            dialect,
            capability: capability.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for NotSupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not supported by {}", self.capability, self.dialect)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for NotSupported {}

#[derive(Debug, Error)]
pub enum SqlMutationError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    NotSupported(#[from] NotSupported),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Materialization error: {0}")]
    Materialize(String),

    #[error("Call was cancelled")]
    Cancelled,

    #[error("Call deadline expired")]
    Timeout,

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlMutationError {
    /// True for the `NotSupported` variant.
    #[must_use]
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
