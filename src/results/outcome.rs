use super::RecordSet;
use crate::error::{NotSupported, SqlMutationError};

/// Generated identifier of the last inserted row, or the reason there is none.
///
/// A missing id always carries its cause and is never reported as zero.
#[derive(Debug, Clone, PartialEq)]
pub enum LastInsertId {
    Value(i64),
    Unavailable(NotSupported),
}

impl LastInsertId {
    #[must_use]
    pub fn value(&self) -> Option<i64> {
        match self {
            LastInsertId::Value(id) => Some(*id),
            LastInsertId::Unavailable(_) => None,
        }
    }
}

impl From<NotSupported> for LastInsertId {
    fn from(reason: NotSupported) -> Self {
        LastInsertId::Unavailable(reason)
    }
}

/// Outcome of one Insert/Update/Delete call.
///
/// `Plain` results come from the native exec path or the automatic primary-key fallback;
/// `WithRecords` results come from an explicit returning request and own the returned rows.
/// For `WithRecords` the affected count is always the number of records.
#[derive(Debug, Clone)]
pub enum MutationResult {
    Plain {
        affected: u64,
        last_insert_id: LastInsertId,
    },
    WithRecords {
        records: RecordSet,
        last_insert_id: LastInsertId,
    },
}

impl MutationResult {
    #[must_use]
    pub fn plain(affected: u64, last_insert_id: impl Into<LastInsertId>) -> Self {
        MutationResult::Plain {
            affected,
            last_insert_id: last_insert_id.into(),
        }
    }

    #[must_use]
    pub fn with_records(records: RecordSet, last_insert_id: impl Into<LastInsertId>) -> Self {
        MutationResult::WithRecords {
            records,
            last_insert_id: last_insert_id.into(),
        }
    }

    /// Number of rows the statement touched.
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        match self {
            MutationResult::Plain { affected, .. } => *affected,
            MutationResult::WithRecords { records, .. } => records.len() as u64,
        }
    }

    /// Identifier generated for the last inserted row.
    ///
    /// # Errors
    ///
    /// Returns [`SqlMutationError::NotSupported`] when the backend or the chosen execution path
    /// could not produce one (for example after an explicit returning request).
    pub fn last_insert_id(&self) -> Result<i64, SqlMutationError> {
        match self.last_insert_id_state() {
            LastInsertId::Value(id) => Ok(*id),
            LastInsertId::Unavailable(reason) => Err(reason.clone().into()),
        }
    }

    #[must_use]
    pub fn last_insert_id_state(&self) -> &LastInsertId {
        match self {
            MutationResult::Plain { last_insert_id, .. }
            | MutationResult::WithRecords { last_insert_id, .. } => last_insert_id,
        }
    }

    /// Returned rows, or `None` when the call carried no returning clause.
    #[must_use]
    pub fn records(&self) -> Option<&RecordSet> {
        match self {
            MutationResult::Plain { .. } => None,
            MutationResult::WithRecords { records, .. } => Some(records),
        }
    }

    #[must_use]
    pub fn has_records(&self) -> bool {
        matches!(self, MutationResult::WithRecords { .. })
    }

    #[must_use]
    pub fn into_records(self) -> Option<RecordSet> {
        match self {
            MutationResult::Plain { .. } => None,
            MutationResult::WithRecords { records, .. } => Some(records),
        }
    }
}
