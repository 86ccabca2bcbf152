use std::io;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors surfaced by the catalog store, allocator and repairer.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The allocator could not take the write lock (or kept losing the race)
    /// within its bounded attempts. Callers may retry the whole creation.
    #[error("identifier allocation contended after {attempts} attempts")]
    AllocationContention { attempts: u32 },

    #[error("management id {management_id} already assigned in partition {partition_key:?}")]
    DuplicateIdentifier {
        management_id: String,
        partition_key: Option<String>,
    },

    #[error("management id of record {record_id} is already assigned and cannot change")]
    AppendOnlyViolation { record_id: String },

    #[error("record not found: {record_id}")]
    RecordNotFound { record_id: String },

    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CatalogError {
    /// Whether the caller can safely retry the operation that produced this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AllocationContention { .. } => true,
            Self::Sqlite(err) => is_lock_contention(err),
            _ => false,
        }
    }
}

/// `SQLITE_BUSY` / `SQLITE_LOCKED`: another connection holds the write lock.
pub(crate) fn is_lock_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Unique index rejected the write.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    extended_code(err) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
}

/// A `RAISE(ABORT, ..)` trigger rejected the write.
pub(crate) fn is_trigger_abort(err: &rusqlite::Error) -> bool {
    extended_code(err) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_TRIGGER)
}

fn extended_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => Some(failure.extended_code),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contention_is_retryable() {
        let err = CatalogError::AllocationContention { attempts: 5 };
        assert!(err.is_retryable());
    }

    #[test]
    fn duplicate_is_not_retryable_for_callers() {
        let err = CatalogError::DuplicateIdentifier {
            management_id: "251227-01".into(),
            partition_key: None,
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("251227-01"));
    }
}
