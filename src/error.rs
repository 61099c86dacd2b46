//! Errors returned by versioned writes.

use thiserror::Error;

use crate::mvcc::TxnId;

/// Result alias for versioned operations.
pub type MvccResult<T> = Result<T, MvccError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MvccError {
    /// The key has no live version to update or delete.
    #[error("key not found")]
    KeyNotFound,
    /// Versions on a chain must strictly increase.
    #[error("version {attempted} is not newer than chain head {head}")]
    NonMonotonicVersion { head: TxnId, attempted: TxnId },
    /// The key was already deleted at `version`.
    #[error("key already deleted at version {version}")]
    AlreadyDeleted { version: TxnId },
}
