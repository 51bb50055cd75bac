//! Error types for txlog core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use txlog_storage::StorageError;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in txlog core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No transaction exists under the id, neither in memory nor on disk.
    #[error("transaction not found: {id}")]
    TransactionNotFound {
        /// The requested transaction id.
        id: String,
    },

    /// The transaction has already reached a terminal state.
    #[error("transaction {id} is not active (status: {status})")]
    TransactionNotActive {
        /// The transaction id.
        id: String,
        /// The terminal status it is in.
        status: String,
    },

    /// A record failed structural validation and was not persisted.
    #[error("invalid transaction state: {message}")]
    InvalidTransactionState {
        /// Description of the violated rule.
        message: String,
    },

    /// A referenced backup does not exist.
    #[error("backup not found: {id}")]
    BackupNotFound {
        /// The backup id.
        id: String,
    },

    /// The storage medium refused a write.
    #[error("storage write failed for {}: {source}", path.display())]
    StorageWrite {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The storage medium refused a read.
    #[error("storage read failed for {}: {source}", path.display())]
    StorageRead {
        /// The path being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A persisted document could not be decoded.
    #[error("corrupted data: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Another active transaction holds the advisory lock on a target.
    #[error("target {target} is locked by transaction {holder}")]
    TargetLocked {
        /// The resolved target path.
        target: String,
        /// The transaction holding the lock.
        holder: String,
    },

    /// A rollback stopped at its first failure.
    #[error("rollback of {id} aborted at operation {operation_id}: {reason}")]
    RollbackAborted {
        /// The transaction id.
        id: String,
        /// The operation that failed.
        operation_id: String,
        /// Why the undo failed.
        reason: String,
    },
}

impl CoreError {
    /// Creates a transaction-not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::TransactionNotFound { id: id.into() }
    }

    /// Creates a transaction-not-active error.
    pub fn not_active(id: impl Into<String>, status: impl ToString) -> Self {
        Self::TransactionNotActive {
            id: id.into(),
            status: status.to_string(),
        }
    }

    /// Creates an invalid-state (validation) error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidTransactionState {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates a storage write error.
    pub fn storage_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StorageWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a storage read error.
    pub fn storage_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StorageRead {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors a rollback downgrades to a warning.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BackupNotFound { .. })
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Write { path, source } => Self::StorageWrite { path, source },
            StorageError::Read { path, source } => Self::StorageRead { path, source },
            StorageError::BackupNotFound { id } => Self::BackupNotFound { id },
            StorageError::Corrupted(message) => Self::Corrupted { message },
            StorageError::Serialization(e) => Self::Corrupted {
                message: e.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::corrupted(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_onto_core_taxonomy() {
        let err: CoreError = StorageError::backup_not_found("abc").into();
        assert!(matches!(err, CoreError::BackupNotFound { ref id } if id == "abc"));
        assert!(err.is_recoverable());

        let io = io::Error::new(io::ErrorKind::PermissionDenied, "read-only");
        let err: CoreError = StorageError::write("/tmp/x", io).into();
        assert!(matches!(err, CoreError::StorageWrite { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn not_active_reports_status() {
        let err = CoreError::not_active("txn-1", "committed");
        assert_eq!(
            err.to_string(),
            "transaction txn-1 is not active (status: committed)"
        );
    }
}
