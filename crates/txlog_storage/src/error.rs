//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying medium refused a write.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The underlying medium refused a read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The path being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// No backup exists under the requested id.
    #[error("backup not found: {id}")]
    BackupNotFound {
        /// The backup id that was requested.
        id: String,
    },

    /// Stored data is unreadable or fails its integrity check.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Creates a write error for `path`.
    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a read error for `path`.
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a backup-not-found error.
    pub fn backup_not_found(id: impl Into<String>) -> Self {
        Self::BackupNotFound { id: id.into() }
    }

    /// Returns true if this error reports a missing backup.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BackupNotFound { .. })
    }
}
