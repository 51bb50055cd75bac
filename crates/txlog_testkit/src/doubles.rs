//! Test doubles for hooks and content stores.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use txlog_core::{Backup, HookError, Operation, RestoreHook};
use txlog_storage::{BackupId, ContentStore, InMemoryContentStore, StorageError, StorageResult};

/// One restore call seen by a [`RecordingHook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCall {
    /// Target of the restored operation.
    pub target: String,
    /// Whether a backup was handed to the hook.
    pub had_backup: bool,
}

/// Restore hook that records every call into a shared journal.
///
/// Several hooks can share one journal, which makes the global restore
/// order observable across kinds.
#[derive(Debug, Clone, Default)]
pub struct RecordingHook {
    journal: Arc<Mutex<Vec<HookCall>>>,
    fail_on: Option<String>,
}

impl RecordingHook {
    /// Creates a hook with its own journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hook writing to `journal`.
    pub fn sharing(journal: Arc<Mutex<Vec<HookCall>>>) -> Self {
        Self {
            journal,
            fail_on: None,
        }
    }

    /// Makes the hook fail for `target`, after journaling the call.
    #[must_use]
    pub fn failing_on(mut self, target: impl Into<String>) -> Self {
        self.fail_on = Some(target.into());
        self
    }

    /// Returns the shared journal.
    pub fn journal(&self) -> Arc<Mutex<Vec<HookCall>>> {
        Arc::clone(&self.journal)
    }

    /// Returns the restored targets in call order.
    pub fn targets(&self) -> Vec<String> {
        self.journal.lock().iter().map(|c| c.target.clone()).collect()
    }
}

impl RestoreHook for RecordingHook {
    fn restore(&self, operation: &Operation, backup: Option<&Backup>) -> Result<(), HookError> {
        self.journal.lock().push(HookCall {
            target: operation.target.clone(),
            had_backup: backup.is_some(),
        });
        match &self.fail_on {
            Some(target) if *target == operation.target => {
                Err(HookError::new(format!("refusing to restore {target}")))
            }
            _ => Ok(()),
        }
    }
}

/// Content store that fails reads of chosen backups with an I/O error.
///
/// Everything else is delegated to an [`InMemoryContentStore`].
#[derive(Debug, Default)]
pub struct FaultyContentStore {
    inner: InMemoryContentStore,
    unreadable: Mutex<HashSet<BackupId>>,
}

impl FaultyContentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `get` of `id` fail from now on.
    pub fn break_backup(&self, id: &BackupId) {
        self.unreadable.lock().insert(id.clone());
    }
}

impl ContentStore for FaultyContentStore {
    fn put(&self, path: &str, content: &[u8]) -> StorageResult<BackupId> {
        self.inner.put(path, content)
    }

    fn get(&self, id: &BackupId) -> StorageResult<Backup> {
        if self.unreadable.lock().contains(id) {
            return Err(StorageError::read(
                id.as_str(),
                io::Error::new(io::ErrorKind::PermissionDenied, "injected read failure"),
            ));
        }
        self.inner.get(id)
    }

    fn contains(&self, id: &BackupId) -> bool {
        self.inner.contains(id)
    }

    fn archive(&self, ids: &[BackupId], transaction_id: &str) -> StorageResult<usize> {
        self.inner.archive(ids, transaction_id)
    }

    fn get_archived(&self, transaction_id: &str, id: &BackupId) -> StorageResult<Backup> {
        self.inner.get_archived(transaction_id, id)
    }

    fn delete(&self, ids: &[BackupId]) -> StorageResult<usize> {
        self.inner.delete(ids)
    }

    fn purge_archive(&self, transaction_id: &str) -> StorageResult<usize> {
        self.inner.purge_archive(transaction_id)
    }
}
