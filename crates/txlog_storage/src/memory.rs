//! In-memory content store for testing.

use crate::content::{Backup, BackupId, ContentStore};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory content store.
///
/// Suitable for unit tests and for ephemeral logs that never need to
/// survive a restart.
///
/// # Example
///
/// ```rust
/// use txlog_storage::{ContentStore, InMemoryContentStore};
///
/// let store = InMemoryContentStore::new();
/// let id = store.put("a.txt", b"old").unwrap();
/// assert_eq!(store.get(&id).unwrap().content, b"old");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    live: RwLock<HashMap<BackupId, Backup>>,
    archived: RwLock<HashMap<String, HashMap<BackupId, Backup>>>,
}

impl InMemoryContentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.read().len()
    }

    /// Returns true if there are no live snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.read().is_empty()
    }

    /// Returns the number of archived snapshots across all transactions.
    #[must_use]
    pub fn archived_len(&self) -> usize {
        self.archived.read().values().map(HashMap::len).sum()
    }
}

impl ContentStore for InMemoryContentStore {
    fn put(&self, path: &str, content: &[u8]) -> StorageResult<BackupId> {
        let backup = Backup::new(path, content.to_vec());
        let id = backup.id.clone();
        let mut live = self.live.write();
        if live.contains_key(&id) {
            return Err(StorageError::Corrupted(format!("backup id collision: {id}")));
        }
        live.insert(id.clone(), backup);
        Ok(id)
    }

    fn get(&self, id: &BackupId) -> StorageResult<Backup> {
        self.live
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::backup_not_found(id.as_str()))
    }

    fn contains(&self, id: &BackupId) -> bool {
        self.live.read().contains_key(id)
    }

    fn archive(&self, ids: &[BackupId], transaction_id: &str) -> StorageResult<usize> {
        let mut live = self.live.write();
        let mut archived = self.archived.write();
        let area = archived.entry(transaction_id.to_string()).or_default();
        let mut moved = 0;
        for id in ids {
            if let Some(backup) = live.remove(id) {
                area.insert(id.clone(), backup);
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn get_archived(&self, transaction_id: &str, id: &BackupId) -> StorageResult<Backup> {
        self.archived
            .read()
            .get(transaction_id)
            .and_then(|area| area.get(id))
            .cloned()
            .ok_or_else(|| StorageError::backup_not_found(id.as_str()))
    }

    fn delete(&self, ids: &[BackupId]) -> StorageResult<usize> {
        let mut live = self.live.write();
        Ok(ids.iter().filter(|id| live.remove(*id).is_some()).count())
    }

    fn purge_archive(&self, transaction_id: &str) -> StorageResult<usize> {
        Ok(self
            .archived
            .write()
            .remove(transaction_id)
            .map_or(0, |area| area.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_round_trip() {
        let store = InMemoryContentStore::new();
        let id = store.put("a.txt", b"content").unwrap();
        assert_eq!(store.get(&id).unwrap().content, b"content");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn archive_moves_out_of_live_set() {
        let store = InMemoryContentStore::new();
        let id = store.put("a.txt", b"content").unwrap();

        assert_eq!(store.archive(&[id.clone()], "txn").unwrap(), 1);
        assert!(store.is_empty());
        assert_eq!(store.archived_len(), 1);
        assert!(store.get_archived("txn", &id).is_ok());
        assert_eq!(store.purge_archive("txn").unwrap(), 1);
        assert_eq!(store.archived_len(), 0);
    }

    #[test]
    fn delete_counts_existing_only() {
        let store = InMemoryContentStore::new();
        let id = store.put("a.txt", b"x").unwrap();
        assert_eq!(store.delete(&[id.clone(), BackupId::new("nope")]).unwrap(), 1);
        assert!(store.get(&id).unwrap_err().is_not_found());
    }
}
