//! JSON-file transaction store.

use super::{newest_first, TransactionStore};
use crate::dir::LogDir;
use crate::error::{CoreError, CoreResult};
use crate::record::TransactionRecord;
use crate::types::TransactionId;
use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;
use txlog_storage::atomic::{read_optional, remove_optional, sync_dir, write_atomic};

/// A transaction store keeping one pretty-printed JSON file per record.
///
/// Records are written with write-then-rename, so a crash mid-save leaves
/// the previous version intact.
#[derive(Debug, Clone)]
pub struct FileTransactionStore {
    dir: LogDir,
    sync: bool,
}

impl FileTransactionStore {
    /// Creates a store over an opened log directory.
    #[must_use]
    pub fn new(dir: LogDir, sync: bool) -> Self {
        Self { dir, sync }
    }

    /// Returns the log directory.
    #[must_use]
    pub fn dir(&self) -> &LogDir {
        &self.dir
    }

    fn checked(id: &TransactionId) -> CoreResult<&str> {
        if id.is_well_formed() {
            Ok(id.as_str())
        } else {
            Err(CoreError::invalid_state(format!(
                "malformed transaction id: {:?}",
                id.as_str()
            )))
        }
    }

    fn read_record(path: &Path) -> CoreResult<Option<TransactionRecord>> {
        let Some(data) = read_optional(path)? else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&data).map_err(|e| {
            CoreError::corrupted(format!("{}: {e}", path.display()))
        })?;
        Ok(Some(record))
    }

    fn write_record(&self, path: &Path, record: &TransactionRecord) -> CoreResult<()> {
        let mut data = serde_json::to_vec_pretty(record)?;
        data.push(b'\n');
        write_atomic(path, &data, self.sync)?;
        Ok(())
    }
}

impl TransactionStore for FileTransactionStore {
    fn save(&self, record: &TransactionRecord) -> CoreResult<()> {
        let id = Self::checked(&record.id)?;
        self.write_record(&self.dir.record_path(id), record)
    }

    fn load(&self, id: &TransactionId) -> CoreResult<Option<TransactionRecord>> {
        let id = Self::checked(id)?;
        Self::read_record(&self.dir.record_path(id))
    }

    fn list(&self, limit: Option<usize>) -> CoreResult<Vec<TransactionRecord>> {
        let mut records = Vec::new();
        for id in self.dir.record_ids()? {
            match Self::read_record(&self.dir.record_path(&id)) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                // One unreadable file must not hide every other transaction.
                Err(CoreError::Corrupted { message }) => {
                    warn!(txn = %id, %message, "skipping unreadable transaction record");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(newest_first(records, limit))
    }

    fn archive(&self, record: &TransactionRecord) -> CoreResult<()> {
        let id = Self::checked(&record.id)?;
        self.write_record(&self.dir.archived_record_path(id), record)
    }

    fn load_archived(&self, id: &TransactionId) -> CoreResult<Option<TransactionRecord>> {
        let id = Self::checked(id)?;
        Self::read_record(&self.dir.archived_record_path(id))
    }

    fn delete(&self, id: &TransactionId) -> CoreResult<bool> {
        let id = Self::checked(id)?;
        let removed = remove_optional(&self.dir.record_path(id))?;

        let archive = self.dir.archive_dir(id);
        let archived = match fs::remove_dir_all(&archive) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(CoreError::storage_write(&archive, e)),
        };

        if self.sync && (removed || archived) {
            sync_dir(&self.dir.transactions_dir())?;
        }
        Ok(removed || archived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TransactionStatus;
    use tempfile::tempdir;

    fn open_store() -> (tempfile::TempDir, FileTransactionStore) {
        let temp = tempdir().unwrap();
        let dir = LogDir::open(temp.path()).unwrap();
        (temp, FileTransactionStore::new(dir, false))
    }

    fn record_at(started_at: u64) -> TransactionRecord {
        TransactionRecord::new(
            TransactionId::generate_at(started_at),
            "refactor",
            "tester",
            started_at,
            true,
        )
    }

    #[test]
    fn save_then_load() {
        let (_temp, store) = open_store();
        let rec = record_at(10);
        store.save(&rec).unwrap();

        assert_eq!(store.load(&rec.id).unwrap(), Some(rec));
    }

    #[test]
    fn save_overwrites_previous_version() {
        let (_temp, store) = open_store();
        let mut rec = record_at(10);
        store.save(&rec).unwrap();
        rec.mark_committed(20).unwrap();
        store.save(&rec).unwrap();

        let loaded = store.load(&rec.id).unwrap().unwrap();
        assert_eq!(loaded.status, TransactionStatus::Committed);
    }

    #[test]
    fn load_missing_is_none() {
        let (_temp, store) = open_store();
        assert!(store.load(&TransactionId::new("txn-none")).unwrap().is_none());
    }

    #[test]
    fn malformed_ids_never_reach_the_filesystem() {
        let (_temp, store) = open_store();
        assert!(store.load(&TransactionId::new("../../etc/passwd")).is_err());
    }

    #[test]
    fn list_is_newest_first_and_limited() {
        let (_temp, store) = open_store();
        for started in [30, 10, 20] {
            store.save(&record_at(started)).unwrap();
        }

        let all = store.list(None).unwrap();
        let starts: Vec<_> = all.iter().map(|r| r.started_at).collect();
        assert_eq!(starts, vec![30, 20, 10]);
        assert_eq!(store.list(Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn list_skips_corrupted_records() {
        let (_temp, store) = open_store();
        store.save(&record_at(10)).unwrap();
        fs::write(store.dir().record_path("txn-broken"), b"{ not json").unwrap();

        assert_eq!(store.list(None).unwrap().len(), 1);
        assert!(matches!(
            store.load(&TransactionId::new("txn-broken")),
            Err(CoreError::Corrupted { .. })
        ));
    }

    #[test]
    fn archive_and_delete() {
        let (_temp, store) = open_store();
        let mut rec = record_at(10);
        rec.mark_committed(11).unwrap();
        store.save(&rec).unwrap();
        store.archive(&rec).unwrap();

        assert!(store.dir().archived_record_path(rec.id.as_str()).is_file());
        assert_eq!(store.load_archived(&rec.id).unwrap(), Some(rec.clone()));
        // The archive copy does not show up in listings.
        assert_eq!(store.list(None).unwrap().len(), 1);

        assert!(store.delete(&rec.id).unwrap());
        assert!(store.load(&rec.id).unwrap().is_none());
        assert!(store.load_archived(&rec.id).unwrap().is_none());
        assert!(!store.delete(&rec.id).unwrap());
    }
}
