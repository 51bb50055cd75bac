//! File-based content store.

use crate::atomic::{self, create_dir_all, read_optional, remove_optional, sync_dir, write_new};
use crate::content::{Backup, BackupId, ContentStore};
use crate::error::{StorageError, StorageResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the archive area inside the backup directory.
pub const ARCHIVE_DIR: &str = "archive";
/// Extension of backup envelope files.
const ENVELOPE_EXT: &str = "json";

/// A content store keeping one JSON envelope per backup.
///
/// Layout:
///
/// ```text
/// <root>/
/// ├─ <backupId>.json              # live snapshots
/// └─ archive/
///    └─ <transactionId>/
///       └─ <backupId>.json        # snapshots of committed transactions
/// ```
///
/// # Durability
///
/// With `sync` enabled, every envelope and every directory change is
/// fsynced before the call returns.
///
/// # Example
///
/// ```no_run
/// use txlog_storage::{ContentStore, FileContentStore};
/// use std::path::Path;
///
/// let store = FileContentStore::open(Path::new("backups"), true).unwrap();
/// let id = store.put("src/main.rs", b"fn main() {}").unwrap();
/// assert_eq!(store.get(&id).unwrap().content, b"fn main() {}");
/// ```
#[derive(Debug)]
pub struct FileContentStore {
    root: PathBuf,
    sync: bool,
}

impl FileContentStore {
    /// Opens or creates a content store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `Write` if the directories cannot be created.
    pub fn open(root: &Path, sync: bool) -> StorageResult<Self> {
        create_dir_all(&root.join(ARCHIVE_DIR))?;
        Ok(Self {
            root: root.to_path_buf(),
            sync,
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the archive directory of `transaction_id`.
    #[must_use]
    pub fn archive_dir(&self, transaction_id: &str) -> PathBuf {
        self.root.join(ARCHIVE_DIR).join(transaction_id)
    }

    fn live_path(&self, id: &BackupId) -> StorageResult<PathBuf> {
        if !id.is_well_formed() {
            return Err(StorageError::backup_not_found(id.as_str()));
        }
        Ok(self.root.join(format!("{}.{ENVELOPE_EXT}", id.as_str())))
    }

    fn archived_path(&self, transaction_id: &str, id: &BackupId) -> StorageResult<PathBuf> {
        if !id.is_well_formed() || !BackupId::new(transaction_id).is_well_formed() {
            return Err(StorageError::backup_not_found(id.as_str()));
        }
        Ok(self
            .archive_dir(transaction_id)
            .join(format!("{}.{ENVELOPE_EXT}", id.as_str())))
    }

    fn read_envelope(path: &Path, id: &BackupId) -> StorageResult<Backup> {
        let data =
            read_optional(path)?.ok_or_else(|| StorageError::backup_not_found(id.as_str()))?;
        let backup = Backup::from_json(&data)?;
        if &backup.id != id {
            return Err(StorageError::Corrupted(format!(
                "envelope {} holds backup {}",
                path.display(),
                backup.id
            )));
        }
        Ok(backup)
    }
}

impl ContentStore for FileContentStore {
    fn put(&self, path: &str, content: &[u8]) -> StorageResult<BackupId> {
        // A fresh nonce goes into every id, so a collision only happens if
        // the file was planted by someone else. Retry once with a new id.
        for _ in 0..2 {
            let backup = Backup::new(path, content.to_vec());
            let target = self.live_path(&backup.id)?;
            if write_new(&target, &backup.to_json()?, self.sync)? {
                return Ok(backup.id);
            }
        }
        Err(StorageError::write(
            &self.root,
            io::Error::new(io::ErrorKind::AlreadyExists, "backup id collision"),
        ))
    }

    fn get(&self, id: &BackupId) -> StorageResult<Backup> {
        Self::read_envelope(&self.live_path(id)?, id)
    }

    fn contains(&self, id: &BackupId) -> bool {
        self.live_path(id).map(|p| p.is_file()).unwrap_or(false)
    }

    fn archive(&self, ids: &[BackupId], transaction_id: &str) -> StorageResult<usize> {
        // Copy everything first so a failure part-way leaves every live
        // snapshot untouched; only then drop the originals.
        let mut moved = Vec::with_capacity(ids.len());
        for id in ids {
            let source = self.live_path(id)?;
            let Some(data) = read_optional(&source)? else {
                continue;
            };
            let dest = self.archived_path(transaction_id, id)?;
            atomic::write_atomic(&dest, &data, self.sync)?;
            moved.push(source);
        }

        for source in &moved {
            remove_optional(source)?;
        }
        if self.sync && !moved.is_empty() {
            sync_dir(&self.root)?;
        }
        Ok(moved.len())
    }

    fn get_archived(&self, transaction_id: &str, id: &BackupId) -> StorageResult<Backup> {
        Self::read_envelope(&self.archived_path(transaction_id, id)?, id)
    }

    fn delete(&self, ids: &[BackupId]) -> StorageResult<usize> {
        let mut deleted = 0;
        for id in ids {
            if remove_optional(&self.live_path(id)?)? {
                deleted += 1;
            }
        }
        if self.sync && deleted > 0 {
            sync_dir(&self.root)?;
        }
        Ok(deleted)
    }

    fn purge_archive(&self, transaction_id: &str) -> StorageResult<usize> {
        if !BackupId::new(transaction_id).is_well_formed() {
            return Ok(0);
        }
        let dir = self.archive_dir(transaction_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorageError::read(&dir, e)),
        };
        let count = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == ENVELOPE_EXT)
            })
            .count();

        fs::remove_dir_all(&dir).map_err(|e| StorageError::write(&dir, e))?;
        if self.sync {
            sync_dir(&self.root.join(ARCHIVE_DIR))?;
        }
        Ok(count)
    }
}
