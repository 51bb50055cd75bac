//! Log directory layout.
//!
//! ```text
//! <data_dir>/
//! ├─ transactions/
//! │  ├─ <id>.json                    # one record per transaction
//! │  └─ archive/<id>/transaction.json  # post-commit copy
//! └─ backups/
//!    ├─ <backupId>.json              # live snapshots
//!    └─ archive/<id>/<backupId>.json  # snapshots of committed transactions
//! ```

use crate::error::{CoreError, CoreResult};
use std::fs;
use std::path::{Path, PathBuf};
use txlog_storage::atomic;

const TRANSACTIONS_DIR: &str = "transactions";
const BACKUPS_DIR: &str = "backups";
const ARCHIVE_DIR: &str = "archive";
const ARCHIVED_RECORD_FILE: &str = "transaction.json";

/// Paths of the on-disk log layout rooted at a data directory.
///
/// There is no lock file: the log assumes a single writer per
/// transaction id and does not coordinate between processes.
#[derive(Debug, Clone)]
pub struct LogDir {
    path: PathBuf,
}

impl LogDir {
    /// Opens or creates the layout under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` exists but is not a directory, or if the
    /// subdirectories cannot be created.
    pub fn open(path: &Path) -> CoreResult<Self> {
        if path.exists() && !path.is_dir() {
            return Err(CoreError::invalid_state(format!(
                "log path is not a directory: {}",
                path.display()
            )));
        }
        let dir = Self {
            path: path.to_path_buf(),
        };
        atomic::create_dir_all(&dir.transaction_archive_root())?;
        atomic::create_dir_all(&dir.backups_dir().join(ARCHIVE_DIR))?;
        Ok(dir)
    }

    /// Returns the data directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the directory holding transaction records.
    #[must_use]
    pub fn transactions_dir(&self) -> PathBuf {
        self.path.join(TRANSACTIONS_DIR)
    }

    /// Returns the directory holding backups.
    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.path.join(BACKUPS_DIR)
    }

    /// Returns the root of the transaction archive.
    #[must_use]
    pub fn transaction_archive_root(&self) -> PathBuf {
        self.transactions_dir().join(ARCHIVE_DIR)
    }

    /// Returns the path of the record file of `id`.
    #[must_use]
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.transactions_dir().join(format!("{id}.json"))
    }

    /// Returns the archive directory of `id`.
    #[must_use]
    pub fn archive_dir(&self, id: &str) -> PathBuf {
        self.transaction_archive_root().join(id)
    }

    /// Returns the path of the archived record copy of `id`.
    #[must_use]
    pub fn archived_record_path(&self, id: &str) -> PathBuf {
        self.archive_dir(id).join(ARCHIVED_RECORD_FILE)
    }

    /// Lists the ids of all record files, in no particular order.
    pub fn record_ids(&self) -> CoreResult<Vec<String>> {
        let dir = self.transactions_dir();
        let entries = fs::read_dir(&dir).map_err(|e| CoreError::storage_read(&dir, e))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::storage_read(&dir, e))?;
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_layout() {
        let temp = tempdir().unwrap();
        let dir = LogDir::open(&temp.path().join("log")).unwrap();

        assert!(dir.transactions_dir().is_dir());
        assert!(dir.transaction_archive_root().is_dir());
        assert!(dir.backups_dir().join("archive").is_dir());
    }

    #[test]
    fn open_rejects_files() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("plain");
        fs::write(&file, b"x").unwrap();
        assert!(LogDir::open(&file).is_err());
    }

    #[test]
    fn paths_are_correct() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("log");
        let dir = LogDir::open(&root).unwrap();

        assert_eq!(dir.record_path("t1"), root.join("transactions/t1.json"));
        assert_eq!(
            dir.archived_record_path("t1"),
            root.join("transactions/archive/t1/transaction.json")
        );
    }

    #[test]
    fn record_ids_skip_archive_and_temp_files() {
        let temp = tempdir().unwrap();
        let dir = LogDir::open(temp.path()).unwrap();
        fs::write(dir.record_path("t1"), b"{}").unwrap();
        fs::write(dir.transactions_dir().join("t2.json.tmp"), b"{}").unwrap();

        assert_eq!(dir.record_ids().unwrap(), vec!["t1".to_string()]);
    }
}
