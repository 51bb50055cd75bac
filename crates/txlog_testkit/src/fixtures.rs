//! Test fixtures.
//!
//! A [`TestLog`] owns a temporary directory holding both the workspace the
//! transactions mutate (`work/`) and the log data directory (`log/`).

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use txlog_core::{
    ActiveRegistry, BeginOptions, Config, ContentStore, InMemoryTransactionStore,
    TransactionId, TransactionManager, TransactionStore, MILLIS_PER_DAY,
};

/// A manager over a throwaway workspace, cleaned up on drop.
pub struct TestLog {
    /// The manager under test.
    pub manager: TransactionManager,
    temp_dir: TempDir,
}

impl TestLog {
    /// Creates a file-backed log with default settings.
    pub fn file() -> Self {
        Self::file_with(Config::default())
    }

    /// Creates a file-backed log with `config`.
    ///
    /// The workspace root is always set to the fixture's `work/` directory.
    pub fn file_with(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Self::prepare(&temp_dir, config);
        let manager = TransactionManager::open(&temp_dir.path().join("log"), config)
            .expect("Failed to open operation log");
        Self { manager, temp_dir }
    }

    /// Creates a log whose records and backups live in memory.
    pub fn memory() -> Self {
        Self::memory_with(Config::default())
    }

    /// Creates an in-memory log with `config`.
    pub fn memory_with(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Self::prepare(&temp_dir, config);
        Self {
            manager: TransactionManager::in_memory(config),
            temp_dir,
        }
    }

    /// Creates a log over a custom content store, e.g. a fault injector.
    pub fn with_content(content: Arc<dyn ContentStore>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Self::prepare(&temp_dir, Config::default());
        let manager = TransactionManager::with_stores(
            config,
            Arc::new(InMemoryTransactionStore::new()),
            content,
            Arc::new(ActiveRegistry::new()),
        );
        Self { manager, temp_dir }
    }

    fn prepare(temp_dir: &TempDir, config: Config) -> Config {
        let work = temp_dir.path().join("work");
        fs::create_dir_all(&work).expect("Failed to create workspace");
        config.workspace_root(work).sync_writes(false)
    }

    /// Opens a second manager over the same directories, as a new process
    /// would after a crash. Only meaningful for file-backed logs.
    pub fn reopen(&self) -> TransactionManager {
        TransactionManager::open(&self.log_dir(), self.manager.config().clone())
            .expect("Failed to reopen operation log")
    }

    /// Returns the log data directory.
    pub fn log_dir(&self) -> PathBuf {
        self.temp_dir.path().join("log")
    }

    /// Returns the absolute path of a workspace file.
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("work").join(name)
    }

    /// Writes a workspace file, creating parent directories.
    pub fn write(&self, name: &str, content: &str) {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(path, content).expect("Failed to write workspace file");
    }

    /// Reads a workspace file, or `None` if it does not exist.
    pub fn read(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.path(name)).ok()
    }

    /// Returns true if a workspace file exists.
    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// Removes a workspace file.
    pub fn remove(&self, name: &str) {
        fs::remove_file(self.path(name)).expect("Failed to remove workspace file");
    }

    /// Begins a transaction with a fixed actor.
    pub fn begin(&self, kind: &str) -> TransactionId {
        self.manager
            .begin_transaction(BeginOptions::new(kind).actor("testkit"))
            .expect("Failed to begin transaction")
    }

    /// Moves the start time of a stored transaction `days` into the past.
    pub fn backdate(&self, id: &TransactionId, days: u64) {
        let store = self.manager.store();
        let mut record = store
            .load(id)
            .expect("Failed to load transaction")
            .expect("Transaction not found");
        let shift = days * MILLIS_PER_DAY;
        record.started_at -= shift;
        if let Some(ended_at) = record.ended_at.as_mut() {
            *ended_at -= shift;
        }
        store.save(&record).expect("Failed to save transaction");
    }
}

impl std::ops::Deref for TestLog {
    type Target = TransactionManager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

/// Runs a test against a fresh file-backed log.
pub fn with_test_log<F, R>(f: F) -> R
where
    F: FnOnce(&TestLog) -> R,
{
    let log = TestLog::file();
    f(&log)
}
