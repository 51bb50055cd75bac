//! Operation log configuration.

use std::path::{Path, PathBuf};

/// Configuration for a [`crate::TransactionManager`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory relative operation targets resolve against.
    ///
    /// `None` resolves them against the process working directory.
    pub workspace_root: Option<PathBuf>,

    /// Age in days after which finished transactions are swept.
    pub retention_days: u32,

    /// Whether rollbacks keep going past a failed undo by default.
    pub continue_on_error: bool,

    /// Whether targets are claimed by the recording transaction.
    pub lock_targets: bool,

    /// Whether every persisted document is fsynced.
    pub sync_writes: bool,

    /// Default for the advisory `rollback_on_error` flag of new transactions.
    pub rollback_on_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_root: None,
            retention_days: 30,
            continue_on_error: false,
            lock_targets: false,
            sync_writes: true,
            rollback_on_error: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the workspace root.
    #[must_use]
    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Sets the retention window in days.
    #[must_use]
    pub const fn retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Sets the default rollback error policy.
    #[must_use]
    pub const fn continue_on_error(mut self, value: bool) -> Self {
        self.continue_on_error = value;
        self
    }

    /// Enables or disables per-target advisory locks.
    #[must_use]
    pub const fn lock_targets(mut self, value: bool) -> Self {
        self.lock_targets = value;
        self
    }

    /// Sets whether to fsync on every persist.
    #[must_use]
    pub const fn sync_writes(mut self, value: bool) -> Self {
        self.sync_writes = value;
        self
    }

    /// Sets the default `rollback_on_error` flag.
    #[must_use]
    pub const fn rollback_on_error(mut self, value: bool) -> Self {
        self.rollback_on_error = value;
        self
    }

    /// Resolves an operation target to a filesystem path.
    ///
    /// Absolute targets are returned unchanged.
    #[must_use]
    pub fn resolve_target(&self, target: &str) -> PathBuf {
        let path = Path::new(target);
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
