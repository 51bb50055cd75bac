//! Transaction manager.

use crate::config::Config;
use crate::dir::LogDir;
use crate::error::{CoreError, CoreResult};
use crate::hooks::{HookRegistry, RestoreHook};
use crate::record::{
    CommitSummary, Operation, OperationAction, OperationKind, OperationOutcome, RollbackOutcome,
    TransactionRecord,
};
use crate::registry::ActiveRegistry;
use crate::retention::{RetentionSweeper, SweepReport};
use crate::store::{FileTransactionStore, InMemoryTransactionStore, TransactionStore};
use crate::types::{now_millis, OperationId, TransactionId};
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use txlog_storage::atomic::restore_file;
use txlog_storage::{Backup, BackupId, ContentStore, FileContentStore, InMemoryContentStore};

/// Options for [`TransactionManager::begin_transaction`].
#[derive(Debug, Clone)]
pub struct BeginOptions {
    /// Label of the triggering operation class.
    pub kind: String,
    /// Invoking user or process. Defaults to the login name, or `system`.
    pub actor: Option<String>,
    /// Advisory retry flag. Defaults to [`Config::rollback_on_error`].
    pub rollback_on_error: Option<bool>,
}

impl BeginOptions {
    /// Creates options for a transaction of `kind`.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            actor: None,
            rollback_on_error: None,
        }
    }

    /// Sets the actor.
    #[must_use]
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Sets the advisory `rollback_on_error` flag.
    #[must_use]
    pub fn rollback_on_error(mut self, value: bool) -> Self {
        self.rollback_on_error = Some(value);
        self
    }
}

/// A mutation the caller is about to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    /// Kind of mutation.
    pub kind: OperationKind,
    /// Resource being mutated.
    pub target: String,
    /// Payload that will be written, kept for audit.
    pub content: Option<String>,
}

impl OperationRequest {
    /// Creates a request.
    pub fn new(kind: OperationKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            content: None,
        }
    }

    /// A file is about to be created with `content`.
    pub fn create(target: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(OperationKind::Create, target).with_content(content)
    }

    /// A file is about to be overwritten with `content`.
    pub fn update(target: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(OperationKind::Update, target).with_content(content)
    }

    /// A file is about to be deleted.
    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(OperationKind::Delete, target)
    }

    /// A manifest is about to change.
    pub fn manifest_update(target: impl Into<String>) -> Self {
        Self::new(OperationKind::ManifestUpdate, target)
    }

    /// Externally owned metadata is about to change.
    pub fn metadata_update(target: impl Into<String>) -> Self {
        Self::new(OperationKind::MetadataUpdate, target)
    }

    /// Attaches the payload.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Options for [`TransactionManager::rollback_transaction`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RollbackOptions {
    /// Keep undoing after a failure. Defaults to [`Config::continue_on_error`].
    pub continue_on_error: Option<bool>,
}

impl RollbackOptions {
    /// Sets the error policy for this rollback.
    #[must_use]
    pub const fn continue_on_error(mut self, value: bool) -> Self {
        self.continue_on_error = Some(value);
        self
    }
}

/// Result of undoing one operation.
enum Undo {
    Done(String),
    Warning(String),
    Failed(String),
}

/// Records file mutations and commits or rolls them back as a batch.
///
/// The manager provides:
/// - Durable records: every state change is persisted before it returns
/// - Snapshots of prior state before destructive operations
/// - Strict reverse-order, best-effort rollback
/// - Crash recovery: any transaction can be reloaded from the store
///
/// ## Caller Contract
///
/// `record_operation` must be called *before* the caller mutates the
/// target. Recording afterwards snapshots the new state and turns the
/// rollback into a no-op; the manager cannot detect this.
///
/// ## Concurrency
///
/// Mutating calls are serialized by an internal lock. There is no
/// coordination with other processes, and two transactions touching the
/// same target race unless [`Config::lock_targets`] is enabled.
pub struct TransactionManager {
    config: Config,
    store: Arc<dyn TransactionStore>,
    content: Arc<dyn ContentStore>,
    registry: Arc<ActiveRegistry>,
    hooks: HookRegistry,
    /// Serializes record/commit/rollback.
    write_lock: Mutex<()>,
}

impl TransactionManager {
    /// Opens a file-backed log rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout cannot be created.
    pub fn open(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = LogDir::open(path)?;
        let content = FileContentStore::open(&dir.backups_dir(), config.sync_writes)?;
        let store = FileTransactionStore::new(dir, config.sync_writes);
        info!(path = %path.display(), "opened operation log");
        Ok(Self::with_stores(
            config,
            Arc::new(store),
            Arc::new(content),
            Arc::new(ActiveRegistry::new()),
        ))
    }

    /// Creates a log whose records and backups live only in memory.
    ///
    /// Targets are still real files; only the bookkeeping is ephemeral.
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        Self::with_stores(
            config,
            Arc::new(InMemoryTransactionStore::new()),
            Arc::new(InMemoryContentStore::new()),
            Arc::new(ActiveRegistry::new()),
        )
    }

    /// Creates a manager over explicit stores and registry.
    #[must_use]
    pub fn with_stores(
        config: Config,
        store: Arc<dyn TransactionStore>,
        content: Arc<dyn ContentStore>,
        registry: Arc<ActiveRegistry>,
    ) -> Self {
        Self {
            config,
            store,
            content,
            registry,
            hooks: HookRegistry::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the transaction store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }

    /// Returns the content store.
    #[must_use]
    pub fn content(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    /// Returns the active-transaction registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ActiveRegistry> {
        &self.registry
    }

    /// Registers the restore hook for a structured operation kind.
    pub fn register_hook(&self, kind: OperationKind, hook: Arc<dyn RestoreHook>) -> CoreResult<()> {
        self.hooks.register(kind, hook)
    }

    /// Begins a transaction and persists it immediately.
    ///
    /// A crash right after this call still leaves a discoverable active
    /// record behind.
    pub fn begin_transaction(&self, options: BeginOptions) -> CoreResult<TransactionId> {
        let now = now_millis();
        let actor = options.actor.unwrap_or_else(default_actor);
        let record = TransactionRecord::new(
            TransactionId::generate_at(now),
            options.kind,
            actor,
            now,
            options
                .rollback_on_error
                .unwrap_or(self.config.rollback_on_error),
        );

        self.persist(&record)?;
        let id = record.id.clone();
        info!(txn = %id, kind = %record.kind, actor = %record.actor, "transaction started");
        self.registry.insert(record);
        Ok(id)
    }

    /// Records an operation the caller is about to perform.
    ///
    /// For every kind except `create`, the current content of the target
    /// is snapshotted first. A target that does not exist yet is recorded
    /// without a backup; the rollback later reports it as a warning.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound` / `TransactionNotActive`
    /// - `TargetLocked` if target locking is on and another transaction
    ///   holds the target
    /// - storage errors from the snapshot or the persist
    pub fn record_operation(
        &self,
        id: &TransactionId,
        request: OperationRequest,
    ) -> CoreResult<OperationId> {
        let _guard = self.write_lock.lock();
        let mut record = self.fetch(id)?;
        record.ensure_active()?;

        if request.target.trim().is_empty() {
            return Err(CoreError::invalid_state("operation target is empty"));
        }
        let resolved = self.config.resolve_target(&request.target);
        let claimed = if self.config.lock_targets {
            self.registry
                .claim_target(&resolved, id)
                .map_err(|holder| CoreError::TargetLocked {
                    target: resolved.display().to_string(),
                    holder: holder.to_string(),
                })?
        } else {
            false
        };

        let kind = request.kind;
        match self.append_operation(&mut record, request, &resolved) {
            Ok(operation_id) => {
                debug!(
                    txn = %id,
                    op = %operation_id,
                    %kind,
                    target = %resolved.display(),
                    "operation recorded"
                );
                self.registry.insert(record);
                Ok(operation_id)
            }
            Err(e) => {
                // Nothing was recorded, so a claim taken for it must not linger.
                if claimed {
                    self.registry.release_target(&resolved, id);
                }
                Err(e)
            }
        }
    }

    /// Snapshots the target, appends the operation and persists `record`.
    fn append_operation(
        &self,
        record: &mut TransactionRecord,
        request: OperationRequest,
        resolved: &Path,
    ) -> CoreResult<OperationId> {
        let backup_id = if request.kind.captures_backup() {
            self.snapshot(&request.target, resolved)?
        } else {
            None
        };

        let operation = Operation {
            id: record.next_operation_id(),
            timestamp: now_millis(),
            target: request.target,
            action: OperationAction::new(request.kind, backup_id.clone()),
            new_state: request.content,
        };
        let operation_id = operation.id.clone();

        let appended = record
            .push_operation(operation)
            .and_then(|()| self.persist(record));
        if let Err(e) = appended {
            // The operation never became durable; its snapshot is garbage.
            if let Some(backup_id) = backup_id {
                let _ = self.content.delete(&[backup_id]);
            }
            return Err(e);
        }
        Ok(operation_id)
    }

    /// Commits a transaction.
    ///
    /// Commit never undoes anything: it validates the record, persists it
    /// as committed, moves its backups into the archive and keeps an
    /// archive copy of the final record.
    ///
    /// # Errors
    ///
    /// Validation and storage failures leave the transaction active so it
    /// can be retried or rolled back.
    pub fn commit_transaction(&self, id: &TransactionId) -> CoreResult<CommitSummary> {
        let _guard = self.write_lock.lock();
        let active = self.fetch(id)?;
        active.ensure_active()?;
        active.validate_backups(self.content.as_ref())?;

        let now = now_millis();
        let mut committed = active.clone();
        committed.mark_committed(now)?;
        self.persist(&committed)?;

        let archived = self.store.archive(&committed).and_then(|()| {
            self.content
                .archive(&committed.backup_ids(), id.as_str())
                .map_err(CoreError::from)
        });
        let archived_backups = match archived {
            Ok(count) => count,
            Err(e) => {
                warn!(txn = %id, error = %e, "archiving failed, reverting commit");
                if let Err(revert) = self.store.save(&active) {
                    warn!(txn = %id, error = %revert, "could not revert commit record");
                }
                return Err(e);
            }
        };

        self.registry.remove(id);
        let summary = CommitSummary {
            transaction_id: id.clone(),
            operations_count: committed.operations.len(),
            duration_ms: committed.duration_ms(now),
            archived_backups,
        };
        info!(
            txn = %id,
            operations = summary.operations_count,
            duration_ms = summary.duration_ms,
            "transaction committed"
        );
        Ok(summary)
    }

    /// Rolls back a transaction, undoing its operations in reverse order.
    ///
    /// The transaction does not need to be in this manager's registry; it
    /// is reloaded from the store, so a fresh process can roll back the
    /// leftovers of a crashed one.
    ///
    /// Missing backups, already-removed files and absent hooks are
    /// warnings. With `continue_on_error` off, the first real failure
    /// stops the pass, returns `RollbackAborted` and leaves the transaction
    /// active; otherwise every operation is attempted and the full outcome
    /// is returned.
    pub fn rollback_transaction(
        &self,
        id: &TransactionId,
        options: RollbackOptions,
    ) -> CoreResult<RollbackOutcome> {
        let _guard = self.write_lock.lock();
        let mut record = self.fetch(id)?;
        record.ensure_active()?;

        let continue_on_error = options
            .continue_on_error
            .unwrap_or(self.config.continue_on_error);
        let mut outcome = RollbackOutcome::default();

        for operation in record.operations.iter().rev() {
            match self.undo(operation) {
                Undo::Done(message) => {
                    debug!(txn = %id, op = %operation.id, %message, "operation undone");
                    outcome
                        .successful
                        .push(OperationOutcome::new(operation, message));
                }
                Undo::Warning(message) => {
                    warn!(
                        txn = %id,
                        op = %operation.id,
                        target = %operation.target,
                        %message,
                        "operation partially undone"
                    );
                    outcome
                        .warnings
                        .push(OperationOutcome::new(operation, message));
                }
                Undo::Failed(message) => {
                    warn!(
                        txn = %id,
                        op = %operation.id,
                        target = %operation.target,
                        %message,
                        "undo failed"
                    );
                    if !continue_on_error {
                        return Err(CoreError::RollbackAborted {
                            id: id.to_string(),
                            operation_id: operation.id.to_string(),
                            reason: message,
                        });
                    }
                    outcome
                        .failed
                        .push(OperationOutcome::new(operation, message));
                }
            }
        }

        record.mark_rolled_back(now_millis(), outcome.clone())?;
        self.persist(&record)?;
        self.registry.remove(id);
        info!(
            txn = %id,
            successful = outcome.successful.len(),
            failed = outcome.failed.len(),
            warnings = outcome.warnings.len(),
            "transaction rolled back"
        );
        Ok(outcome)
    }

    /// Removes finished transactions older than `retention_days`, with
    /// their backups. Returns how many transactions were removed.
    pub fn cleanup_old_transactions(&self, retention_days: u32) -> CoreResult<usize> {
        Ok(self.sweep(retention_days)?.transactions)
    }

    /// Runs [`Self::cleanup_old_transactions`] with the configured window.
    pub fn cleanup_default(&self) -> CoreResult<usize> {
        self.cleanup_old_transactions(self.config.retention_days)
    }

    /// Runs the retention sweep and returns the full report.
    pub fn sweep(&self, retention_days: u32) -> CoreResult<SweepReport> {
        let _guard = self.write_lock.lock();
        RetentionSweeper::new(Arc::clone(&self.store), Arc::clone(&self.content))
            .sweep(retention_days)
    }

    /// Lists transactions newest first.
    pub fn list_transactions(&self, limit: usize) -> CoreResult<Vec<TransactionRecord>> {
        self.store.list(Some(limit))
    }

    /// Returns the most recently started transaction.
    pub fn get_last_transaction(&self) -> CoreResult<Option<TransactionRecord>> {
        Ok(self.store.list(Some(1))?.into_iter().next())
    }

    /// Returns the record of `id`, from the registry or the store.
    pub fn get_transaction(&self, id: &TransactionId) -> CoreResult<TransactionRecord> {
        if let Some(record) = self.registry.get(id) {
            return Ok(record);
        }
        self.store
            .load(id)?
            .ok_or_else(|| CoreError::not_found(id.as_str()))
    }

    /// Ids of the transactions cached as active in this manager.
    #[must_use]
    pub fn active_transactions(&self) -> Vec<TransactionId> {
        self.registry.ids()
    }

    /// Validates and saves a record.
    fn persist(&self, record: &TransactionRecord) -> CoreResult<()> {
        record.validate()?;
        self.store.save(record)
    }

    /// Loads a record from the registry, falling back to the store.
    ///
    /// Active records loaded from the store are cached again.
    fn fetch(&self, id: &TransactionId) -> CoreResult<TransactionRecord> {
        if let Some(record) = self.registry.get(id) {
            return Ok(record);
        }
        let record = self
            .store
            .load(id)?
            .ok_or_else(|| CoreError::not_found(id.as_str()))?;
        if record.is_active() {
            debug!(txn = %id, "reloaded active transaction from store");
            self.registry.insert(record.clone());
        }
        Ok(record)
    }

    /// Snapshots the current content of `resolved`, if it is a file.
    fn snapshot(&self, target: &str, resolved: &Path) -> CoreResult<Option<BackupId>> {
        let content = match fs::read(resolved) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(target = %resolved.display(), "no prior state to snapshot");
                return Ok(None);
            }
            Err(_) if resolved.is_dir() => {
                debug!(target = %resolved.display(), "target is a directory, not snapshotted");
                return Ok(None);
            }
            Err(e) => return Err(CoreError::storage_read(resolved, e)),
        };
        Ok(Some(self.content.put(target, &content)?))
    }

    fn load_backup(&self, id: &BackupId) -> CoreResult<Backup> {
        Ok(self.content.get(id)?)
    }

    fn undo(&self, operation: &Operation) -> Undo {
        let path = self.config.resolve_target(&operation.target);
        match &operation.action {
            OperationAction::Create => remove_created(&path),
            OperationAction::Update { backup_id } | OperationAction::Delete { backup_id } => {
                let Some(backup_id) = backup_id else {
                    return Undo::Warning("no backup available".into());
                };
                let backup = match self.load_backup(backup_id) {
                    Ok(backup) => backup,
                    Err(e) if e.is_recoverable() => {
                        let message = format!("no backup available: {backup_id} is missing");
                        return Undo::Warning(message);
                    }
                    Err(e) => return Undo::Failed(e.to_string()),
                };
                match restore_file(&path, &backup.content, self.config.sync_writes) {
                    Ok(()) => Undo::Done(format!("restored from backup {backup_id}")),
                    Err(e) => Undo::Failed(e.to_string()),
                }
            }
            OperationAction::ManifestUpdate { backup_id }
            | OperationAction::MetadataUpdate { backup_id } => {
                let Some(hook) = self.hooks.get(operation.kind()) else {
                    return Undo::Warning(format!(
                        "no restore hook registered for {}",
                        operation.kind()
                    ));
                };
                let backup = match backup_id.as_ref().map(|id| self.load_backup(id)) {
                    None => None,
                    Some(Ok(backup)) => Some(backup),
                    Some(Err(e)) if e.is_recoverable() => None,
                    Some(Err(e)) => return Undo::Failed(e.to_string()),
                };
                match hook.restore(operation, backup.as_ref()) {
                    Ok(()) => Undo::Done("restored by hook".into()),
                    Err(e) => Undo::Failed(e.to_string()),
                }
            }
        }
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("config", &self.config)
            .field("active", &self.registry.len())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

fn remove_created(path: &Path) -> Undo {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Undo::Warning("already removed".into());
        }
        Err(e) => return Undo::Failed(e.to_string()),
    };
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match removed {
        Ok(()) => Undo::Done("removed created target".into()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Undo::Warning("already removed".into()),
        Err(e) => Undo::Failed(e.to_string()),
    }
}

fn default_actor() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "system".to_string())
}
