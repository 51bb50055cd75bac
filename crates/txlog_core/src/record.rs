//! Transaction records and their validation.
//!
//! A [`TransactionRecord`] is pure data: it is what gets written to
//! `transactions/<id>.json`. The only logic here is state bookkeeping and
//! the structural checks run before every persist.

use crate::error::{CoreError, CoreResult};
use crate::types::{OperationId, TransactionId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use txlog_storage::{BackupId, ContentStore};

/// Lifecycle state of a transaction.
///
/// `Active` is the only non-terminal state; no transition leaves
/// `Committed` or `RolledBack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Operations may still be recorded.
    Active,
    /// Finalized successfully.
    Committed,
    /// Undone by a rollback pass.
    RolledBack,
}

impl TransactionStatus {
    /// Returns the persisted name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }

    /// Returns true for `Committed` and `RolledBack`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five kinds of recordable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// A new resource is created.
    Create,
    /// An existing resource is overwritten.
    Update,
    /// An existing resource is removed.
    Delete,
    /// A structured manifest (package file, lockfile) is changed.
    ManifestUpdate,
    /// Structured metadata owned by someone else is changed.
    MetadataUpdate,
}

impl OperationKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::ManifestUpdate,
        Self::MetadataUpdate,
    ];

    /// Returns the persisted name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ManifestUpdate => "manifest_update",
            Self::MetadataUpdate => "metadata_update",
        }
    }

    /// Returns true if prior state is snapshotted before this kind runs.
    #[must_use]
    pub const fn captures_backup(self) -> bool {
        !matches!(self, Self::Create)
    }

    /// Returns true if undoing this kind is delegated to a restore hook.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::ManifestUpdate | Self::MetadataUpdate)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::invalid_state(format!("unknown operation kind: {s}")))
    }
}

/// What an operation did, with exactly the data needed to undo it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationAction {
    /// Undo deletes the target.
    Create,
    /// Undo rewrites the target from the backup.
    Update {
        /// Snapshot of the target before the update, if it existed.
        backup_id: Option<BackupId>,
    },
    /// Undo recreates the target from the backup.
    Delete {
        /// Snapshot of the target before the delete, if it existed.
        backup_id: Option<BackupId>,
    },
    /// Undo is delegated to the manifest restore hook.
    ManifestUpdate {
        /// Snapshot of the target, when it resolved to a file.
        backup_id: Option<BackupId>,
    },
    /// Undo is delegated to the metadata restore hook.
    MetadataUpdate {
        /// Snapshot of the target, when it resolved to a file.
        backup_id: Option<BackupId>,
    },
}

impl OperationAction {
    /// Builds the action for `kind`. `Create` ignores the backup.
    #[must_use]
    pub fn new(kind: OperationKind, backup_id: Option<BackupId>) -> Self {
        match kind {
            OperationKind::Create => Self::Create,
            OperationKind::Update => Self::Update { backup_id },
            OperationKind::Delete => Self::Delete { backup_id },
            OperationKind::ManifestUpdate => Self::ManifestUpdate { backup_id },
            OperationKind::MetadataUpdate => Self::MetadataUpdate { backup_id },
        }
    }

    /// Returns the kind of this action.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Create => OperationKind::Create,
            Self::Update { .. } => OperationKind::Update,
            Self::Delete { .. } => OperationKind::Delete,
            Self::ManifestUpdate { .. } => OperationKind::ManifestUpdate,
            Self::MetadataUpdate { .. } => OperationKind::MetadataUpdate,
        }
    }

    /// Returns the backup reference, if any.
    #[must_use]
    pub fn backup_id(&self) -> Option<&BackupId> {
        match self {
            Self::Create => None,
            Self::Update { backup_id }
            | Self::Delete { backup_id }
            | Self::ManifestUpdate { backup_id }
            | Self::MetadataUpdate { backup_id } => backup_id.as_ref(),
        }
    }
}

/// One recorded mutation belonging to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Id, unique within the transaction.
    pub id: OperationId,
    /// When the operation was recorded (Unix milliseconds).
    pub timestamp: u64,
    /// Logical resource being mutated.
    pub target: String,
    /// Kind and undo data.
    #[serde(flatten)]
    pub action: OperationAction,
    /// Payload that was or will be written, kept for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_state: Option<String>,
}

impl Operation {
    /// Returns the operation kind.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.action.kind()
    }

    /// Returns the backup reference, if any.
    #[must_use]
    pub fn backup_id(&self) -> Option<&BackupId> {
        self.action.backup_id()
    }
}

/// Per-operation result of a rollback pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// The operation undone (or not).
    pub operation_id: OperationId,
    /// Its kind.
    pub kind: OperationKind,
    /// Its target.
    pub target: String,
    /// What happened.
    pub message: String,
}

impl OperationOutcome {
    /// Creates an outcome for `operation`.
    #[must_use]
    pub fn new(operation: &Operation, message: impl Into<String>) -> Self {
        Self {
            operation_id: operation.id.clone(),
            kind: operation.kind(),
            target: operation.target.clone(),
            message: message.into(),
        }
    }
}

/// Tri-bucket result of a rollback.
///
/// Buckets are filled in processing order, so `successful[0]` is the most
/// recently recorded operation that was undone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackOutcome {
    /// Operations undone.
    pub successful: Vec<OperationOutcome>,
    /// Operations whose undo failed.
    pub failed: Vec<OperationOutcome>,
    /// Operations that could not be fully undone but were not failures.
    pub warnings: Vec<OperationOutcome>,
}

impl RollbackOutcome {
    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of operations processed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.successful.len() + self.failed.len() + self.warnings.len()
    }
}

/// Summary returned by a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// The committed transaction.
    pub transaction_id: TransactionId,
    /// Number of operations in it.
    pub operations_count: usize,
    /// Time between begin and commit.
    pub duration_ms: u64,
    /// Number of backups moved to the archive.
    pub archived_backups: usize,
}

/// A transaction and its ordered operations, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction id.
    pub id: TransactionId,
    /// Free-form label of the triggering operation class.
    pub kind: String,
    /// Invoking user or process.
    pub actor: String,
    /// Begin time (Unix milliseconds).
    pub started_at: u64,
    /// Terminal time, `None` while active.
    pub ended_at: Option<u64>,
    /// Lifecycle state.
    pub status: TransactionStatus,
    /// Advisory flag for higher-level retry logic.
    pub rollback_on_error: bool,
    /// Operations in execution order.
    pub operations: Vec<Operation>,
    /// Outcome attached by a rollback pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackOutcome>,
}

impl TransactionRecord {
    /// Creates an active record.
    #[must_use]
    pub fn new(
        id: TransactionId,
        kind: impl Into<String>,
        actor: impl Into<String>,
        started_at: u64,
        rollback_on_error: bool,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            actor: actor.into(),
            started_at,
            ended_at: None,
            status: TransactionStatus::Active,
            rollback_on_error,
            operations: Vec::new(),
            rollback: None,
        }
    }

    /// Returns true while operations may be recorded.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Fails with `TransactionNotActive` unless the record is active.
    pub fn ensure_active(&self) -> CoreResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CoreError::not_active(self.id.as_str(), self.status))
        }
    }

    /// Returns the id the next appended operation will get.
    #[must_use]
    pub fn next_operation_id(&self) -> OperationId {
        OperationId::for_ordinal(self.operations.len() + 1)
    }

    /// Appends an operation. Only allowed while active.
    pub fn push_operation(&mut self, operation: Operation) -> CoreResult<()> {
        self.ensure_active()?;
        self.operations.push(operation);
        Ok(())
    }

    /// All backup ids referenced by the operations, in record order.
    #[must_use]
    pub fn backup_ids(&self) -> Vec<BackupId> {
        self.operations
            .iter()
            .filter_map(|op| op.backup_id().cloned())
            .collect()
    }

    /// Milliseconds from begin to end (or to `now` while active).
    #[must_use]
    pub fn duration_ms(&self, now: u64) -> u64 {
        self.ended_at.unwrap_or(now).saturating_sub(self.started_at)
    }

    /// Transitions to `Committed`.
    pub fn mark_committed(&mut self, now: u64) -> CoreResult<()> {
        self.ensure_active()?;
        self.status = TransactionStatus::Committed;
        self.ended_at = Some(now);
        Ok(())
    }

    /// Transitions to `RolledBack`, attaching the outcome.
    pub fn mark_rolled_back(&mut self, now: u64, outcome: RollbackOutcome) -> CoreResult<()> {
        self.ensure_active()?;
        self.status = TransactionStatus::RolledBack;
        self.ended_at = Some(now);
        self.rollback = Some(outcome);
        Ok(())
    }

    /// Checks the structural rules every persisted record must satisfy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransactionState` describing the first violation.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.id.is_well_formed() {
            return Err(CoreError::invalid_state(format!(
                "malformed transaction id: {:?}",
                self.id.as_str()
            )));
        }
        if self.kind.trim().is_empty() {
            return Err(CoreError::invalid_state(format!(
                "transaction {} has an empty kind",
                self.id
            )));
        }
        match (self.status.is_terminal(), self.ended_at) {
            (true, None) => {
                return Err(CoreError::invalid_state(format!(
                    "transaction {} is {} but has no end time",
                    self.id, self.status
                )))
            }
            (false, Some(_)) => {
                return Err(CoreError::invalid_state(format!(
                    "transaction {} is active but has an end time",
                    self.id
                )))
            }
            _ => {}
        }
        if self.rollback.is_some() && self.status == TransactionStatus::Committed {
            return Err(CoreError::invalid_state(format!(
                "committed transaction {} carries a rollback outcome",
                self.id
            )));
        }

        let mut seen = HashSet::with_capacity(self.operations.len());
        for op in &self.operations {
            if op.id.as_str().is_empty() {
                return Err(CoreError::invalid_state(format!(
                    "transaction {} has an operation without id",
                    self.id
                )));
            }
            if !seen.insert(&op.id) {
                return Err(CoreError::invalid_state(format!(
                    "transaction {} has duplicate operation id {}",
                    self.id, op.id
                )));
            }
            if op.timestamp == 0 {
                return Err(CoreError::invalid_state(format!(
                    "operation {} of {} has no timestamp",
                    op.id, self.id
                )));
            }
            if op.target.trim().is_empty() {
                return Err(CoreError::invalid_state(format!(
                    "operation {} of {} has an empty target",
                    op.id, self.id
                )));
            }
        }
        Ok(())
    }

    /// Checks that every referenced backup is still readable.
    ///
    /// Run at commit time. Operations recorded without a backup (the
    /// target did not exist yet) are allowed; a reference that no longer
    /// resolves is not.
    pub fn validate_backups(&self, content: &dyn ContentStore) -> CoreResult<()> {
        for op in &self.operations {
            if let Some(backup_id) = op.backup_id() {
                if !content.contains(backup_id) {
                    return Err(CoreError::invalid_state(format!(
                        "operation {} of {} references missing backup {}",
                        op.id, self.id, backup_id
                    )));
                }
            }
        }
        Ok(())
    }
}
