//! Restore hooks for structured operations.
//!
//! `manifest_update` and `metadata_update` operations touch state the log
//! does not own (a package manifest that must be re-resolved, metadata kept
//! in some other system). Undoing them is delegated to caller-supplied
//! hooks registered per kind.

use crate::error::{CoreError, CoreResult};
use crate::record::{Operation, OperationKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use txlog_storage::Backup;

/// Failure reported by a restore hook.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Creates a hook error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Undoes one structured operation.
///
/// `backup` is the snapshot taken at record time, present when the target
/// resolved to an existing file.
pub trait RestoreHook: Send + Sync {
    /// Restores the state `operation` changed.
    fn restore(&self, operation: &Operation, backup: Option<&Backup>) -> Result<(), HookError>;
}

impl<F> RestoreHook for F
where
    F: Fn(&Operation, Option<&Backup>) -> Result<(), HookError> + Send + Sync,
{
    fn restore(&self, operation: &Operation, backup: Option<&Backup>) -> Result<(), HookError> {
        self(operation, backup)
    }
}

/// Hooks keyed by structured operation kind.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<OperationKind, Arc<dyn RestoreHook>>>,
}

impl HookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hook` for `kind`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// File-level kinds are undone by the manager itself and cannot take
    /// a hook.
    pub fn register(&self, kind: OperationKind, hook: Arc<dyn RestoreHook>) -> CoreResult<()> {
        if !kind.is_structured() {
            return Err(CoreError::invalid_state(format!(
                "restore hooks only apply to structured operations, not {kind}"
            )));
        }
        self.hooks.write().insert(kind, hook);
        Ok(())
    }

    /// Returns the hook for `kind`.
    #[must_use]
    pub fn get(&self, kind: OperationKind) -> Option<Arc<dyn RestoreHook>> {
        self.hooks.read().get(&kind).cloned()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.hooks.read().keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("HookRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &Operation, _: Option<&Backup>) -> Result<(), HookError> {
        Ok(())
    }

    #[test]
    fn functions_are_hooks() {
        let registry = HookRegistry::new();
        registry
            .register(OperationKind::ManifestUpdate, Arc::new(noop))
            .unwrap();

        assert!(registry.get(OperationKind::ManifestUpdate).is_some());
        assert!(registry.get(OperationKind::MetadataUpdate).is_none());
    }

    #[test]
    fn file_kinds_reject_hooks() {
        let registry = HookRegistry::new();
        let err = registry
            .register(OperationKind::Update, Arc::new(noop))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransactionState { .. }));
    }
}
