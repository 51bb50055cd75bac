//! # txlog Core
//!
//! Transactional operation log for file mutations.
//!
//! A caller wraps a batch of mutations in a transaction, records each
//! mutation *before* performing it, and then either commits the batch or
//! rolls it back. Rollback undoes the recorded operations in strict
//! reverse order from snapshots taken at record time.
//!
//! ## Example
//!
//! ```rust,ignore
//! use txlog_core::{BeginOptions, Config, OperationRequest, RollbackOptions, TransactionManager};
//!
//! let manager = TransactionManager::open(".txlog".as_ref(), Config::default())?;
//! let txn = manager.begin_transaction(BeginOptions::new("refactor"))?;
//!
//! manager.record_operation(&txn, OperationRequest::update("a.txt", "new"))?;
//! std::fs::write("a.txt", "new")?;
//!
//! manager.rollback_transaction(&txn, RollbackOptions::default())?;
//! ```
//!
//! ## Durability
//!
//! Every state change is persisted with write-temp, fsync, rename before
//! the call returns, so a crashed process leaves an active record that a
//! later process can roll back.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dir;
mod error;
mod hooks;
mod manager;
mod record;
mod registry;
mod retention;
mod store;
mod types;

pub use config::Config;
pub use dir::LogDir;
pub use error::{CoreError, CoreResult};
pub use hooks::{HookError, HookRegistry, RestoreHook};
pub use manager::{BeginOptions, OperationRequest, RollbackOptions, TransactionManager};
pub use record::{
    CommitSummary, Operation, OperationAction, OperationKind, OperationOutcome, RollbackOutcome,
    TransactionRecord, TransactionStatus,
};
pub use registry::ActiveRegistry;
pub use retention::{RetentionSweeper, SweepReport};
pub use store::{FileTransactionStore, InMemoryTransactionStore, TransactionStore};
pub use types::{now_millis, OperationId, TransactionId, MILLIS_PER_DAY};

pub use txlog_storage::{Backup, BackupId, ContentStore};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
