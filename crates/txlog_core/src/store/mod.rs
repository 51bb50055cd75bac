//! Durable storage of transaction records.
//!
//! The manager only talks to the [`TransactionStore`] trait, so the JSON
//! file layout can be swapped for an embedded key-value store without
//! touching the rollback logic.

mod file;
mod memory;

pub use file::FileTransactionStore;
pub use memory::InMemoryTransactionStore;

use crate::error::CoreResult;
use crate::record::TransactionRecord;
use crate::types::TransactionId;

/// Persistence for transaction records.
///
/// # Invariants
///
/// - `save` is last-writer-wins for a given id
/// - `load` after `save` returns an equal record
/// - `list` is ordered by `started_at`, newest first
/// - `archive` keeps a copy that survives until `delete`
pub trait TransactionStore: Send + Sync {
    /// Writes `record`, replacing any previous version.
    fn save(&self, record: &TransactionRecord) -> CoreResult<()>;

    /// Reads the record of `id`, or `None` if there is none.
    fn load(&self, id: &TransactionId) -> CoreResult<Option<TransactionRecord>>;

    /// Lists records newest first, at most `limit` of them.
    fn list(&self, limit: Option<usize>) -> CoreResult<Vec<TransactionRecord>>;

    /// Stores an archive copy of a finished record.
    fn archive(&self, record: &TransactionRecord) -> CoreResult<()>;

    /// Reads the archive copy of `id`.
    fn load_archived(&self, id: &TransactionId) -> CoreResult<Option<TransactionRecord>>;

    /// Removes the record of `id` and its archive copy.
    ///
    /// Returns false if nothing was stored under `id`.
    fn delete(&self, id: &TransactionId) -> CoreResult<bool>;
}

/// Sorts records newest first and applies `limit`.
pub(crate) fn newest_first(
    mut records: Vec<TransactionRecord>,
    limit: Option<usize>,
) -> Vec<TransactionRecord> {
    records.sort_by(|a, b| {
        b.started_at
            .cmp(&a.started_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    records
}
