//! In-memory transaction store for testing.

use super::{newest_first, TransactionStore};
use crate::error::CoreResult;
use crate::record::TransactionRecord;
use crate::types::TransactionId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory transaction store.
///
/// Shares the contract of [`super::FileTransactionStore`] without touching
/// the filesystem. Records are cloned in and out, so callers never alias
/// stored state.
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    records: RwLock<HashMap<TransactionId, TransactionRecord>>,
    archived: RwLock<HashMap<TransactionId, TransactionRecord>>,
}

impl InMemoryTransactionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn save(&self, record: &TransactionRecord) -> CoreResult<()> {
        self.records
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn load(&self, id: &TransactionId) -> CoreResult<Option<TransactionRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn list(&self, limit: Option<usize>) -> CoreResult<Vec<TransactionRecord>> {
        let records = self.records.read().values().cloned().collect();
        Ok(newest_first(records, limit))
    }

    fn archive(&self, record: &TransactionRecord) -> CoreResult<()> {
        self.archived
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn load_archived(&self, id: &TransactionId) -> CoreResult<Option<TransactionRecord>> {
        Ok(self.archived.read().get(id).cloned())
    }

    fn delete(&self, id: &TransactionId) -> CoreResult<bool> {
        let removed = self.records.write().remove(id).is_some();
        let archived = self.archived.write().remove(id).is_some();
        Ok(removed || archived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_and_ordering() {
        let store = InMemoryTransactionStore::new();
        let older = TransactionRecord::new(TransactionId::generate_at(1), "a", "x", 1, false);
        let newer = TransactionRecord::new(TransactionId::generate_at(2), "b", "x", 2, false);
        store.save(&older).unwrap();
        store.save(&newer).unwrap();

        assert_eq!(store.load(&older.id).unwrap(), Some(older.clone()));
        let listed = store.list(None).unwrap();
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);

        assert!(store.delete(&older.id).unwrap());
        assert_eq!(store.len(), 1);
    }
}
