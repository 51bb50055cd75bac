//! In-process cache of active transactions.

use crate::record::TransactionRecord;
use crate::types::TransactionId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Registry of the transactions a manager currently has open.
///
/// The registry is a cache over the durable store: dropping it loses
/// nothing, because every mutation is persisted before it lands here.
/// It is passed into the manager explicitly so tests (or several managers
/// in one process) never share hidden global state.
///
/// It also holds the optional per-target advisory claims: a target path
/// is claimed by at most one active transaction at a time.
#[derive(Debug, Default)]
pub struct ActiveRegistry {
    transactions: RwLock<HashMap<TransactionId, TransactionRecord>>,
    targets: Mutex<HashMap<PathBuf, TransactionId>>,
}

impl ActiveRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches `record`, replacing any previous version.
    pub fn insert(&self, record: TransactionRecord) {
        self.transactions.write().insert(record.id.clone(), record);
    }

    /// Returns a copy of the cached record of `id`.
    #[must_use]
    pub fn get(&self, id: &TransactionId) -> Option<TransactionRecord> {
        self.transactions.read().get(id).cloned()
    }

    /// Drops `id` from the cache and releases its target claims.
    pub fn remove(&self, id: &TransactionId) -> Option<TransactionRecord> {
        self.release_targets(id);
        self.transactions.write().remove(id)
    }

    /// Returns true if `id` is cached.
    #[must_use]
    pub fn contains(&self, id: &TransactionId) -> bool {
        self.transactions.read().contains_key(id)
    }

    /// Returns the cached ids, oldest first.
    #[must_use]
    pub fn ids(&self) -> Vec<TransactionId> {
        let mut ids: Vec<_> = self.transactions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of cached transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.read().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.read().is_empty()
    }

    /// Claims `target` for `id`.
    ///
    /// Returns `Ok(true)` for a new claim and `Ok(false)` if `id` already
    /// held it. On conflict the holder's id is returned.
    pub fn claim_target(&self, target: &Path, id: &TransactionId) -> Result<bool, TransactionId> {
        let mut targets = self.targets.lock();
        match targets.get(target) {
            Some(holder) if holder != id => Err(holder.clone()),
            Some(_) => Ok(false),
            None => {
                targets.insert(target.to_path_buf(), id.clone());
                Ok(true)
            }
        }
    }

    /// Releases the claim `id` holds on `target`, if any.
    pub fn release_target(&self, target: &Path, id: &TransactionId) {
        let mut targets = self.targets.lock();
        if targets.get(target) == Some(id) {
            targets.remove(target);
        }
    }

    /// Returns the transaction holding `target`, if any.
    #[must_use]
    pub fn target_holder(&self, target: &Path) -> Option<TransactionId> {
        self.targets.lock().get(target).cloned()
    }

    /// Releases every claim held by `id`.
    pub fn release_targets(&self, id: &TransactionId) {
        self.targets.lock().retain(|_, holder| holder != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> TransactionRecord {
        TransactionRecord::new(TransactionId::new(id), "test", "tester", 1, false)
    }

    #[test]
    fn insert_get_remove() {
        let registry = ActiveRegistry::new();
        registry.insert(record("t1"));

        assert!(registry.contains(&TransactionId::new("t1")));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&TransactionId::new("t1")).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn registries_are_isolated() {
        let a = ActiveRegistry::new();
        let b = ActiveRegistry::new();
        a.insert(record("t1"));
        assert!(b.get(&TransactionId::new("t1")).is_none());
    }

    #[test]
    fn target_claims_conflict_across_transactions() {
        let registry = ActiveRegistry::new();
        let path = Path::new("/work/a.txt");
        let t1 = TransactionId::new("t1");
        let t2 = TransactionId::new("t2");

        assert_eq!(registry.claim_target(path, &t1), Ok(true));
        assert_eq!(registry.claim_target(path, &t1), Ok(false));
        assert_eq!(registry.claim_target(path, &t2), Err(t1.clone()));

        registry.release_targets(&t1);
        assert!(registry.target_holder(path).is_none());
        registry.claim_target(path, &t2).unwrap();
    }

    #[test]
    fn remove_releases_claims() {
        let registry = ActiveRegistry::new();
        let t1 = TransactionId::new("t1");
        registry.insert(record("t1"));
        registry.claim_target(Path::new("x"), &t1).unwrap();

        registry.remove(&t1);
        assert!(registry.target_holder(Path::new("x")).is_none());
    }

    #[test]
    fn release_target_only_drops_own_claim() {
        let registry = ActiveRegistry::new();
        let t1 = TransactionId::new("t1");
        let t2 = TransactionId::new("t2");
        registry.claim_target(Path::new("a"), &t1).unwrap();
        registry.claim_target(Path::new("b"), &t1).unwrap();

        registry.release_target(Path::new("a"), &t2);
        assert_eq!(registry.target_holder(Path::new("a")), Some(t1.clone()));

        registry.release_target(Path::new("a"), &t1);
        assert!(registry.target_holder(Path::new("a")).is_none());
        assert_eq!(registry.target_holder(Path::new("b")), Some(t1));
    }
}
