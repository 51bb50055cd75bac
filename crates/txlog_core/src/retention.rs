//! Retention sweep of finished transactions.

use crate::error::CoreResult;
use crate::store::TransactionStore;
use crate::types::{now_millis, MILLIS_PER_DAY};
use std::sync::Arc;
use tracing::{debug, info};
use txlog_storage::ContentStore;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Transactions removed.
    pub transactions: usize,
    /// Backups removed, live and archived.
    pub backups: usize,
    /// Expired transactions kept because they are still active.
    pub skipped_active: usize,
}

/// Removes committed and rolled-back transactions past a cutoff.
///
/// Active transactions are never swept, however old: they are what a
/// crash leaves behind and still need a commit or rollback.
pub struct RetentionSweeper {
    store: Arc<dyn TransactionStore>,
    content: Arc<dyn ContentStore>,
}

impl RetentionSweeper {
    /// Creates a sweeper over the given stores.
    pub fn new(store: Arc<dyn TransactionStore>, content: Arc<dyn ContentStore>) -> Self {
        Self { store, content }
    }

    /// Sweeps transactions started more than `retention_days` ago.
    pub fn sweep(&self, retention_days: u32) -> CoreResult<SweepReport> {
        let window = u64::from(retention_days).saturating_mul(MILLIS_PER_DAY);
        self.sweep_before(now_millis().saturating_sub(window))
    }

    /// Sweeps transactions started strictly before `cutoff_ms`.
    pub fn sweep_before(&self, cutoff_ms: u64) -> CoreResult<SweepReport> {
        let mut report = SweepReport::default();

        for record in self.store.list(None)? {
            if record.started_at >= cutoff_ms {
                continue;
            }
            if record.is_active() {
                debug!(txn = %record.id, "expired transaction is still active, skipping");
                report.skipped_active += 1;
                continue;
            }

            report.backups += self.content.delete(&record.backup_ids())?;
            report.backups += self.content.purge_archive(record.id.as_str())?;
            if self.store.delete(&record.id)? {
                report.transactions += 1;
            }
            debug!(txn = %record.id, status = %record.status, "swept transaction");
        }

        if report.transactions > 0 || report.skipped_active > 0 {
            info!(
                transactions = report.transactions,
                backups = report.backups,
                skipped_active = report.skipped_active,
                "retention sweep finished"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Operation, OperationAction, TransactionRecord};
    use crate::store::InMemoryTransactionStore;
    use crate::types::{OperationId, TransactionId};
    use txlog_storage::InMemoryContentStore;

    struct Fixture {
        store: Arc<InMemoryTransactionStore>,
        content: Arc<InMemoryContentStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(InMemoryTransactionStore::new()),
                content: Arc::new(InMemoryContentStore::new()),
            }
        }

        fn sweeper(&self) -> RetentionSweeper {
            RetentionSweeper::new(self.store.clone(), self.content.clone())
        }

        /// Saves a transaction started at `started_at` with one backed-up update.
        fn add(&self, started_at: u64, finish: bool) -> TransactionRecord {
            let mut record = TransactionRecord::new(
                TransactionId::generate_at(started_at),
                "edit",
                "tester",
                started_at,
                true,
            );
            let backup = self.content.put("a.txt", b"old").unwrap();
            record
                .push_operation(Operation {
                    id: OperationId::for_ordinal(1),
                    timestamp: started_at,
                    target: "a.txt".into(),
                    action: OperationAction::Update {
                        backup_id: Some(backup),
                    },
                    new_state: None,
                })
                .unwrap();
            if finish {
                record.mark_committed(started_at + 1).unwrap();
                self.content
                    .archive(&record.backup_ids(), record.id.as_str())
                    .unwrap();
            }
            self.store.save(&record).unwrap();
            record
        }
    }

    #[test]
    fn only_records_before_cutoff_are_swept() {
        let fixture = Fixture::new();
        let old = fixture.add(1_000, true);
        let recent = fixture.add(5_000, true);

        let report = fixture.sweeper().sweep_before(2_000).unwrap();
        assert_eq!(report.transactions, 1);
        assert_eq!(report.backups, 1);
        assert!(fixture.store.load(&old.id).unwrap().is_none());
        assert!(fixture.store.load(&recent.id).unwrap().is_some());
        assert_eq!(fixture.content.archived_len(), 1);
    }

    #[test]
    fn active_transactions_survive() {
        let fixture = Fixture::new();
        let active = fixture.add(1_000, false);

        let report = fixture.sweeper().sweep_before(2_000).unwrap();
        assert_eq!(report.transactions, 0);
        assert_eq!(report.skipped_active, 1);
        assert!(fixture.store.load(&active.id).unwrap().is_some());
        assert_eq!(fixture.content.len(), 1);
    }

    #[test]
    fn day_window_uses_wall_clock() {
        let fixture = Fixture::new();
        let now = now_millis();
        fixture.add(now - 40 * MILLIS_PER_DAY, true);
        fixture.add(now - 10 * MILLIS_PER_DAY, true);

        assert_eq!(fixture.sweeper().sweep(30).unwrap().transactions, 1);
        assert_eq!(fixture.store.len(), 1);
    }

    #[test]
    fn empty_store_sweeps_nothing() {
        let fixture = Fixture::new();
        assert_eq!(fixture.sweeper().sweep(0).unwrap(), SweepReport::default());
    }
}
