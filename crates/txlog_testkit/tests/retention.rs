//! Retention sweep over real log directories.

use txlog_core::{ContentStore, TransactionStore};
use txlog_testkit::prelude::*;

fn committed_with_backup(log: &TestLog, name: &str) -> (TransactionId, txlog_core::BackupId) {
    log.write(name, "old");
    let txn = log.begin("edit");
    log.record_operation(&txn, OperationRequest::update(name, "new"))
        .unwrap();
    let backup = log.get_transaction(&txn).unwrap().backup_ids()[0].clone();
    log.commit_transaction(&txn).unwrap();
    (txn, backup)
}

#[test]
fn sweep_removes_only_transactions_past_the_window() {
    let log = TestLog::file();
    let (old, old_backup) = committed_with_backup(&log, "a.txt");
    let (recent, recent_backup) = committed_with_backup(&log, "b.txt");
    log.backdate(&old, 40);
    log.backdate(&recent, 10);

    assert_eq!(log.cleanup_old_transactions(30).unwrap(), 1);

    assert!(matches!(
        log.get_transaction(&old),
        Err(CoreError::TransactionNotFound { .. })
    ));
    assert!(log
        .content()
        .get_archived(old.as_str(), &old_backup)
        .unwrap_err()
        .is_not_found());
    assert!(!log.log_dir().join("transactions/archive").join(old.as_str()).exists());

    assert!(log.get_transaction(&recent).is_ok());
    assert!(log
        .content()
        .get_archived(recent.as_str(), &recent_backup)
        .is_ok());
}

#[test]
fn sweep_removes_live_backups_of_rolled_back_transactions() {
    let log = TestLog::file();
    log.write("a.txt", "old");
    let txn = log.begin("edit");
    log.record_operation(&txn, OperationRequest::update("a.txt", "new"))
        .unwrap();
    let backup = log.get_transaction(&txn).unwrap().backup_ids()[0].clone();
    log.rollback_transaction(&txn, RollbackOptions::default())
        .unwrap();
    log.backdate(&txn, 31);

    let report = log.sweep(30).unwrap();
    assert_eq!(report.transactions, 1);
    assert_eq!(report.backups, 1);
    assert!(!log.content().contains(&backup));
}

#[test]
fn active_transactions_are_never_swept() {
    let log = TestLog::file();
    let txn = log.begin("edit");
    log.backdate(&txn, 365);

    let report = log.sweep(30).unwrap();
    assert_eq!(report.transactions, 0);
    assert_eq!(report.skipped_active, 1);
    assert!(log.store().load(&txn).unwrap().is_some());
}

#[test]
fn default_cleanup_uses_configured_window() {
    let log = TestLog::file_with(Config::new().retention_days(5));
    let (txn, _) = committed_with_backup(&log, "a.txt");
    log.backdate(&txn, 6);

    assert_eq!(log.cleanup_default().unwrap(), 1);
    assert!(log.list_transactions(10).unwrap().is_empty());
}
