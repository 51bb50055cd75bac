//! Recovery of transactions left active by a crashed process.

use txlog_testkit::prelude::*;

#[test]
fn fresh_manager_rolls_back_crashed_transaction() {
    let log = TestLog::file();
    log.write("a.txt", "old");
    log.write("b.txt", "bdata");

    let txn = log.begin("refactor");
    log.record_operation(&txn, OperationRequest::update("a.txt", "new"))
        .unwrap();
    log.write("a.txt", "new");
    log.record_operation(&txn, OperationRequest::delete("b.txt"))
        .unwrap();
    log.remove("b.txt");
    log.record_operation(&txn, OperationRequest::create("c.txt", "c"))
        .unwrap();
    log.write("c.txt", "c");

    // The original manager is never asked again; a new one only sees disk.
    let recovered = log.reopen();
    assert!(recovered.active_transactions().is_empty());

    let pending = recovered.get_last_transaction().unwrap().unwrap();
    assert_eq!(pending.id, txn);
    assert_eq!(pending.status, TransactionStatus::Active);
    assert_eq!(pending.operations.len(), 3);

    let outcome = recovered
        .rollback_transaction(&txn, RollbackOptions::default())
        .unwrap();
    assert_eq!(outcome.successful.len(), 3);
    assert!(outcome.is_clean());

    assert_eq!(log.read("a.txt").as_deref(), Some("old"));
    assert_eq!(log.read("b.txt").as_deref(), Some("bdata"));
    assert!(!log.exists("c.txt"));
}

#[test]
fn crash_right_after_begin_is_discoverable() {
    let log = TestLog::file();
    let txn = log.begin("refactor");

    let recovered = log.reopen();
    let listed = recovered.list_transactions(10).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, txn);
    assert!(listed[0].is_active());
}

#[test]
fn recovered_transaction_can_be_committed() {
    let log = TestLog::file();
    log.write("a.txt", "old");
    let txn = log.begin("edit");
    log.record_operation(&txn, OperationRequest::update("a.txt", "new"))
        .unwrap();

    let recovered = log.reopen();
    let summary = recovered.commit_transaction(&txn).unwrap();
    assert_eq!(summary.operations_count, 1);
    assert_eq!(summary.archived_backups, 1);
}

#[test]
fn recovered_transaction_can_keep_recording() {
    let log = TestLog::file();
    let txn = log.begin("edit");
    log.record_operation(&txn, OperationRequest::create("one.txt", ""))
        .unwrap();

    let recovered = log.reopen();
    let op = recovered
        .record_operation(&txn, OperationRequest::create("two.txt", ""))
        .unwrap();
    assert_eq!(op.as_str(), "op-0002");
    assert_eq!(recovered.active_transactions(), [txn]);
}

#[test]
fn rollback_after_rollback_in_other_process_is_rejected() {
    let log = TestLog::file();
    let txn = log.begin("edit");

    log.reopen()
        .rollback_transaction(&txn, RollbackOptions::default())
        .unwrap();

    let err = log
        .reopen()
        .rollback_transaction(&txn, RollbackOptions::default())
        .unwrap_err();
    assert!(matches!(err, CoreError::TransactionNotActive { .. }));
}
