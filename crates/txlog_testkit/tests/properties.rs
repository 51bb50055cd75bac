//! Property tests for rollback ordering and state restoration.

use proptest::prelude::*;
use std::sync::Arc;
use txlog_testkit::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any plan honoring the record-before-mutate contract is fully undone.
    #[test]
    fn rollback_restores_initial_workspace(
        initial in initial_state_strategy(),
        plan in plan_strategy(12),
    ) {
        let log = TestLog::memory();
        for (index, content) in initial.iter().enumerate() {
            if let Some(content) = content {
                log.write(&plan_file(index), content);
            }
        }

        let txn = log.begin("generated");
        for step in &plan {
            let name = step.file_name();
            match step {
                Step::Write { content, .. } => {
                    let request = if log.exists(&name) {
                        OperationRequest::update(name.as_str(), content.as_str())
                    } else {
                        OperationRequest::create(name.as_str(), content.as_str())
                    };
                    log.record_operation(&txn, request).unwrap();
                    log.write(&name, content);
                }
                Step::Remove { .. } => {
                    if log.exists(&name) {
                        log.record_operation(&txn, OperationRequest::delete(name.as_str()))
                            .unwrap();
                        log.remove(&name);
                    }
                }
            }
        }

        let outcome = log
            .rollback_transaction(&txn, RollbackOptions::default())
            .unwrap();
        prop_assert!(outcome.failed.is_empty());
        prop_assert!(outcome.warnings.is_empty());

        for (index, content) in initial.iter().enumerate() {
            prop_assert_eq!(log.read(&plan_file(index)), content.clone());
        }
    }

    /// Hooks are invoked in exact reverse recording order.
    #[test]
    fn hooks_run_last_in_first_out(
        kinds in prop::collection::vec(structured_kind_strategy(), 1..16),
    ) {
        let log = TestLog::memory();
        let hook = RecordingHook::new();
        log.register_hook(OperationKind::ManifestUpdate, Arc::new(hook.clone())).unwrap();
        log.register_hook(
            OperationKind::MetadataUpdate,
            Arc::new(RecordingHook::sharing(hook.journal())),
        )
        .unwrap();

        let txn = log.begin("generated");
        let mut targets = Vec::new();
        for (index, kind) in kinds.iter().enumerate() {
            let target = format!("resource-{index}");
            log.record_operation(&txn, OperationRequest::new(*kind, target.as_str())).unwrap();
            targets.push(target);
        }

        log.rollback_transaction(&txn, RollbackOptions::default()).unwrap();

        targets.reverse();
        prop_assert_eq!(hook.targets(), targets);
    }
}
