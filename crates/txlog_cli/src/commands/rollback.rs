//! Rollback command implementation.

use super::{open, CliError};
use std::path::Path;
use tracing::info;
use txlog_core::{Config, RollbackOptions, TransactionId};

/// Rolls back a transaction left active.
pub fn run(path: &Path, config: Config, id: &str, continue_on_error: bool) -> Result<(), CliError> {
    info!("Rolling back transaction {}", id);

    let manager = open(path, config)?;
    let options = RollbackOptions::default().continue_on_error(continue_on_error);
    let outcome = manager.rollback_transaction(&TransactionId::from(id), options)?;

    if outcome.is_clean() {
        println!("✓ Transaction rolled back");
    } else {
        println!("✗ Transaction rolled back with failures");
    }
    println!("  Undone:   {}", outcome.successful.len());
    println!("  Failed:   {}", outcome.failed.len());
    println!("  Warnings: {}", outcome.warnings.len());
    for warning in &outcome.warnings {
        println!("    {} {}: {}", warning.operation_id, warning.target, warning.message);
    }
    for failure in &outcome.failed {
        println!("    {} {}: {}", failure.operation_id, failure.target, failure.message);
    }
    Ok(())
}
