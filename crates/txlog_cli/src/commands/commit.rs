//! Commit command implementation.

use super::{format_duration, open, CliError};
use std::path::Path;
use tracing::info;
use txlog_core::{Config, TransactionId};

/// Commits a transaction left active, e.g. by a crashed pipeline.
pub fn run(path: &Path, config: Config, id: &str) -> Result<(), CliError> {
    info!("Committing transaction {}", id);

    let manager = open(path, config)?;
    let summary = manager.commit_transaction(&TransactionId::from(id))?;

    println!("✓ Transaction committed");
    println!("  Id:         {}", summary.transaction_id);
    println!("  Operations: {}", summary.operations_count);
    println!("  Backups:    {} archived", summary.archived_backups);
    println!("  Duration:   {}", format_duration(summary.duration_ms));
    Ok(())
}
