//! Cleanup command implementation.

use super::{open, CliError};
use std::path::Path;
use tracing::info;
use txlog_core::Config;

/// Sweeps finished transactions older than `days`.
pub fn run(path: &Path, config: Config, days: Option<u32>) -> Result<(), CliError> {
    let days = days.unwrap_or(config.retention_days);
    info!("Removing transactions older than {} days", days);

    let manager = open(path, config)?;
    let report = manager.sweep(days)?;

    println!("✓ Cleanup complete");
    println!("  Transactions removed: {}", report.transactions);
    println!("  Backups removed:      {}", report.backups);
    if report.skipped_active > 0 {
        println!(
            "  Kept {} expired transaction(s) that are still active",
            report.skipped_active
        );
    }
    Ok(())
}
