//! List command implementation.

use super::{format_timestamp, open, CliError, Format};
use serde::Serialize;
use std::path::Path;
use txlog_core::{Config, TransactionRecord};

/// One row of the listing.
#[derive(Debug, Serialize)]
pub struct TransactionSummary {
    /// Transaction id.
    pub id: String,
    /// Operation class label.
    pub kind: String,
    /// Invoking actor.
    pub actor: String,
    /// Lifecycle status.
    pub status: String,
    /// Start time, epoch milliseconds.
    pub started_at: u64,
    /// Number of recorded operations.
    pub operations: usize,
}

impl From<&TransactionRecord> for TransactionSummary {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            kind: record.kind.clone(),
            actor: record.actor.clone(),
            status: record.status.to_string(),
            started_at: record.started_at,
            operations: record.operations.len(),
        }
    }
}

/// Runs the list command.
pub fn run(path: &Path, config: Config, limit: usize, format: &str) -> Result<(), CliError> {
    let format = Format::parse(format)?;
    let manager = open(path, config)?;
    let rows: Vec<TransactionSummary> = manager
        .list_transactions(limit)?
        .iter()
        .map(TransactionSummary::from)
        .collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        Format::Text => print_text_output(&rows),
    }
    Ok(())
}

fn print_text_output(rows: &[TransactionSummary]) {
    if rows.is_empty() {
        println!("No transactions recorded");
        return;
    }
    for row in rows {
        println!(
            "{}  {:<11}  {:<20}  {:>3} ops  {}  ({})",
            row.id,
            row.status,
            row.kind,
            row.operations,
            format_timestamp(row.started_at),
            row.actor
        );
    }
}
