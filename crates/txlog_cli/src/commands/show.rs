//! Show command implementation.

use super::{format_duration, format_timestamp, open, CliError, Format};
use std::path::Path;
use txlog_core::{Config, OperationOutcome, TransactionId, TransactionRecord};

/// Runs the show command.
pub fn run(path: &Path, config: Config, id: Option<&str>, format: &str) -> Result<(), CliError> {
    let format = Format::parse(format)?;
    let manager = open(path, config)?;
    let record = match id {
        Some(id) => manager.get_transaction(&TransactionId::from(id))?,
        None => manager.get_last_transaction()?.ok_or(CliError::Empty)?,
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        Format::Text => print_text_output(&record),
    }
    Ok(())
}

fn print_text_output(record: &TransactionRecord) {
    println!("Transaction {}", record.id);
    println!("==================================================");
    println!("  Kind:    {}", record.kind);
    println!("  Actor:   {}", record.actor);
    println!("  Status:  {}", record.status);
    println!("  Started: {}", format_timestamp(record.started_at));
    if let Some(ended_at) = record.ended_at {
        println!("  Ended:   {}", format_timestamp(ended_at));
        println!("  Took:    {}", format_duration(record.duration_ms(ended_at)));
    }
    println!();
    println!("Operations ({}):", record.operations.len());
    for op in &record.operations {
        let backup = op
            .backup_id()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        println!("  {}  {:<15}  {}  backup: {}", op.id, op.kind(), op.target, backup);
    }

    if let Some(outcome) = &record.rollback {
        println!();
        println!("Rollback:");
        print_outcomes("✓", &outcome.successful);
        print_outcomes("✗", &outcome.failed);
        print_outcomes("!", &outcome.warnings);
    }
}

fn print_outcomes(marker: &str, outcomes: &[OperationOutcome]) {
    for outcome in outcomes {
        println!(
            "  {marker} {} {} {}: {}",
            outcome.operation_id, outcome.kind, outcome.target, outcome.message
        );
    }
}
