//! txlog CLI
//!
//! Operator tools for a txlog data directory.
//!
//! # Commands
//!
//! - `list` - List recent transactions
//! - `show` - Display one transaction and its operations
//! - `commit` - Commit a transaction left active
//! - `rollback` - Roll back a transaction left active
//! - `cleanup` - Remove finished transactions past the retention window

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use txlog_core::Config;

/// txlog command-line operation log tools.
#[derive(Parser)]
#[command(name = "txlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the log data directory
    #[arg(global = true, short, long, default_value = ".txlog")]
    path: PathBuf,

    /// Directory relative targets resolve against
    #[arg(global = true, short, long)]
    root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List recent transactions, newest first
    List {
        /// Maximum number of transactions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Display one transaction (the latest if no id is given)
    Show {
        /// Transaction id
        id: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Commit an active transaction
    Commit {
        /// Transaction id
        id: String,
    },

    /// Roll back an active transaction
    Rollback {
        /// Transaction id
        id: String,

        /// Keep undoing after a failed operation
        #[arg(short, long)]
        continue_on_error: bool,
    },

    /// Remove finished transactions older than the retention window
    Cleanup {
        /// Retention window in days (defaults to the configured window)
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::default();
    if let Some(root) = cli.root {
        config = config.workspace_root(root);
    }

    match cli.command {
        Commands::List { limit, format } => {
            commands::list::run(&cli.path, config, limit, &format)?;
        }
        Commands::Show { id, format } => {
            commands::show::run(&cli.path, config, id.as_deref(), &format)?;
        }
        Commands::Commit { id } => {
            commands::commit::run(&cli.path, config, &id)?;
        }
        Commands::Rollback {
            id,
            continue_on_error,
        } => {
            commands::rollback::run(&cli.path, config, &id, continue_on_error)?;
        }
        Commands::Cleanup { days } => {
            commands::cleanup::run(&cli.path, config, days)?;
        }
        Commands::Version => {
            println!("txlog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("txlog Core v{}", txlog_core::VERSION);
        }
    }

    Ok(())
}
