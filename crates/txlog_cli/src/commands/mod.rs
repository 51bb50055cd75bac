//! CLI command implementations.

pub mod cleanup;
pub mod commit;
pub mod list;
pub mod rollback;
pub mod show;

use std::path::{Path, PathBuf};
use thiserror::Error;
use txlog_core::{Config, CoreError, TransactionManager};

/// Errors reported by the CLI itself.
#[derive(Debug, Error)]
pub enum CliError {
    /// The data directory has no operation log.
    #[error("no operation log found at {0:?}")]
    NoLog(PathBuf),

    /// The log is empty.
    #[error("no transactions recorded")]
    Empty,

    /// Unsupported `--format` value.
    #[error("unknown output format: {0} (expected text or json)")]
    Format(String),

    /// Error from the operation log.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// JSON output failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Output format of listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human readable.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl Format {
    /// Parses a `--format` value.
    pub fn parse(format: &str) -> Result<Self, CliError> {
        match format {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CliError::Format(other.to_string())),
        }
    }
}

/// Opens the log at `path`, refusing to create one from scratch.
pub fn open(path: &Path, config: Config) -> Result<TransactionManager, CliError> {
    if !path.join("transactions").is_dir() {
        return Err(CliError::NoLog(path.to_path_buf()));
    }
    Ok(TransactionManager::open(path, config)?)
}

/// Formats epoch milliseconds as a UTC timestamp.
pub fn format_timestamp(ms: u64) -> String {
    let secs = ms / 1000;
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02} {:02}:{:02}:{:02} UTC",
        rem / 3600,
        (rem / 60) % 60,
        rem % 60
    )
}

/// Formats a duration in milliseconds.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms} ms")
    } else {
        format!("{:.1} s", ms as f64 / 1000.0)
    }
}

/// Converts days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_formats() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn known_instant_formats() {
        // 2024-02-29 12:34:56 UTC
        assert_eq!(
            format_timestamp(1_709_210_096_000),
            "2024-02-29 12:34:56 UTC"
        );
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(42), "42 ms");
        assert_eq!(format_duration(1500), "1.5 s");
    }

    #[test]
    fn formats_parse() {
        assert_eq!(Format::parse("json").unwrap(), Format::Json);
        assert!(matches!(Format::parse("xml"), Err(CliError::Format(_))));
    }
}
