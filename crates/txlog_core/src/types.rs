//! Core type definitions for txlog.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Returns the current time as Unix epoch milliseconds.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Unique identifier for a transaction.
///
/// Ids have the shape `txn-<millis>-<random>`: the zero-padded timestamp
/// makes lexical order match creation order and the 64-bit random suffix
/// makes ids unguessable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Generates a fresh id stamped with `millis`.
    #[must_use]
    pub fn generate_at(millis: u64) -> Self {
        let suffix = &Uuid::new_v4().simple().to_string()[..16];
        Self(format!("txn-{millis:013}-{suffix}"))
    }

    /// Wraps an existing id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id can safely name a file.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 128
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TransactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of an operation, unique within its transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Creates the id of the operation at 1-based `ordinal`.
    #[must_use]
    pub fn for_ordinal(ordinal: usize) -> Self {
        Self(format!("op-{ordinal:04}"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_sort_by_creation_time() {
        let earlier = TransactionId::generate_at(999);
        let later = TransactionId::generate_at(1_000);
        assert!(earlier < later);
    }

    #[test]
    fn generated_ids_are_unique_and_well_formed() {
        let a = TransactionId::generate_at(42);
        let b = TransactionId::generate_at(42);
        assert_ne!(a, b);
        assert!(a.is_well_formed());
        assert!(a.as_str().starts_with("txn-0000000000042-"));
    }

    #[test]
    fn path_like_ids_are_rejected() {
        assert!(!TransactionId::new("../x").is_well_formed());
        assert!(!TransactionId::new("").is_well_formed());
    }

    #[test]
    fn operation_ids_are_zero_padded() {
        assert_eq!(OperationId::for_ordinal(7).as_str(), "op-0007");
    }
}
