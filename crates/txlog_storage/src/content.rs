//! Content store trait and backup snapshot types.

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Identifier of a stored backup.
///
/// Backup ids are 32 lowercase hex characters derived from the content
/// hash, a nanosecond timestamp and a random nonce. Two snapshots of the
/// same bytes therefore get distinct ids; the store is an undo log, not
/// a deduplicating blob store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupId(String);

impl BackupId {
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

    /// Returns true if the id is safe to use as a file name.
    ///
    /// Ids read back from persisted records are checked with this before
    /// they are turned into paths.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 128
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }

    fn derive(hash: &str, nanos: u128) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(hash.as_bytes());
        hasher.update(nanos.to_le_bytes());
        hasher.update(Uuid::new_v4().as_bytes());
        let digest = hasher.finalize();
        Self(to_hex(&digest[..16]))
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackupId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// An immutable snapshot of a resource taken before a destructive change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    /// Backup id.
    pub id: BackupId,
    /// Logical location the content was copied from.
    pub path: String,
    /// Raw content.
    #[serde(with = "content_repr")]
    pub content: Vec<u8>,
    /// Lowercase hex SHA-256 of `content`.
    pub hash: String,
    /// When the snapshot was taken (Unix milliseconds).
    pub timestamp: u64,
}

impl Backup {
    /// Creates a snapshot of `content` with a freshly derived id.
    #[must_use]
    pub fn new(path: impl Into<String>, content: Vec<u8>) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let hash = content_hash(&content);
        Self {
            id: BackupId::derive(&hash, now.as_nanos()),
            path: path.into(),
            content,
            hash,
            timestamp: now.as_millis() as u64,
        }
    }

    /// Checks the stored hash against the content.
    pub fn verify(&self) -> StorageResult<()> {
        let actual = content_hash(&self.content);
        if actual != self.hash {
            return Err(StorageError::Corrupted(format!(
                "backup {} hash mismatch: expected {}, got {}",
                self.id, self.hash, actual
            )));
        }
        Ok(())
    }

    /// Encodes the backup as a pretty-printed JSON envelope.
    pub fn to_json(&self) -> StorageResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decodes and verifies a JSON envelope.
    pub fn from_json(data: &[u8]) -> StorageResult<Self> {
        let backup: Self = serde_json::from_slice(data)?;
        backup.verify()?;
        Ok(backup)
    }
}

/// Computes the lowercase hex SHA-256 digest of `content`.
#[must_use]
pub fn content_hash(content: &[u8]) -> String {
    to_hex(&Sha256::digest(content))
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Text content is stored as a JSON string so backups stay readable;
/// anything that is not UTF-8 falls back to a byte array.
mod content_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Bytes(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(content: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(content) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.collect_seq(content),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.into_bytes(),
            Repr::Bytes(bytes) => bytes,
        })
    }
}

/// A content-addressed backup repository.
///
/// # Invariants
///
/// - `put` never overwrites an existing id
/// - `get(put(c))` returns exactly `c`
/// - `archive` relocates snapshots; it never discards them
/// - only `delete` and `purge_archive` remove data
///
/// # Implementors
///
/// - [`super::FileContentStore`] - one JSON envelope per backup on disk
/// - [`super::InMemoryContentStore`] - for tests and ephemeral logs
pub trait ContentStore: Send + Sync {
    /// Stores a snapshot of `content` taken from `path`.
    ///
    /// # Errors
    ///
    /// Returns `Write` if the underlying medium is unwritable.
    fn put(&self, path: &str, content: &[u8]) -> StorageResult<BackupId>;

    /// Retrieves a live (not yet archived) snapshot.
    ///
    /// # Errors
    ///
    /// Returns `BackupNotFound` if no live snapshot has this id. Callers
    /// performing a rollback treat that as a warning, not a failure.
    fn get(&self, id: &BackupId) -> StorageResult<Backup>;

    /// Returns true if a live snapshot with this id exists.
    fn contains(&self, id: &BackupId) -> bool;

    /// Moves the given snapshots into the archive area of `transaction_id`.
    ///
    /// Returns the number of snapshots relocated. Ids that are not live
    /// are skipped.
    fn archive(&self, ids: &[BackupId], transaction_id: &str) -> StorageResult<usize>;

    /// Retrieves a snapshot from the archive area of `transaction_id`.
    fn get_archived(&self, transaction_id: &str, id: &BackupId) -> StorageResult<Backup>;

    /// Permanently removes live snapshots. Returns how many existed.
    fn delete(&self, ids: &[BackupId]) -> StorageResult<usize>;

    /// Removes the whole archive area of `transaction_id`.
    ///
    /// Returns how many archived snapshots were removed.
    fn purge_archive(&self, transaction_id: &str) -> StorageResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn envelope_keeps_arbitrary_bytes(content in prop::collection::vec(any::<u8>(), 0..512)) {
            let backup = Backup::new("any", content.clone());
            let decoded = Backup::from_json(&backup.to_json().unwrap()).unwrap();
            prop_assert_eq!(decoded.content, content);
        }
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn same_content_gets_distinct_ids() {
        let a = Backup::new("a.txt", b"same".to_vec());
        let b = Backup::new("a.txt", b"same".to_vec());
        assert_ne!(a.id, b.id);
        assert_eq!(a.hash, b.hash);
        assert!(a.id.is_well_formed());
        assert_eq!(a.id.as_str().len(), 32);
    }

    #[test]
    fn text_envelope_is_readable() {
        let backup = Backup::new("notes.md", b"hello".to_vec());
        let json: serde_json::Value = serde_json::from_slice(&backup.to_json().unwrap()).unwrap();

        assert_eq!(json["path"], "notes.md");
        assert_eq!(json["content"], "hello");
        assert_eq!(json["hash"], backup.hash);
    }

    #[test]
    fn binary_envelope_survives_decode() {
        let backup = Backup::new("blob.bin", vec![0xff, 0x00, 0xfe]);
        let decoded = Backup::from_json(&backup.to_json().unwrap()).unwrap();
        assert_eq!(decoded, backup);
    }

    #[test]
    fn tampered_envelope_is_rejected() {
        let mut backup = Backup::new("a.txt", b"original".to_vec());
        backup.content = b"tampered".to_vec();
        let err = Backup::from_json(&backup.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, StorageError::Corrupted(_)));
    }

    #[test]
    fn malformed_ids_are_detected() {
        assert!(!BackupId::new("").is_well_formed());
        assert!(!BackupId::new("../escape").is_well_formed());
        assert!(BackupId::new("0123abcd").is_well_formed());
    }
}
