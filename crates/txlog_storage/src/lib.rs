//! # txlog Storage
//!
//! Content-addressed backup storage for the txlog operation log.
//!
//! A backup is an immutable snapshot of a resource taken right before a
//! destructive change. The store keeps snapshots keyed by an id derived
//! from the content hash, relocates them into a per-transaction archive
//! once the transaction commits, and deletes them when the retention
//! window runs out.
//!
//! ## Available Stores
//!
//! - [`FileContentStore`] - one JSON envelope per backup on disk
//! - [`InMemoryContentStore`] - for testing and ephemeral logs
//!
//! The [`atomic`] module holds the write-then-rename helpers every
//! on-disk document of the log is written with.
//!
//! ## Example
//!
//! ```rust
//! use txlog_storage::{ContentStore, InMemoryContentStore};
//!
//! let store = InMemoryContentStore::new();
//! let id = store.put("config.toml", b"debug = true").unwrap();
//! let backup = store.get(&id).unwrap();
//! assert_eq!(backup.content, b"debug = true");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod atomic;
mod content;
mod error;
mod file;
mod memory;

pub use content::{content_hash, Backup, BackupId, ContentStore};
pub use error::{StorageError, StorageResult};
pub use file::{FileContentStore, ARCHIVE_DIR};
pub use memory::InMemoryContentStore;
