//! # txlog Testkit
//!
//! Test utilities for txlog.
//!
//! This crate provides:
//! - A temporary workspace plus log directory wired to a manager
//! - Test doubles for restore hooks
//! - Property-based test generators using proptest
//!
//! The cross-crate integration tests live in this crate's `tests/`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use txlog_testkit::prelude::*;
//!
//! #[test]
//! fn undo_an_edit() {
//!     let log = TestLog::file();
//!     log.write("a.txt", "old");
//!     let txn = log.begin("edit");
//!     log.record_operation(&txn, OperationRequest::update("a.txt", "new")).unwrap();
//!     log.write("a.txt", "new");
//!     log.rollback_transaction(&txn, RollbackOptions::default()).unwrap();
//!     assert_eq!(log.read("a.txt").as_deref(), Some("old"));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod doubles;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::doubles::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use txlog_core::{
        BeginOptions, Config, CoreError, OperationKind, OperationRequest, RollbackOptions,
        TransactionId, TransactionStatus,
    };
}

pub use doubles::*;
pub use fixtures::*;
pub use generators::*;
