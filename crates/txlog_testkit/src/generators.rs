//! Property-based test generators using proptest.

use proptest::prelude::*;
use txlog_core::OperationKind;

/// Number of distinct workspace files a [`Step`] plan touches.
pub const PLAN_FILES: usize = 4;

/// One mutation in a generated plan.
///
/// Whether a `Write` is recorded as a create or an update depends on
/// whether the file exists when the step runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Write `content` to file number `file`.
    Write {
        /// Index into the plan's files.
        file: usize,
        /// New content.
        content: String,
    },
    /// Delete file number `file` if it exists.
    Remove {
        /// Index into the plan's files.
        file: usize,
    },
}

impl Step {
    /// Returns the file name the step touches.
    pub fn file_name(&self) -> String {
        let (Self::Write { file, .. } | Self::Remove { file }) = self;
        plan_file(*file)
    }
}

/// Name of plan file `index`.
pub fn plan_file(index: usize) -> String {
    format!("file_{index}.txt")
}

/// Strategy for file contents, including empty and non-ASCII text.
pub fn content_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z0-9 ]{1,32}",
        "\\PC{1,16}",
    ]
}

/// Strategy for a single plan step.
pub fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0..PLAN_FILES, content_strategy())
            .prop_map(|(file, content)| Step::Write { file, content }),
        1 => (0..PLAN_FILES).prop_map(|file| Step::Remove { file }),
    ]
}

/// Strategy for a mutation plan of 1 to `max_len` steps.
pub fn plan_strategy(max_len: usize) -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(step_strategy(), 1..=max_len)
}

/// Strategy for the initial contents of the plan files; `None` is absent.
pub fn initial_state_strategy() -> impl Strategy<Value = Vec<Option<String>>> {
    prop::collection::vec(prop::option::of(content_strategy()), PLAN_FILES)
}

/// Strategy for a structured (hook-restored) operation kind.
pub fn structured_kind_strategy() -> impl Strategy<Value = OperationKind> {
    prop_oneof![
        Just(OperationKind::ManifestUpdate),
        Just(OperationKind::MetadataUpdate),
    ]
}
