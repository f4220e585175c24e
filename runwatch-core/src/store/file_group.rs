// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::record::{LifecycleState, RecordId};
use camino::{Utf8Path, Utf8PathBuf};

/// Records that share a file, in the order they were first seen.
#[derive(Clone, Debug)]
pub struct FileGroup {
    path: Option<Utf8PathBuf>,
    records: Vec<RecordId>,
    completed: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
}

impl FileGroup {
    pub(super) fn new(path: Option<Utf8PathBuf>) -> Self {
        Self {
            path,
            records: Vec::new(),
            completed: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
        }
    }

    pub(super) fn push(&mut self, id: RecordId) {
        self.records.push(id);
    }

    pub(super) fn on_test_finished(&mut self, state: LifecycleState) {
        match state {
            LifecycleState::Passed => self.passed += 1,
            LifecycleState::Failed => self.failed += 1,
            LifecycleState::Skipped => self.skipped += 1,
            LifecycleState::Running => return,
        }
        self.completed += 1;
        debug_assert!(
            self.completed <= self.records.len(),
            "completed count exceeds total for {:?}",
            self.path
        );
    }

    /// The file path. `None` for the group of tests that didn't report a file.
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// The records in this group, in first-seen order.
    pub fn records(&self) -> &[RecordId] {
        &self.records
    }

    /// The number of records in this group.
    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// The number of records that finished.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// The number of records that passed.
    pub fn passed(&self) -> usize {
        self.passed
    }

    /// The number of records that failed.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// The number of records that were skipped.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Returns true if every record in this group has finished.
    ///
    /// An empty group is never done.
    pub fn is_done(&self) -> bool {
        !self.records.is_empty() && self.completed == self.records.len()
    }
}
