// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-test lifecycle records.

use crate::events::{TestError, TestKey};
use camino::Utf8Path;
use std::{
    fmt,
    time::{Duration, Instant},
};

/// The identifier of a [`TestRecord`] within a [`TestRecordStore`](crate::store::TestRecordStore).
///
/// Records are never removed during a run, so a `RecordId` stays valid for the lifetime of the
/// store that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub(crate) usize);

impl RecordId {
    /// Returns the discovery index of this record: 0 for the first record seen, and so on.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The lifecycle state of a test.
///
/// `Running` is the initial state; the other three are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// The test started and hasn't finished yet.
    Running,

    /// The test passed.
    Passed,

    /// The test failed.
    Failed,

    /// The test was skipped.
    Skipped,
}

impl LifecycleState {
    /// Returns true if this is a terminal state.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// How a test finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestOutcome {
    /// The test passed.
    Passed,

    /// The test failed, with an error if the runner reported one.
    Failed(Option<TestError>),

    /// The test was skipped.
    Skipped,
}

impl TestOutcome {
    pub(crate) fn state(&self) -> LifecycleState {
        match self {
            Self::Passed => LifecycleState::Passed,
            Self::Failed(_) => LifecycleState::Failed,
            Self::Skipped => LifecycleState::Skipped,
        }
    }
}

/// A single test execution attempt.
#[derive(Clone, Debug)]
pub struct TestRecord {
    id: RecordId,
    key: TestKey,
    parent: Option<RecordId>,
    started_at: Instant,
    state: LifecycleState,
    duration: Option<Duration>,
    error: Option<TestError>,
}

impl TestRecord {
    pub(crate) fn new(
        id: RecordId,
        key: TestKey,
        parent: Option<RecordId>,
        started_at: Instant,
    ) -> Self {
        Self {
            id,
            key,
            parent,
            started_at,
            state: LifecycleState::Running,
            duration: None,
            error: None,
        }
    }

    /// Moves a running record into a terminal state.
    ///
    /// A reported duration takes precedence over the one measured from `started_at`. Returns false,
    /// leaving the record untouched, if the record is already terminal.
    pub(crate) fn finish(
        &mut self,
        outcome: TestOutcome,
        reported: Option<Duration>,
        now: Instant,
    ) -> bool {
        if self.state.is_terminal() {
            return false;
        }

        self.state = outcome.state();
        self.duration =
            Some(reported.unwrap_or_else(|| now.saturating_duration_since(self.started_at)));
        if let TestOutcome::Failed(error) = outcome {
            self.error = error;
        }
        true
    }

    /// The identifier of this record.
    #[inline]
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// The identity of the test.
    #[inline]
    pub fn key(&self) -> &TestKey {
        &self.key
    }

    /// The name of the test.
    #[inline]
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// The file the test is in, if known.
    #[inline]
    pub fn file(&self) -> Option<&Utf8Path> {
        self.key.file.as_deref()
    }

    /// The nesting depth of the test.
    #[inline]
    pub fn nesting(&self) -> usize {
        self.key.nesting
    }

    /// The enclosing group, if any.
    #[inline]
    pub fn parent(&self) -> Option<RecordId> {
        self.parent
    }

    /// When the test started, on the monotonic clock.
    #[inline]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// The current lifecycle state.
    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Returns true if the test hasn't finished.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    /// The duration of the test. `None` while the test is running.
    #[inline]
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// The error, present only for failed tests that reported one.
    #[inline]
    pub fn error(&self) -> Option<&TestError> {
        self.error.as_ref()
    }

    /// How long the test has been running as of `now`, or its final duration if it's finished.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        self.duration
            .unwrap_or_else(|| now.saturating_duration_since(self.started_at))
    }
}
