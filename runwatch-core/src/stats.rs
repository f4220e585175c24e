// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run-wide counters.

use crate::{exit_codes::RunwatchExitCode, record::LifecycleState};
use chrono::{DateTime, Local};
use std::time::Duration;

/// Statistics for a test run, updated incrementally as tests start and finish.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RunStats {
    /// The number of distinct files seen so far. Tests without a file aren't counted here.
    pub total_files: usize,

    /// The total number of tests that started, including skips reported without a start.
    pub total_tests: usize,

    /// The total number of tests that finished.
    pub finished_count: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed.
    pub failed: usize,

    /// The number of tests that were skipped.
    pub skipped: usize,
}

impl RunStats {
    /// Returns true if any tests failed.
    #[inline]
    pub fn any_failed(&self) -> bool {
        self.failed > 0
    }

    pub(crate) fn on_file_discovered(&mut self) {
        self.total_files += 1;
    }

    pub(crate) fn on_test_started(&mut self) {
        self.total_tests += 1;
    }

    pub(crate) fn on_test_finished(&mut self, state: LifecycleState) {
        let counter = match state {
            LifecycleState::Passed => &mut self.passed,
            LifecycleState::Failed => &mut self.failed,
            LifecycleState::Skipped => &mut self.skipped,
            // Running isn't a finished state.
            LifecycleState::Running => return,
        };
        *counter += 1;
        self.finished_count += 1;
    }
}

/// A point-in-time view of a run, computed fresh on every call to
/// [`TestRecordStore::stats`](crate::store::TestRecordStore::stats).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RunStatsSnapshot {
    /// Counters as of the snapshot.
    pub stats: RunStats,

    /// The number of tests that were running at the time of the snapshot.
    pub incomplete: usize,

    /// The wall-clock time at which the run started.
    pub start_time: DateTime<Local>,

    /// The time elapsed since the run started.
    pub elapsed: Duration,
}

impl RunStatsSnapshot {
    /// Returns true if the run is a success so far: no failures and nothing left running.
    pub fn is_success(&self) -> bool {
        !self.stats.any_failed() && self.incomplete == 0
    }

    /// The exit code for a run that ended with this snapshot.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            RunwatchExitCode::OK
        } else {
            RunwatchExitCode::TEST_RUN_FAILED
        }
    }

    /// The wall-clock time as of this snapshot.
    pub fn end_time(&self) -> DateTime<Local> {
        self.start_time + self.elapsed
    }
}
