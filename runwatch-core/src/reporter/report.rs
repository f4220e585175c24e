// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The outbound contract: data handed from the tracker to a displayer.

use crate::{
    config::TrackerConfig,
    events::OutputStream,
    record::{RecordId, TestRecord},
    stats::RunStatsSnapshot,
    store::{FileGroup, TestRecordStore},
    tracker::Tracker,
};
use camino::Utf8Path;
use std::time::{Duration, Instant};

/// A single item to report.
#[derive(Clone, Debug)]
pub enum ReportItem<'a> {
    /// Every test in a file has finished.
    FileHeader {
        /// The file path. `None` for tests that didn't report a file.
        path: Option<&'a Utf8Path>,

        /// The number of tests in the file that passed.
        passed: usize,

        /// The total number of tests in the file.
        total: usize,
    },

    /// The status of a single test.
    TestLine {
        /// The record being reported.
        record: &'a TestRecord,

        /// The record's name along with the names of its ancestors, root first.
        breadcrumb: Vec<&'a str>,

        /// True if the test is still running.
        is_running: bool,

        /// How long the test has been running for, if it's running.
        running_elapsed: Option<Duration>,
    },

    /// Output written by a test, passed through as is.
    Output {
        /// The stream the output was written to.
        stream: OutputStream,

        /// The output text.
        message: &'a str,
    },

    /// Tests that never finished.
    Incomplete(IncompleteReport<'a>),

    /// The end-of-run summary.
    Summary(SummaryReport<'a>),
}

impl<'a> ReportItem<'a> {
    /// Creates a header for a file group.
    pub fn file_header(group: &'a FileGroup) -> Self {
        Self::FileHeader {
            path: group.path(),
            passed: group.passed(),
            total: group.total(),
        }
    }

    /// Creates a line for the record `id` as of `now`. Returns `None` if `id` isn't in `store`.
    pub fn test_line(store: &'a TestRecordStore, id: RecordId, now: Instant) -> Option<Self> {
        let record = store.record(id)?;
        let is_running = record.is_running();
        Some(Self::TestLine {
            record,
            breadcrumb: store.breadcrumb(id),
            is_running,
            running_elapsed: is_running.then(|| record.elapsed_at(now)),
        })
    }
}

/// An entry in an [`IncompleteReport`].
#[derive(Clone, Debug)]
pub struct IncompleteEntry<'a> {
    /// The record that never finished.
    pub record: &'a TestRecord,

    /// The record's name along with the names of its ancestors, root first.
    pub breadcrumb: Vec<&'a str>,

    /// How long the test had been running when the report was taken.
    pub elapsed: Duration,
}

/// Tests that started but never finished, ordered by start time.
///
/// The first entry is the longest-running test and therefore the most likely culprit for a hang;
/// displayers are expected to call it out last, where it's most visible.
#[derive(Clone, Debug)]
pub struct IncompleteReport<'a> {
    entries: Vec<IncompleteEntry<'a>>,
}

impl<'a> IncompleteReport<'a> {
    /// Takes a snapshot of the incomplete tests in `store` as of `now`.
    pub fn new(store: &'a TestRecordStore, now: Instant) -> Self {
        let entries = store
            .snapshot_incomplete()
            .into_iter()
            .map(|record| IncompleteEntry {
                record,
                breadcrumb: store.breadcrumb(record.id()),
                elapsed: record.elapsed_at(now),
            })
            .collect();
        Self { entries }
    }

    /// The entries, oldest first.
    pub fn entries(&self) -> &[IncompleteEntry<'a>] {
        &self.entries
    }

    /// The number of incomplete tests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if every test finished.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The test most likely to be stuck: the one that has been running the longest.
    pub fn likely_culprit(&self) -> Option<&IncompleteEntry<'a>> {
        self.entries.first()
    }
}

/// The end-of-run summary.
#[derive(Clone, Debug)]
pub struct SummaryReport<'a> {
    /// Statistics for the run.
    pub stats: RunStatsSnapshot,

    /// Failed tests, in discovery order, along with their breadcrumbs.
    pub failed: Vec<(&'a TestRecord, Vec<&'a str>)>,

    /// The slowest tests that took longer than the configured warning threshold, slowest first.
    pub slow: Vec<(&'a TestRecord, Vec<&'a str>)>,

    /// Diagnostic messages reported by the runner.
    pub diagnostics: &'a [String],
}

impl<'a> SummaryReport<'a> {
    /// Builds a summary of `tracker` as of `now`.
    pub fn new(tracker: &'a Tracker, config: &TrackerConfig, now: Instant) -> Self {
        let store = tracker.store();
        let with_breadcrumb =
            |record: &'a TestRecord| (record, store.breadcrumb(record.id()));

        Self {
            stats: store.stats_at(now),
            failed: store
                .failed_tests()
                .into_iter()
                .map(with_breadcrumb)
                .collect(),
            slow: store
                .slow_tests_above(config.timeout_warning(), config.slow_limit())
                .into_iter()
                .map(with_breadcrumb)
                .collect(),
            diagnostics: tracker.diagnostics(),
        }
    }
}
