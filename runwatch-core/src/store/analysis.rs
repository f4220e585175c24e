// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only queries over the store: incomplete tests, failures, slow tests and statistics.
//!
//! Everything here is a synchronous computation over in-memory data. Nothing is cached, so results
//! reflect the state of the store at the time of the call.

use super::TestRecordStore;
use crate::{
    record::{LifecycleState, TestRecord},
    stats::RunStatsSnapshot,
};
use std::time::{Duration, Instant};

impl TestRecordStore {
    /// Returns every test that started but hasn't finished, oldest first.
    ///
    /// Records are sorted ascending by start time, with ties in discovery order. The last element
    /// is the most recently started test; the first is the longest-running one and therefore the
    /// most likely to be stuck.
    ///
    /// This doesn't modify the store, so it can be called any number of times.
    pub fn snapshot_incomplete(&self) -> Vec<&TestRecord> {
        let mut incomplete: Vec<_> = self
            .records()
            .iter()
            .filter(|record| record.is_running())
            .collect();
        // sort_by_key is stable, and records are already in discovery order.
        incomplete.sort_by_key(|record| record.started_at());
        incomplete
    }

    /// Returns every failed test, in discovery order.
    pub fn failed_tests(&self) -> Vec<&TestRecord> {
        self.records()
            .iter()
            .filter(|record| record.state() == LifecycleState::Failed)
            .collect()
    }

    /// Returns up to `limit` finished, non-skipped tests, slowest first.
    ///
    /// Tests with equal durations are kept in discovery order.
    pub fn slow_tests(&self, limit: usize) -> Vec<&TestRecord> {
        self.rank_by_duration(limit, |_| true)
    }

    /// Like [`Self::slow_tests`], but only considers tests that took longer than `threshold`.
    pub fn slow_tests_above(&self, threshold: Duration, limit: usize) -> Vec<&TestRecord> {
        self.rank_by_duration(limit, |duration| duration > threshold)
    }

    fn rank_by_duration(
        &self,
        limit: usize,
        mut include: impl FnMut(Duration) -> bool,
    ) -> Vec<&TestRecord> {
        let mut ranked: Vec<(&TestRecord, Duration)> = self
            .records()
            .iter()
            .filter(|record| {
                matches!(
                    record.state(),
                    LifecycleState::Passed | LifecycleState::Failed
                )
            })
            .filter_map(|record| record.duration().map(|duration| (record, duration)))
            .filter(|&(_, duration)| include(duration))
            .collect();

        // Stable sort: ties stay in discovery order.
        ranked.sort_by(|(_, a), (_, b)| b.cmp(a));
        ranked.truncate(limit);
        ranked.into_iter().map(|(record, _)| record).collect()
    }

    /// The number of tests that started but haven't finished.
    pub fn incomplete_count(&self) -> usize {
        let stats = self.raw_stats();
        stats.total_tests - stats.finished_count
    }

    /// Returns a fresh snapshot of the run's statistics as of `now`.
    pub fn stats_at(&self, now: Instant) -> RunStatsSnapshot {
        let snapshot = self.stopwatch().snapshot_at(now);
        RunStatsSnapshot {
            stats: self.raw_stats(),
            incomplete: self.incomplete_count(),
            start_time: snapshot.start_time,
            elapsed: snapshot.duration,
        }
    }

    /// Returns a fresh snapshot of the run's statistics.
    pub fn stats(&self) -> RunStatsSnapshot {
        self.stats_at(Instant::now())
    }
}
