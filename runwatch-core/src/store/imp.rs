// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::FileGroup;
use crate::{
    events::TestKey,
    hierarchy::HierarchyResolver,
    record::{RecordId, TestOutcome, TestRecord},
    stats::RunStats,
    time::{StopwatchStart, stopwatch},
};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};
use tracing::debug;

/// The result of [`TestRecordStore::complete_test`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// A running record was moved into a terminal state.
    Completed(RecordId),

    /// No record was ever started for this key. Nothing changed.
    ///
    /// This happens legitimately if the consumer started observing the stream midway through.
    WithoutStart,

    /// Every record for this key had already finished. Nothing changed; the most recent record is
    /// returned.
    Duplicate(RecordId),
}

impl Completion {
    /// The record that was completed, if any.
    pub fn completed(self) -> Option<RecordId> {
        match self {
            Self::Completed(id) => Some(id),
            Self::WithoutStart | Self::Duplicate(_) => None,
        }
    }
}

/// Per-key bookkeeping.
///
/// Keys can collide (two tests with the same name at the same depth in the same file). Each start
/// gets a fresh record, and running records are completed in the order they started, so a
/// collision never hides a test that is genuinely still running.
#[derive(Debug)]
struct KeySlot {
    running: VecDeque<RecordId>,
    latest: RecordId,
}

/// Owns every test record and file group for a single run.
#[derive(Debug)]
pub struct TestRecordStore {
    stopwatch: StopwatchStart,
    records: Vec<TestRecord>,
    by_key: HashMap<TestKey, KeySlot>,
    files: IndexMap<Utf8PathBuf, FileGroup>,
    unknown_file: FileGroup,
    hierarchy: HierarchyResolver,
    stats: RunStats,
}

impl Default for TestRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRecordStore {
    /// Creates an empty store. The run's clock starts now.
    pub fn new() -> Self {
        Self {
            stopwatch: stopwatch(),
            records: Vec::new(),
            by_key: HashMap::new(),
            files: IndexMap::new(),
            unknown_file: FileGroup::new(None),
            hierarchy: HierarchyResolver::new(),
            stats: RunStats::default(),
        }
    }

    /// The instant at which the run started, on the monotonic clock.
    pub fn run_started_at(&self) -> Instant {
        self.stopwatch.start_instant()
    }

    /// Starts tracking a new execution of `key`, as of `now`.
    ///
    /// A new record is created even if `key` has been seen before.
    pub fn start_test(&mut self, key: TestKey, now: Instant) -> RecordId {
        let id = RecordId(self.records.len());
        let parent = self.hierarchy.push(key.file.as_ref(), key.nesting, id);

        match self.by_key.get_mut(&key) {
            Some(slot) => {
                debug!(%key, "key collision: tracking a new execution");
                slot.running.push_back(id);
                slot.latest = id;
            }
            None => {
                self.by_key.insert(
                    key.clone(),
                    KeySlot {
                        running: VecDeque::from([id]),
                        latest: id,
                    },
                );
            }
        }

        match &key.file {
            Some(path) => {
                if !self.files.contains_key(path) {
                    self.files
                        .insert(path.clone(), FileGroup::new(Some(path.clone())));
                    self.stats.on_file_discovered();
                }
                if let Some(group) = self.files.get_mut(path) {
                    group.push(id);
                }
            }
            None => self.unknown_file.push(id),
        }

        self.stats.on_test_started();
        self.records.push(TestRecord::new(id, key, parent, now));
        id
    }

    /// Finishes the oldest running execution of `key`.
    ///
    /// `reported` is the duration measured by the runner; if absent, the duration is measured from
    /// the record's start time to `now`. Counters are updated exactly once per record: completing a
    /// key that isn't running is a no-op.
    pub fn complete_test(
        &mut self,
        key: &TestKey,
        outcome: TestOutcome,
        reported: Option<Duration>,
        now: Instant,
    ) -> Completion {
        let Some(slot) = self.by_key.get_mut(key) else {
            debug!(%key, "completion without a matching start");
            return Completion::WithoutStart;
        };
        let Some(id) = slot.running.pop_front() else {
            debug!(%key, "duplicate completion ignored");
            return Completion::Duplicate(slot.latest);
        };

        let record = &mut self.records[id.0];
        if !record.finish(outcome, reported, now) {
            // Only running records are queued, so this shouldn't happen.
            return Completion::Duplicate(id);
        }

        let state = record.state();
        let group = match &record.key().file {
            Some(path) => self.files.get_mut(path),
            None => Some(&mut self.unknown_file),
        };
        if let Some(group) = group {
            group.on_test_finished(state);
        }
        self.stats.on_test_finished(state);

        Completion::Completed(id)
    }

    /// Marks `key` as skipped.
    ///
    /// Runners may report a skip without a preceding start. In that case a record is created and
    /// immediately completed; otherwise the oldest running execution is completed as skipped.
    pub fn skip_test(
        &mut self,
        key: TestKey,
        reported: Option<Duration>,
        now: Instant,
    ) -> Completion {
        let is_running = self
            .by_key
            .get(&key)
            .is_some_and(|slot| !slot.running.is_empty());

        if !is_running {
            self.start_test(key.clone(), now);
        }
        self.complete_test(&key, TestOutcome::Skipped, reported, now)
    }

    /// Returns the record with the given id.
    ///
    /// Ids handed out by this store are always valid.
    pub fn record(&self, id: RecordId) -> Option<&TestRecord> {
        self.records.get(id.0)
    }

    /// Every record, in discovery order.
    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    /// The most recent record for `key`, if any.
    pub fn latest(&self, key: &TestKey) -> Option<&TestRecord> {
        self.by_key
            .get(key)
            .and_then(|slot| self.records.get(slot.latest.0))
    }

    /// The group for `path`, or the group of tests without a file if `path` is `None`.
    pub fn file_group(&self, path: Option<&Utf8Path>) -> Option<&FileGroup> {
        match path {
            Some(path) => self.files.get(path),
            None if self.unknown_file.total() > 0 => Some(&self.unknown_file),
            None => None,
        }
    }

    /// Every file group in first-seen order, followed by the group of tests without a file if it
    /// has any records.
    pub fn file_groups(&self) -> impl Iterator<Item = &FileGroup> {
        let unknown = (self.unknown_file.total() > 0).then_some(&self.unknown_file);
        self.files.values().chain(unknown)
    }

    /// The names of this record and its ancestors, root first.
    pub fn breadcrumb(&self, id: RecordId) -> Vec<&str> {
        let mut names = Vec::new();
        let mut current = self.record(id);
        while let Some(record) = current {
            names.push(record.name());
            // Parents always have a lower id, so this terminates.
            current = record.parent().and_then(|parent| self.record(parent));
        }
        names.reverse();
        names
    }

    /// The breadcrumb of this record joined with ` > `.
    pub fn display_name(&self, id: RecordId) -> String {
        self.breadcrumb(id).join(" > ")
    }

    pub(super) fn raw_stats(&self) -> RunStats {
        self.stats
    }

    pub(super) fn stopwatch(&self) -> &StopwatchStart {
        &self.stopwatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{events::TestError, record::LifecycleState};
    use pretty_assertions::assert_eq;

    fn key(file: Option<&str>, nesting: usize, name: &str) -> TestKey {
        TestKey::new(file.map(Utf8PathBuf::from), nesting, name)
    }

    #[test]
    fn start_and_complete() {
        let mut store = TestRecordStore::new();
        let t0 = store.run_started_at();
        let a = key(Some("f"), 0, "a");

        let id = store.start_test(a.clone(), t0);
        assert!(store.record(id).expect("valid id").is_running());

        let completion = store.complete_test(
            &a,
            TestOutcome::Passed,
            Some(Duration::from_millis(45)),
            t0 + Duration::from_secs(1),
        );
        assert_eq!(completion, Completion::Completed(id));

        let record = store.record(id).expect("valid id");
        assert_eq!(record.state(), LifecycleState::Passed);
        assert_eq!(record.duration(), Some(Duration::from_millis(45)));

        let group = store.file_group(Some(Utf8Path::new("f"))).expect("group exists");
        assert_eq!((group.completed(), group.total()), (1, 1));
        assert!(group.is_done());
        assert_eq!(store.raw_stats().total_files, 1);
    }

    #[test]
    fn completion_without_start_is_noop() {
        let mut store = TestRecordStore::new();
        let now = store.run_started_at();
        let completion =
            store.complete_test(&key(Some("f"), 0, "ghost"), TestOutcome::Passed, None, now);
        assert_eq!(completion, Completion::WithoutStart);
        assert_eq!(store.raw_stats(), RunStats::default());
        assert!(store.records().is_empty());
    }

    #[test]
    fn duplicate_completion_is_idempotent() {
        let mut store = TestRecordStore::new();
        let now = store.run_started_at();
        let a = key(Some("f"), 0, "a");
        let id = store.start_test(a.clone(), now);

        let error = TestError {
            message: "boom".to_owned(),
            stack: None,
        };
        store.complete_test(&a, TestOutcome::Failed(Some(error.clone())), None, now);
        let once = store.raw_stats();

        let again = store.complete_test(&a, TestOutcome::Passed, None, now);
        assert_eq!(again, Completion::Duplicate(id));
        assert_eq!(store.raw_stats(), once);

        let record = store.record(id).expect("valid id");
        assert_eq!(record.state(), LifecycleState::Failed);
        assert_eq!(record.error(), Some(&error));
        assert_eq!(once.failed, 1);
    }

    #[test]
    fn missing_file_uses_unknown_group() {
        let mut store = TestRecordStore::new();
        let now = store.run_started_at();
        store.start_test(key(None, 0, "anon"), now);

        assert_eq!(store.raw_stats().total_files, 0);
        assert_eq!(store.raw_stats().total_tests, 1);
        let group = store.file_group(None).expect("unknown group has records");
        assert_eq!(group.path(), None);
        assert_eq!(group.total(), 1);
        assert_eq!(store.file_groups().count(), 1);
    }

    #[test]
    fn skip_without_start() {
        let mut store = TestRecordStore::new();
        let now = store.run_started_at();
        let id = store
            .skip_test(key(Some("f"), 0, "s"), None, now)
            .completed()
            .expect("skip completes a record");

        let record = store.record(id).expect("valid id");
        assert_eq!(record.state(), LifecycleState::Skipped);
        assert_eq!(record.duration(), Some(Duration::ZERO));
        let stats = store.raw_stats();
        assert_eq!((stats.total_tests, stats.skipped), (1, 1));
    }

    #[test]
    fn skip_completes_running_record() {
        let mut store = TestRecordStore::new();
        let now = store.run_started_at();
        let s = key(Some("f"), 0, "s");
        let started = store.start_test(s.clone(), now);
        let skipped = store.skip_test(s, None, now + Duration::from_millis(5));

        assert_eq!(skipped, Completion::Completed(started));
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.raw_stats().skipped, 1);
    }

    #[test]
    fn colliding_keys_complete_in_start_order() {
        let mut store = TestRecordStore::new();
        let t0 = store.run_started_at();
        let dup = key(Some("f"), 1, "generated");

        let first = store.start_test(dup.clone(), t0);
        let second = store.start_test(dup.clone(), t0 + Duration::from_millis(10));
        assert_eq!(store.latest(&dup).map(TestRecord::id), Some(second));

        assert_eq!(
            store.complete_test(&dup, TestOutcome::Passed, None, t0),
            Completion::Completed(first)
        );
        // The second execution is still running and must not be lost.
        assert!(store.record(second).expect("valid id").is_running());
        assert_eq!(
            store.complete_test(&dup, TestOutcome::Passed, None, t0),
            Completion::Completed(second)
        );
        assert_eq!(
            store.complete_test(&dup, TestOutcome::Passed, None, t0),
            Completion::Duplicate(second)
        );
        assert_eq!(store.raw_stats().passed, 2);
    }

    #[test]
    fn restart_after_finish_creates_new_record() {
        let mut store = TestRecordStore::new();
        let now = store.run_started_at();
        let a = key(Some("f"), 0, "a");
        let first = store.start_test(a.clone(), now);
        store.complete_test(&a, TestOutcome::Passed, None, now);
        let second = store.start_test(a.clone(), now);

        assert_ne!(first, second);
        assert!(!store.record(first).expect("valid id").is_running());
        assert!(store.record(second).expect("valid id").is_running());
        let group = store.file_group(Some(Utf8Path::new("f"))).expect("group exists");
        assert_eq!((group.completed(), group.total()), (1, 2));
        assert!(!group.is_done());
    }

    #[test]
    fn breadcrumb_walks_to_root() {
        let mut store = TestRecordStore::new();
        let now = store.run_started_at();
        store.start_test(key(Some("f"), 0, "suite"), now);
        store.start_test(key(Some("f"), 1, "group"), now);
        let leaf = store.start_test(key(Some("f"), 2, "leaf"), now);

        assert_eq!(store.breadcrumb(leaf), vec!["suite", "group", "leaf"]);
        assert_eq!(store.display_name(leaf), "suite > group > leaf");
    }

    #[test]
    fn hierarchy_sibling_keeps_assigned_parent() {
        let mut store = TestRecordStore::new();
        let now = store.run_started_at();
        let root = store.start_test(key(Some("f"), 0, "root"), now);
        let first = store.start_test(key(Some("f"), 1, "first"), now);
        let second = store.start_test(key(Some("f"), 1, "second"), now);
        let grandchild = store.start_test(key(Some("f"), 2, "grandchild"), now);

        let parent_of = |id| store.record(id).and_then(TestRecord::parent);
        assert_eq!(parent_of(first), Some(root));
        assert_eq!(parent_of(second), Some(root));
        assert_eq!(parent_of(grandchild), Some(second));
        assert_eq!(parent_of(root), None);
    }
}
