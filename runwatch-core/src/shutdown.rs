// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shutdown hook: what runs when the process is about to exit.
//!
//! Shutdown is the scenario runwatch is built for. Whether it was triggered by a signal or by the
//! end of the event stream, the hook takes a read-only snapshot of the tests that never finished
//! and computes the exit status. It doesn't block, await or modify the store.

use crate::{
    exit_codes::RunwatchExitCode,
    reporter::IncompleteReport,
    stats::RunStatsSnapshot,
    store::TestRecordStore,
};
use std::{fmt, time::Instant};
use tracing::debug;

/// Why the run is shutting down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShutdownCause {
    /// An interrupt signal (Ctrl-C).
    Interrupt,

    /// A termination signal.
    Terminate,

    /// A hangup signal.
    Hangup,

    /// The event stream ended normally.
    StreamEnded,
}

impl ShutdownCause {
    /// Returns true if this shutdown was caused by a signal rather than the end of the stream.
    pub fn is_signal(self) -> bool {
        !matches!(self, Self::StreamEnded)
    }
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "interrupt"),
            Self::Terminate => write!(f, "termination signal"),
            Self::Hangup => write!(f, "hangup"),
            Self::StreamEnded => write!(f, "end of event stream"),
        }
    }
}

/// The result of firing the shutdown hook.
#[derive(Clone, Debug)]
pub struct ShutdownReport<'a> {
    /// Why the run is shutting down.
    pub cause: ShutdownCause,

    /// Tests that started but never finished. May be empty, in which case nothing should be shown.
    pub incomplete: IncompleteReport<'a>,

    /// Statistics as of shutdown.
    pub stats: RunStatsSnapshot,
}

impl ShutdownReport<'_> {
    /// The status the process should exit with.
    ///
    /// Shutting down because of a signal is always a failure. Otherwise the run succeeds if nothing
    /// failed and nothing was left running.
    pub fn exit_code(&self) -> i32 {
        if self.cause.is_signal() {
            RunwatchExitCode::TEST_RUN_FAILED
        } else {
            self.stats.exit_code()
        }
    }
}

/// The single designated on-shutdown hook for a run.
///
/// Each cause is handled at most once: firing the same cause again returns `None`.
#[derive(Debug, Default)]
pub struct ShutdownHook {
    fired: Vec<ShutdownCause>,
}

impl ShutdownHook {
    /// Creates a new hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the hook for `cause` as of the current time.
    pub fn fire<'a>(
        &mut self,
        cause: ShutdownCause,
        store: &'a TestRecordStore,
    ) -> Option<ShutdownReport<'a>> {
        self.fire_at(cause, store, Instant::now())
    }

    /// Fires the hook for `cause` as of `now`.
    pub fn fire_at<'a>(
        &mut self,
        cause: ShutdownCause,
        store: &'a TestRecordStore,
        now: Instant,
    ) -> Option<ShutdownReport<'a>> {
        if self.fired.contains(&cause) {
            debug!(%cause, "shutdown hook already fired for this cause");
            return None;
        }
        self.fired.push(cause);

        let incomplete = IncompleteReport::new(store, now);
        debug!(%cause, incomplete = incomplete.len(), "shutting down");
        Some(ShutdownReport {
            cause,
            incomplete,
            stats: store.stats_at(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{events::TestKey, record::TestOutcome};
    use std::time::Duration;
    use test_case::test_case;

    fn key(name: &str) -> TestKey {
        TestKey::new(Some("f".into()), 0, name)
    }

    #[test]
    fn fires_once_per_cause() {
        let mut store = TestRecordStore::new();
        let t = store.run_started_at();
        store.start_test(key("stuck"), t);

        let mut hook = ShutdownHook::new();
        let first = hook
            .fire_at(ShutdownCause::Interrupt, &store, t)
            .expect("first interrupt fires");
        assert_eq!(first.incomplete.len(), 1);
        assert!(hook.fire_at(ShutdownCause::Interrupt, &store, t).is_none());

        // A different cause still fires, and sees the same incomplete test.
        let second = hook
            .fire_at(ShutdownCause::StreamEnded, &store, t)
            .expect("stream end fires");
        assert_eq!(second.incomplete.len(), 1);
        assert_eq!(store.stats_at(t).stats.total_tests, 1);
    }

    #[test]
    fn empty_store_is_a_safe_noop() {
        let store = TestRecordStore::new();
        let mut hook = ShutdownHook::new();
        for cause in [ShutdownCause::Interrupt, ShutdownCause::StreamEnded] {
            let report = hook.fire(cause, &store).expect("each cause fires once");
            assert!(report.incomplete.is_empty());
        }
    }

    #[test_case(ShutdownCause::Interrupt, false, false, RunwatchExitCode::TEST_RUN_FAILED ; "interrupt is always a failure")]
    #[test_case(ShutdownCause::Terminate, false, false, RunwatchExitCode::TEST_RUN_FAILED ; "terminate is always a failure")]
    #[test_case(ShutdownCause::StreamEnded, false, false, RunwatchExitCode::OK ; "clean run")]
    #[test_case(ShutdownCause::StreamEnded, true, false, RunwatchExitCode::TEST_RUN_FAILED ; "failed test")]
    #[test_case(ShutdownCause::StreamEnded, false, true, RunwatchExitCode::TEST_RUN_FAILED ; "incomplete test")]
    fn exit_codes(cause: ShutdownCause, fail: bool, leave_running: bool, expected: i32) {
        let mut store = TestRecordStore::new();
        let t = store.run_started_at();
        store.start_test(key("a"), t);
        let outcome = if fail {
            TestOutcome::Failed(None)
        } else {
            TestOutcome::Passed
        };
        store.complete_test(&key("a"), outcome, Some(Duration::from_millis(1)), t);
        if leave_running {
            store.start_test(key("b"), t);
        }

        let report = ShutdownHook::new()
            .fire_at(cause, &store, t)
            .expect("fresh hook fires");
        assert_eq!(report.exit_code(), expected);
    }
}
