// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stopwatch for tracking how long a run has been going.
//!
//! A run needs a start time to show to the user and an elapsed duration. For that we use a
//! combination of a `DateTime<Local>` (realtime clock) and an `Instant` (monotonic clock). Elapsed
//! time is always measured with the monotonic clock.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

pub(crate) fn stopwatch() -> StopwatchStart {
    StopwatchStart::new()
}

/// The start state of a stopwatch.
#[derive(Clone, Debug)]
pub(crate) struct StopwatchStart {
    start_time: DateTime<Local>,
    instant: Instant,
}

impl StopwatchStart {
    fn new() -> Self {
        Self {
            // These two syscalls will happen imperceptibly close to each other, which is good
            // enough for our purposes.
            start_time: Local::now(),
            instant: Instant::now(),
        }
    }

    pub(crate) fn start_instant(&self) -> Instant {
        self.instant
    }

    /// Returns a snapshot of the stopwatch as of `now`.
    ///
    /// `now` earlier than the start instant saturates to a zero duration.
    pub(crate) fn snapshot_at(&self, now: Instant) -> StopwatchSnapshot {
        StopwatchSnapshot {
            start_time: self.start_time,
            duration: now.saturating_duration_since(self.instant),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct StopwatchSnapshot {
    pub(crate) start_time: DateTime<Local>,
    pub(crate) duration: Duration,
}
