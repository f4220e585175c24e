// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event ingestion: applies runner events to a [`TestRecordStore`].

use crate::{
    errors::EventReadError,
    events::{OutputStream, TestEvent},
    record::{RecordId, TestOutcome},
    shutdown::ShutdownCause,
    source::{EventSource, SourceEvent},
    store::{Completion, TestRecordStore},
};
use std::time::Instant;
use tokio::io::AsyncBufRead;
use tracing::{debug, trace};

/// What happened as a result of handling an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Handled {
    /// A test started running.
    Started(RecordId),

    /// A test finished.
    Finished(RecordId),

    /// The test produced output that should be passed through.
    Output {
        /// The stream the output was written to.
        stream: OutputStream,

        /// The output text.
        message: String,
    },

    /// The event produced no state change.
    Ignored,
}

/// The event-driven state tracker for a single run.
///
/// Events are applied one at a time, in the order they're received. The tracker never blocks or
/// awaits while applying an event.
#[derive(Debug, Default)]
pub struct Tracker {
    store: TestRecordStore,
    diagnostics: Vec<String>,
}

impl Tracker {
    /// Creates a new tracker. The run's clock starts now.
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying store.
    pub fn store(&self) -> &TestRecordStore {
        &self.store
    }

    /// Diagnostic messages reported by the runner, in the order they were received.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Applies an event as of the current time.
    pub fn handle(&mut self, event: TestEvent) -> Handled {
        self.handle_at(event, Instant::now())
    }

    /// Applies an event as of `now`.
    pub fn handle_at(&mut self, event: TestEvent, now: Instant) -> Handled {
        trace!(kind = event.kind_name(), "handling event");
        match event {
            TestEvent::Start(payload) => Handled::Started(self.store.start_test(payload.key, now)),
            TestEvent::Pass(payload) => finished(self.store.complete_test(
                &payload.key,
                TestOutcome::Passed,
                payload.duration,
                now,
            )),
            TestEvent::Fail(payload) => finished(self.store.complete_test(
                &payload.key,
                TestOutcome::Failed(payload.error),
                payload.duration,
                now,
            )),
            TestEvent::Skip(payload) => {
                finished(self.store.skip_test(payload.key, payload.duration, now))
            }
            TestEvent::Complete(payload) => {
                trace!(key = %payload.key, "execution complete, awaiting outcome");
                Handled::Ignored
            }
            TestEvent::Output { stream, message } => Handled::Output { stream, message },
            TestEvent::Diagnostic { message } => {
                self.diagnostics.push(message);
                Handled::Ignored
            }
            TestEvent::WatchReady => {
                debug!("runner is ready for changes in watch mode");
                Handled::Ignored
            }
            TestEvent::Unknown { kind } => {
                debug!(%kind, "ignoring unknown event type");
                Handled::Ignored
            }
        }
    }

    /// Drains `source`, applying each event and passing the result to `on_event`.
    ///
    /// Returns the reason the source stopped: either the stream ended or a shutdown signal was
    /// received.
    pub async fn consume<R, F>(
        &mut self,
        source: &mut EventSource<R>,
        mut on_event: F,
    ) -> Result<ShutdownCause, EventReadError>
    where
        R: AsyncBufRead + Unpin,
        F: FnMut(&Self, Handled),
    {
        loop {
            match source.next().await? {
                SourceEvent::Event(event) => {
                    let handled = self.handle(event);
                    on_event(self, handled);
                }
                SourceEvent::Shutdown(cause) => return Ok(cause),
            }
        }
    }
}

fn finished(completion: Completion) -> Handled {
    match completion {
        Completion::Completed(id) => Handled::Finished(id),
        Completion::WithoutStart | Completion::Duplicate(_) => Handled::Ignored,
    }
}
