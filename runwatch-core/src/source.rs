// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event source: a single consumer over newline-delimited JSON events.
//!
//! Waiting for the next line (or a shutdown signal) is the only place runwatch suspends. Malformed
//! lines, including lines that aren't valid UTF-8, are logged and skipped; they never end the
//! stream.

use crate::{
    errors::{EventReadError, SignalHandlerSetupError},
    events::TestEvent,
    shutdown::ShutdownCause,
    signal::{SignalHandler, SignalHandlerKind},
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Split};
use tracing::warn;

/// The next thing produced by an [`EventSource`].
#[derive(Clone, Debug, PartialEq)]
pub enum SourceEvent {
    /// A well-formed event.
    Event(TestEvent),

    /// The source stopped, either because the stream ended or because a signal was received.
    Shutdown(ShutdownCause),
}

/// Reads events from a line-oriented reader while listening for shutdown signals.
#[derive(Debug)]
pub struct EventSource<R> {
    source_name: String,
    lines: Split<R>,
    line_number: usize,
    signals: SignalHandler,
    ended: bool,
}

impl<R: AsyncBufRead + Unpin> EventSource<R> {
    /// Creates a new event source over `reader`.
    ///
    /// `source_name` is used in log messages and errors.
    pub fn new(
        reader: R,
        source_name: impl Into<String>,
        signal_handler: SignalHandlerKind,
    ) -> Result<Self, SignalHandlerSetupError> {
        Ok(Self {
            source_name: source_name.into(),
            lines: reader.split(b'\n'),
            line_number: 0,
            signals: signal_handler.build()?,
            ended: false,
        })
    }

    /// The name of this source.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Waits for the next event.
    ///
    /// Once the stream has ended, this keeps returning [`ShutdownCause::StreamEnded`].
    pub async fn next(&mut self) -> Result<SourceEvent, EventReadError> {
        loop {
            if self.ended {
                return Ok(SourceEvent::Shutdown(ShutdownCause::StreamEnded));
            }

            let line = tokio::select! {
                // Split::next_segment is cancel-safe, so no input is lost if a signal wins the race.
                line = self.lines.next_segment() => line,
                Some(cause) = self.signals.recv() => {
                    return Ok(SourceEvent::Shutdown(cause));
                }
            };

            let Some(line) =
                line.map_err(|err| EventReadError::new(self.source_name.clone(), err))?
            else {
                self.ended = true;
                continue;
            };
            self.line_number += 1;

            let line = match std::str::from_utf8(&line) {
                Ok(line) => line.trim(),
                Err(error) => {
                    warn!(
                        source = %self.source_name,
                        line = self.line_number,
                        "skipping line that isn't valid UTF-8: {error}",
                    );
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            match TestEvent::parse_line(line) {
                Ok(event) => return Ok(SourceEvent::Event(event)),
                Err(error) => {
                    warn!(
                        source = %self.source_name,
                        line = self.line_number,
                        "skipping malformed event: {error}",
                    );
                }
            }
        }
    }
}
