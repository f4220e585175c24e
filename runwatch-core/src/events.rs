// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound events produced by a test runner.
//!
//! Events arrive as newline-delimited JSON. Each line is parsed with [`TestEvent::parse_line`] into
//! a [`TestEvent`], which has already been validated: lifecycle events are guaranteed to carry a
//! test name.

use crate::errors::EventParseError;
use camino::Utf8PathBuf;
use serde::Deserialize;
use std::{fmt, time::Duration};

/// A validated event from the test runner.
#[derive(Clone, Debug, PartialEq)]
pub enum TestEvent {
    /// A test started running.
    Start(TestPayload),

    /// A test passed.
    Pass(TestPayload),

    /// A test failed.
    Fail(TestPayload),

    /// A test was skipped. May arrive without a preceding [`TestEvent::Start`].
    Skip(TestPayload),

    /// A test finished executing. The outcome is carried by the terminal event that follows, so
    /// this is informational.
    Complete(TestPayload),

    /// Output the test wrote to stdout or stderr.
    Output {
        /// The stream the output was written to.
        stream: OutputStream,

        /// The output text.
        message: String,
    },

    /// A diagnostic message from the runner, for example a summary line.
    Diagnostic {
        /// The diagnostic text.
        message: String,
    },

    /// The runner is in watch mode and has finished a pass.
    WatchReady,

    /// An event type this version doesn't know about. Produces no state change.
    Unknown {
        /// The event type, as written by the runner.
        kind: String,
    },
}

impl TestEvent {
    /// Parses a single line of newline-delimited JSON.
    pub fn parse_line(line: &str) -> Result<Self, EventParseError> {
        let raw: RawEvent =
            serde_json::from_str(line).map_err(|err| EventParseError::InvalidJson { err })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEvent) -> Result<Self, EventParseError> {
        let RawEvent { kind, data } = raw;
        // The payload is only decoded for known event types, so that unknown events with
        // unexpected payload shapes are still accepted.
        let event = match normalize_kind(&kind) {
            "start" => Self::Start(TestPayload::from_raw(&kind, decode_data(data)?)?),
            "pass" => Self::Pass(TestPayload::from_raw(&kind, decode_data(data)?)?),
            "fail" => Self::Fail(TestPayload::from_raw(&kind, decode_data(data)?)?),
            "skip" => Self::Skip(TestPayload::from_raw(&kind, decode_data(data)?)?),
            "complete" => Self::Complete(TestPayload::from_raw(&kind, decode_data(data)?)?),
            "stdout" => Self::Output {
                stream: OutputStream::Stdout,
                message: decode_data(data)?.message.unwrap_or_default(),
            },
            "stderr" => Self::Output {
                stream: OutputStream::Stderr,
                message: decode_data(data)?.message.unwrap_or_default(),
            },
            "diagnostic" => Self::Diagnostic {
                message: decode_data(data)?.message.unwrap_or_default(),
            },
            "watch-ready" | "watch:drained" => Self::WatchReady,
            _ => Self::Unknown { kind },
        };
        Ok(event)
    }

    /// Returns a short name for this kind of event, used in logs.
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Start(_) => "start",
            Self::Pass(_) => "pass",
            Self::Fail(_) => "fail",
            Self::Skip(_) => "skip",
            Self::Complete(_) => "complete",
            Self::Output {
                stream: OutputStream::Stdout,
                ..
            } => "stdout",
            Self::Output {
                stream: OutputStream::Stderr,
                ..
            } => "stderr",
            Self::Diagnostic { .. } => "diagnostic",
            Self::WatchReady => "watch-ready",
            Self::Unknown { kind } => kind,
        }
    }
}

fn decode_data(data: serde_json::Value) -> Result<RawEventData, EventParseError> {
    if data.is_null() {
        return Ok(RawEventData::default());
    }
    serde_json::from_value(data).map_err(|err| EventParseError::InvalidJson { err })
}

fn normalize_kind(kind: &str) -> &str {
    kind.strip_prefix("test:").unwrap_or(kind)
}

/// The payload of a lifecycle event.
#[derive(Clone, Debug, PartialEq)]
pub struct TestPayload {
    /// The identity of the test this event refers to.
    pub key: TestKey,

    /// The duration reported by the runner, if any.
    pub duration: Option<Duration>,

    /// The error reported by the runner, if any.
    pub error: Option<TestError>,
}

impl TestPayload {
    fn from_raw(kind: &str, data: RawEventData) -> Result<Self, EventParseError> {
        let name = match data.name {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(EventParseError::MissingName {
                    kind: kind.to_owned(),
                });
            }
        };

        Ok(Self {
            key: TestKey::new(data.file, data.nesting, name),
            duration: data.duration.and_then(duration_from_millis),
            error: data.error.map(|error| TestError {
                message: error.message,
                stack: error.stack,
            }),
        })
    }
}

fn duration_from_millis(ms: f64) -> Option<Duration> {
    // Negative, NaN and infinite values are treated as if the runner hadn't reported anything.
    if ms.is_finite() && ms >= 0.0 {
        // Float-to-int casts saturate, so absurdly large values clamp instead of panicking.
        Some(Duration::from_nanos((ms * 1_000_000.0).round() as u64))
    } else {
        None
    }
}

/// The identity of a test: its file, nesting depth and name.
///
/// Two events with the same key refer to the same logical test. Tests with identical names at the
/// same depth in the same file collide; see [`TestRecordStore`](crate::store::TestRecordStore) for
/// how collisions are handled.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestKey {
    /// The file the test is defined in, if known.
    pub file: Option<Utf8PathBuf>,

    /// The nesting depth. 0 is top level.
    pub nesting: usize,

    /// The name of the test.
    pub name: String,
}

impl TestKey {
    /// Creates a new key.
    pub fn new(file: Option<Utf8PathBuf>, nesting: usize, name: impl Into<String>) -> Self {
        Self {
            file,
            nesting,
            name: name.into(),
        }
    }
}

impl fmt::Display for TestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}:{}:{}", self.nesting, self.name),
            None => write!(f, "<unknown>:{}:{}", self.nesting, self.name),
        }
    }
}

/// An error reported by the runner for a failing test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestError {
    /// The error message.
    pub message: String,

    /// The stack trace, if the runner provided one.
    pub stack: Option<String>,
}

/// The stream some test output was written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,

    /// Standard error.
    Stderr,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct RawEventData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    file: Option<Utf8PathBuf>,
    #[serde(default)]
    nesting: usize,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    error: Option<RawTestError>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTestError {
    message: String,
    #[serde(default)]
    stack: Option<String>,
}
