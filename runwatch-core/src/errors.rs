// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by runwatch.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::fmt;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse runwatch config{}", DisplayConfigSource(.config_file.as_ref()))]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, err: ConfigError) -> Self {
        Self { config_file, err }
    }

    /// Returns the config file that failed to parse, if any.
    ///
    /// This is `None` if the error came from built-in defaults or environment overrides.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }
}

struct DisplayConfigSource<'a>(Option<&'a Utf8PathBuf>);

impl fmt::Display for DisplayConfigSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(path) => write!(f, " at `{path}`"),
            None => Ok(()),
        }
    }
}

/// An event from the runner could not be turned into a tracked event.
///
/// These errors are local to a single event: the consumer is expected to log them and continue
/// with the next event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EventParseError {
    /// The line was not a valid JSON event.
    #[error("event is not valid JSON")]
    InvalidJson {
        /// The underlying deserialization error.
        #[source]
        err: serde_json::Error,
    },

    /// A lifecycle event was missing the name of the test it refers to.
    #[error("`{kind}` event is missing a test name")]
    MissingName {
        /// The event type, as written by the runner.
        kind: String,
    },
}

/// An error that occurred while reading events from the event source.
#[derive(Debug, Error)]
#[error("error reading events from {source_name}")]
pub struct EventReadError {
    source_name: String,
    #[source]
    err: std::io::Error,
}

impl EventReadError {
    pub(crate) fn new(source_name: impl Into<String>, err: std::io::Error) -> Self {
        Self {
            source_name: source_name.into(),
            err,
        }
    }
}

/// An error returned when setting up signal handlers fails.
#[derive(Debug, Error)]
#[error("error setting up signal handler")]
pub struct SignalHandlerSetupError(#[from] std::io::Error);
