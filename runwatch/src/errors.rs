// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use runwatch_core::{errors::*, exit_codes::RunwatchExitCode};
use std::error::Error;
use thiserror::Error;
use tracing::error;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that stops runwatch before or while it watches a run.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to open input")]
    InputOpenFailed {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to read events")]
    EventReadError {
        #[from]
        err: EventReadError,
    },
    #[error("signal handler setup error")]
    SignalHandlerSetupError {
        #[from]
        err: SignalHandlerSetupError,
    },
    #[error("failed to create async runtime")]
    RuntimeCreateFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("failed to write output")]
    WriteFailed {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn config_parse_error(err: ConfigParseError) -> Self {
        Self::ConfigParseError { err }
    }

    pub(crate) fn input_open_failed(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::InputOpenFailed {
            path: path.into(),
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigParseError { .. }
            | Self::InputOpenFailed { .. }
            | Self::EventReadError { .. }
            | Self::SignalHandlerSetupError { .. }
            | Self::RuntimeCreateFailed { .. }
            | Self::WriteFailed { .. } => RunwatchExitCode::SETUP_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::ConfigParseError { err } => {
                error!("{err}");
                err.source()
            }
            Self::InputOpenFailed { path, err } => {
                error!("failed to open input `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::EventReadError { err } => {
                error!("{err}");
                err.source()
            }
            Self::SignalHandlerSetupError { err } => {
                error!("failed to set up signal handler");
                err.source()
            }
            Self::RuntimeCreateFailed { err } => {
                error!("failed to create async runtime");
                Some(err as &dyn Error)
            }
            Self::WriteFailed { err } => {
                error!("failed to write output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
