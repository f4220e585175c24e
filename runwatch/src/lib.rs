// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Watch a test runner's event stream and report on it.
//!
//! `runwatch` reads newline-delimited JSON events from a file or standard input, shows each test
//! as it finishes, and on exit (or on Ctrl-C) reports the tests that never finished, longest
//! running last.
//!
//! The tracking logic lives in [`runwatch_core`]; this crate is the command-line frontend.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter};
