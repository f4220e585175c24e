// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for runwatch: an event-driven tracker for test runs.
//!
//! A test runner emits a stream of newline-delimited JSON events. The [`tracker::Tracker`] applies
//! them to a [`store::TestRecordStore`], which keeps one record per test execution and rebuilds
//! the suite hierarchy from nesting depths. When the run ends, or is interrupted, the
//! [`shutdown::ShutdownHook`] reports which tests never finished, longest-running first.
//!
//! For the flow of events from a reader to the tracker, see [`source::EventSource`].

pub mod config;
pub mod errors;
pub mod events;
pub mod exit_codes;
mod hierarchy;
pub mod record;
pub mod reporter;
pub mod shutdown;
pub mod signal;
pub mod source;
pub mod stats;
pub mod store;
mod time;
pub mod tracker;
