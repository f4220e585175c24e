// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report the state of a run in a human-readable format.
//!
//! The tracker produces [`ReportItem`]s, the outbound contract, and a [`TextDisplayer`] renders
//! them.

mod displayer;
mod helpers;
mod report;

pub use displayer::*;
pub use report::*;
