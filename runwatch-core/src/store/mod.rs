// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test record store: the single source of truth for a run.
//!
//! The store owns every [`TestRecord`](crate::record::TestRecord) and [`FileGroup`] seen during a
//! run. It has two write paths, [`TestRecordStore::start_test`] and
//! [`TestRecordStore::complete_test`] (plus [`TestRecordStore::skip_test`], which is built on
//! them), and a set of read-only queries used for reporting: incomplete-test snapshots, failed and
//! slow test lists, and run statistics.
//!
//! None of the operations here block or await, so queries are safe to run from a shutdown path.

mod analysis;
mod file_group;
mod imp;

pub use file_group::*;
pub use imp::*;
