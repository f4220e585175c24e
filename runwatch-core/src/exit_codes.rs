// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exit codes used by runwatch.

/// Documented exit codes for runwatch.
///
/// A test run exits with [`OK`](Self::OK) only if every tracked test finished and none of them
/// failed.
pub enum RunwatchExitCode {}

impl RunwatchExitCode {
    /// Every test finished and no test failed.
    pub const OK: i32 = 0;

    /// One or more tests failed or never finished, or the run was interrupted.
    pub const TEST_RUN_FAILED: i32 = 1;

    /// runwatch could not start tracking: for example, the config or the event source was invalid.
    pub const SETUP_ERROR: i32 = 2;
}
