// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for runwatch.
//!
//! Configuration is layered, with later sources overriding earlier ones:
//!
//! 1. the built-in defaults in `default-config.toml`;
//! 2. a config file, either passed in explicitly or found at `.config/runwatch.toml`;
//! 3. `RUNWATCH_*` environment variables, e.g. `RUNWATCH_STUCK_THRESHOLD=1m`.
//!
//! The tracker itself only consumes plain values from here; none of them change how state is
//! tracked.

mod tracker_config;

pub use tracker_config::*;
