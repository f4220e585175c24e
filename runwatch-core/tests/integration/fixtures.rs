// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use color_eyre::eyre::Result;
use runwatch_core::{
    shutdown::ShutdownCause,
    signal::SignalHandlerKind,
    source::EventSource,
    tracker::{Handled, Tracker},
};
use std::sync::Once;

pub(crate) const INTERRUPTED: &str = include_str!("../fixtures/interrupted.ndjson");
pub(crate) const OUT_OF_ORDER: &str = include_str!("../fixtures/out-of-order.ndjson");
pub(crate) const SLOW: &str = include_str!("../fixtures/slow.ndjson");
pub(crate) const NESTED: &str = include_str!("../fixtures/nested.ndjson");

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Failing to install is fine: another test binary may have set things up already.
        let _ = color_eyre::install();
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// The result of draining a fixture through a tracker.
pub(crate) struct FixtureRun {
    pub(crate) tracker: Tracker,
    pub(crate) cause: ShutdownCause,
    pub(crate) handled: Vec<Handled>,
}

pub(crate) async fn run_fixture(name: &str, input: &str) -> Result<FixtureRun> {
    test_init();

    let mut source = EventSource::new(input.as_bytes(), name, SignalHandlerKind::Noop)?;
    let mut tracker = Tracker::new();
    let mut handled = Vec::new();
    let cause = tracker
        .consume(&mut source, |_, event| handled.push(event))
        .await?;

    Ok(FixtureRun {
        tracker,
        cause,
        handled,
    })
}
