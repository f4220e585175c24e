// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use runwatch_core::{
    config::TrackerConfig,
    events::{OutputStream, TestEvent},
    exit_codes::RunwatchExitCode,
    record::{LifecycleState, TestRecord},
    reporter::{ReportItem, SummaryReport, TextDisplayerBuilder},
    shutdown::{ShutdownCause, ShutdownHook},
    tracker::{Handled, Tracker},
};
use std::time::Duration;

fn names<'a>(records: impl IntoIterator<Item = &'a TestRecord>) -> Vec<&'a str> {
    records.into_iter().map(|record| record.name()).collect()
}

#[tokio::test]
async fn interrupt_reports_unfinished_test() -> Result<()> {
    let run = run_fixture("interrupted", INTERRUPTED).await?;
    assert_eq!(run.cause, ShutdownCause::StreamEnded);

    let store = run.tracker.store();
    let mut hook = ShutdownHook::new();
    let report = hook
        .fire(ShutdownCause::Interrupt, store)
        .expect("first interrupt fires");

    let incomplete: Vec<_> = report
        .incomplete
        .entries()
        .iter()
        .map(|entry| entry.record.name())
        .collect();
    assert_eq!(incomplete, vec!["B"]);
    assert_eq!(report.stats.stats.passed, 1);
    assert_eq!(report.stats.stats.failed, 0);
    assert_eq!(report.stats.incomplete, 1);
    assert_eq!(report.exit_code(), RunwatchExitCode::TEST_RUN_FAILED);

    ensure!(
        hook.fire(ShutdownCause::Interrupt, store).is_none(),
        "a second interrupt is ignored"
    );

    // Taking the snapshot didn't change anything.
    assert_eq!(store.stats().stats, report.stats.stats);
    assert_eq!(names(store.snapshot_incomplete()), vec!["B"]);

    Ok(())
}

#[tokio::test]
async fn later_completion_leaves_earlier_test_incomplete() -> Result<()> {
    let run = run_fixture("out-of-order", OUT_OF_ORDER).await?;
    let store = run.tracker.store();

    assert_eq!(names(store.snapshot_incomplete()), vec!["X"]);
    assert_eq!(store.stats().stats.total_files, 2);

    let mut hook = ShutdownHook::new();
    let report = hook
        .fire(ShutdownCause::StreamEnded, store)
        .expect("stream end fires");
    assert_eq!(
        report
            .incomplete
            .likely_culprit()
            .map(|entry| entry.record.name()),
        Some("X")
    );
    assert_eq!(report.exit_code(), RunwatchExitCode::TEST_RUN_FAILED);

    Ok(())
}

#[test]
fn completion_twenty_millis_later() {
    let mut tracker = Tracker::new();
    let t = tracker.store().run_started_at();
    let event = |line: &str| TestEvent::parse_line(line).expect("valid event");

    tracker.handle_at(event(r#"{"type":"start","data":{"name":"X","file":"f"}}"#), t);
    tracker.handle_at(
        event(r#"{"type":"start","data":{"name":"Y","file":"f"}}"#),
        t + Duration::from_millis(20),
    );
    tracker.handle_at(
        event(r#"{"type":"pass","data":{"name":"Y","file":"f"}}"#),
        t + Duration::from_millis(25),
    );

    let store = tracker.store();
    assert_eq!(names(store.snapshot_incomplete()), vec!["X"]);
    assert_eq!(
        store.slow_tests(10).first().and_then(|record| record.duration()),
        Some(Duration::from_millis(5))
    );
}

#[tokio::test]
async fn slow_tests_are_ranked() -> Result<()> {
    let run = run_fixture("slow", SLOW).await?;
    let store = run.tracker.store();

    let durations: Vec<_> = store
        .slow_tests(3)
        .iter()
        .filter_map(|record| record.duration())
        .collect();
    assert_eq!(
        durations,
        vec![
            Duration::from_millis(2000),
            Duration::from_millis(1000),
            Duration::from_millis(500),
        ]
    );

    // The skip has the longest reported duration but is never ranked.
    ensure!(
        store
            .slow_tests(usize::MAX)
            .iter()
            .all(|record| record.state() != LifecycleState::Skipped),
        "skipped tests are never slow"
    );
    assert_eq!(names(store.failed_tests()), vec!["t3"]);

    let stats = store.stats();
    assert_eq!(stats.stats.total_tests, 6);
    assert_eq!(stats.stats.skipped, 1);
    assert_eq!(stats.incomplete, 0);
    assert_eq!(stats.exit_code(), RunwatchExitCode::TEST_RUN_FAILED);

    Ok(())
}

#[tokio::test]
async fn nested_suite_with_noise() -> Result<()> {
    let run = run_fixture("nested", NESTED).await?;
    assert_eq!(run.cause, ShutdownCause::StreamEnded);

    let started = run
        .handled
        .iter()
        .filter(|handled| matches!(handled, Handled::Started(_)))
        .count();
    assert_eq!(started, 4, "the nameless start was skipped");
    assert!(run.handled.contains(&Handled::Output {
        stream: OutputStream::Stdout,
        message: "adding\n".to_owned(),
    }));

    let tracker = &run.tracker;
    let store = tracker.store();
    let failed = store.failed_tests();
    assert_eq!(names(failed.iter().copied()), vec!["by zero"]);
    assert_eq!(
        store.display_name(failed[0].id()),
        "math > divides > by zero"
    );
    assert_eq!(
        store
            .records()
            .iter()
            .find(|record| record.name() == "adds")
            .and_then(|record| record.duration()),
        Some(Duration::from_micros(1500))
    );

    let stats = store.stats();
    assert_eq!(stats.stats.passed, 3, "the duplicate pass wasn't counted");
    assert_eq!(stats.stats.failed, 1);
    assert_eq!(stats.incomplete, 0);
    assert_eq!(tracker.diagnostics(), ["tests 4"]);

    let group = store
        .file_groups()
        .next()
        .expect("one file group was recorded");
    ensure!(group.is_done(), "every test in the file finished");
    assert_eq!((group.passed(), group.total()), (3, 4));

    let displayer = TextDisplayerBuilder::default().build(&TrackerConfig::default());
    let mut out = Vec::new();
    displayer.write_item(&ReportItem::file_header(group), &mut out)?;
    let summary = SummaryReport::new(tracker, &TrackerConfig::default(), store.run_started_at());
    displayer.write_item(&ReportItem::Summary(summary), &mut out)?;

    let out = String::from_utf8(out)?;
    ensure!(
        out.starts_with("        FILE math.test.js: 3/4 tests passed\n"),
        "unexpected file header: {out}"
    );
    ensure!(
        out.contains("FAIL [   0.002s] math > divides > by zero (math.test.js)"),
        "failure missing from summary: {out}"
    );
    ensure!(out.contains("INFO tests 4"), "diagnostic missing: {out}");

    Ok(())
}
