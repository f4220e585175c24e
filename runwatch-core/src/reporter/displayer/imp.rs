// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::duration::DisplayBracketedDuration;
use crate::{
    config::TrackerConfig,
    events::TestError,
    record::{LifecycleState, TestRecord},
    reporter::{
        helpers::{Styles, plural},
        report::{IncompleteReport, ReportItem, SummaryReport},
    },
    stats::{RunStats, RunStatsSnapshot},
};
use camino::Utf8Path;
use owo_colors::OwoColorize;
use std::{
    io::{self, Write},
    time::Duration,
};
use swrite::{SWrite, swrite};

/// Options for building a [`TextDisplayer`].
#[derive(Clone, Debug, Default)]
pub struct TextDisplayerBuilder {
    /// Whether to colorize output.
    pub should_colorize: bool,

    /// Whether to use Unicode characters for horizontal bars.
    pub use_unicode: bool,
}

impl TextDisplayerBuilder {
    /// Builds the displayer, taking display filters and thresholds from `config`.
    pub fn build(self, config: &TrackerConfig) -> TextDisplayer {
        let mut styles = Styles::default();
        if self.should_colorize {
            styles.colorize();
        }

        let mut theme_characters = ThemeCharacters::default();
        if self.use_unicode {
            theme_characters.use_unicode();
        }

        TextDisplayer {
            styles,
            theme_characters,
            show_passing: config.show_passing(),
            show_skip: config.show_skip(),
            stuck_threshold: config.stuck_threshold(),
        }
    }
}

/// Renders [`ReportItem`]s as human-readable text.
#[derive(Debug)]
pub struct TextDisplayer {
    styles: Styles,
    theme_characters: ThemeCharacters,
    show_passing: bool,
    show_skip: bool,
    stuck_threshold: Duration,
}

const UNKNOWN_FILE: &str = "<unknown file>";

impl TextDisplayer {
    /// Writes `item` to `writer`.
    ///
    /// [`ReportItem::Output`] is written as is: callers pick the writer based on the stream.
    pub fn write_item(&self, item: &ReportItem<'_>, writer: &mut dyn Write) -> io::Result<()> {
        match item {
            ReportItem::FileHeader {
                path,
                passed,
                total,
            } => self.write_file_header(*path, *passed, *total, writer),
            ReportItem::TestLine {
                record,
                breadcrumb,
                running_elapsed,
                ..
            } => self.write_test_line(record, breadcrumb, *running_elapsed, writer),
            ReportItem::Output { message, .. } => writer.write_all(message.as_bytes()),
            ReportItem::Incomplete(report) => self.write_incomplete(report, writer),
            ReportItem::Summary(summary) => self.write_summary(summary, writer),
        }
    }

    fn write_file_header(
        &self,
        path: Option<&Utf8Path>,
        passed: usize,
        total: usize,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        write!(writer, "{:>12} ", "FILE".style(self.styles.file))?;
        match path {
            Some(path) => write!(writer, "{}", path.style(self.styles.file))?,
            None => write!(writer, "{}", UNKNOWN_FILE.style(self.styles.dimmed))?,
        }
        writeln!(
            writer,
            ": {}/{} {} passed",
            passed.style(self.styles.count),
            total.style(self.styles.count),
            plural::tests_str(total),
        )
    }

    fn write_test_line(
        &self,
        record: &TestRecord,
        breadcrumb: &[&str],
        running_elapsed: Option<Duration>,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        let (label, style) = match record.state() {
            LifecycleState::Running => {
                return self.write_running_line(
                    running_elapsed.unwrap_or_default(),
                    breadcrumb,
                    None,
                    writer,
                );
            }
            LifecycleState::Passed if !self.show_passing => return Ok(()),
            LifecycleState::Skipped if !self.show_skip => return Ok(()),
            LifecycleState::Passed => ("PASS", self.styles.pass),
            LifecycleState::Failed => ("FAIL", self.styles.fail),
            LifecycleState::Skipped => ("SKIP", self.styles.skip),
        };

        write!(writer, "{:>12} ", label.style(style))?;
        write!(
            writer,
            "{}",
            DisplayBracketedDuration(record.duration().unwrap_or_default())
        )?;
        self.write_breadcrumb(breadcrumb, None, writer)?;

        if let Some(error) = record.error() {
            self.write_error(error, writer)?;
        }
        Ok(())
    }

    fn write_running_line(
        &self,
        elapsed: Duration,
        breadcrumb: &[&str],
        file: Option<&Utf8Path>,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        if elapsed > self.stuck_threshold {
            write!(writer, "{:>12} ", "STUCK?".style(self.styles.fail))?;
        } else {
            write!(writer, "{:>12} ", "RUNNING".style(self.styles.running))?;
        }
        write!(writer, "{}", DisplayBracketedDuration(elapsed))?;
        self.write_breadcrumb(breadcrumb, file, writer)
    }

    /// Writes the breadcrumb and, if present, the file, followed by a newline.
    fn write_breadcrumb(
        &self,
        breadcrumb: &[&str],
        file: Option<&Utf8Path>,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        if let Some((leaf, ancestors)) = breadcrumb.split_last() {
            for ancestor in ancestors {
                write!(writer, "{} > ", ancestor.style(self.styles.dimmed))?;
            }
            write!(writer, "{leaf}")?;
        }
        if let Some(file) = file {
            write!(writer, " ({})", file.style(self.styles.dimmed))?;
        }
        writeln!(writer)
    }

    fn write_error(&self, error: &TestError, writer: &mut dyn Write) -> io::Result<()> {
        for line in error.message.lines() {
            writeln!(writer, "{:13}{}", "", line.style(self.styles.fail))?;
        }
        if let Some(stack) = &error.stack {
            for line in stack.lines() {
                writeln!(writer, "{:13}{}", "", line.style(self.styles.dimmed))?;
            }
        }
        Ok(())
    }

    fn write_incomplete(
        &self,
        report: &IncompleteReport<'_>,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        let Some(culprit) = report.likely_culprit() else {
            return Ok(());
        };

        writeln!(writer, "{}", self.theme_characters.hbar(12))?;
        writeln!(
            writer,
            "{:>12} {} {} still running:",
            "INCOMPLETE".style(self.styles.fail),
            report.len().style(self.styles.count),
            plural::tests_str(report.len()),
        )?;
        for entry in report.entries() {
            self.write_running_line(
                entry.elapsed,
                &entry.breadcrumb,
                entry.record.file(),
                writer,
            )?;
        }

        // The likely culprit goes last, so it's the first thing seen after a hang.
        writeln!(writer, "{}", self.theme_characters.hbar(12))?;
        write!(writer, "{:>12} ", "LIKELY STUCK".style(self.styles.fail))?;
        write!(writer, "{}", DisplayBracketedDuration(culprit.elapsed))?;
        self.write_breadcrumb(&culprit.breadcrumb, culprit.record.file(), writer)
    }

    fn write_summary(&self, summary: &SummaryReport<'_>, writer: &mut dyn Write) -> io::Result<()> {
        let snapshot = &summary.stats;
        let run_stats = &snapshot.stats;
        let summary_style = if snapshot.is_success() {
            self.styles.pass
        } else {
            self.styles.fail
        };

        write!(
            writer,
            "{}\n{:>12} ",
            self.theme_characters.hbar(12),
            "Summary".style(summary_style)
        )?;
        write!(writer, "{}", DisplayBracketedDuration(snapshot.elapsed))?;

        write!(
            writer,
            "{}",
            run_stats.finished_count.style(self.styles.count)
        )?;
        if run_stats.finished_count != run_stats.total_tests {
            write!(writer, "/{}", run_stats.total_tests.style(self.styles.count))?;
        }

        let mut summary_str = String::new();
        write_summary_str(snapshot, &self.styles, &mut summary_str);
        writeln!(
            writer,
            " {} run across {} {}: {summary_str}",
            plural::tests_str(run_stats.total_tests),
            run_stats.total_files.style(self.styles.count),
            plural::files_str(run_stats.total_files),
        )?;

        for (record, breadcrumb) in &summary.failed {
            write!(writer, "{:>12} ", "FAIL".style(self.styles.fail))?;
            write!(
                writer,
                "{}",
                DisplayBracketedDuration(record.duration().unwrap_or_default())
            )?;
            self.write_breadcrumb(breadcrumb, record.file(), writer)?;
        }

        for (record, breadcrumb) in &summary.slow {
            write!(writer, "{:>12} ", "SLOW".style(self.styles.skip))?;
            write!(
                writer,
                "{}",
                DisplayBracketedDuration(record.duration().unwrap_or_default())
            )?;
            self.write_breadcrumb(breadcrumb, record.file(), writer)?;
        }

        for message in summary.diagnostics {
            writeln!(writer, "{:>12} {message}", "INFO".style(self.styles.dimmed))?;
        }

        Ok(())
    }
}

fn write_summary_str(snapshot: &RunStatsSnapshot, styles: &Styles, out: &mut String) {
    // Written in this style to ensure new fields are accounted for.
    let &RunStatsSnapshot {
        stats:
            RunStats {
                total_files: _,
                total_tests: _,
                finished_count: _,
                passed,
                failed,
                skipped,
            },
        incomplete,
        start_time: _,
        elapsed: _,
    } = snapshot;

    swrite!(
        out,
        "{} {}",
        passed.style(styles.count),
        "passed".style(styles.pass)
    );

    if failed > 0 {
        swrite!(
            out,
            ", {} {}",
            failed.style(styles.count),
            "failed".style(styles.fail)
        );
    }

    if incomplete > 0 {
        swrite!(
            out,
            ", {} {}",
            incomplete.style(styles.count),
            "incomplete".style(styles.fail)
        );
    }

    swrite!(
        out,
        ", {} {}",
        skipped.style(styles.count),
        "skipped".style(styles.skip)
    );
}

#[derive(Debug)]
struct ThemeCharacters {
    hbar: char,
}

impl Default for ThemeCharacters {
    fn default() -> Self {
        Self { hbar: '-' }
    }
}

impl ThemeCharacters {
    fn use_unicode(&mut self) {
        self.hbar = '─';
    }

    fn hbar(&self, width: usize) -> String {
        std::iter::repeat_n(self.hbar, width).collect()
    }
}
