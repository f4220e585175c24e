// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser};
use runwatch_core::{
    config::{TrackerConfig, discovered_config_file},
    events::OutputStream,
    reporter::{ReportItem, SummaryReport, TextDisplayer, TextDisplayerBuilder},
    shutdown::{ShutdownCause, ShutdownHook, ShutdownReport},
    signal::SignalHandlerKind,
    source::EventSource,
    tracker::{Handled, Tracker},
};
use std::{
    io::{self, Write},
    time::Instant,
};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, info, warn};

/// Watch a test runner's event stream.
///
/// Reads newline-delimited JSON events from PATH (or standard input), shows tests as they finish,
/// and on exit lists the tests that never finished. The longest-running one is the most likely to
/// be stuck, and is shown last.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct RunwatchApp {
    /// Events to read [default: standard input]
    #[arg(value_name = "PATH")]
    input: Option<Utf8PathBuf>,

    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(flatten)]
    display_opts: DisplayOpts,
}

impl RunwatchApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the exit code.
    pub fn exec(
        self,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        self.exec_with(output, output_writer, SignalHandlerKind::Standard)
    }

    fn exec_with(
        self,
        output: OutputContext,
        output_writer: &mut OutputWriter,
        signal_handler: SignalHandlerKind,
    ) -> Result<i32, ExpectedError> {
        let mut config = self.config_opts.make_config(Utf8Path::new("."))?;
        self.display_opts.apply(&mut config);

        let displayer = TextDisplayerBuilder {
            should_colorize: output
                .color
                .should_colorize(supports_color::Stream::Stderr),
            use_unicode: supports_unicode::on(supports_unicode::Stream::Stderr),
        }
        .build(&config);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| ExpectedError::RuntimeCreateFailed { err })?;

        let watch = Watch {
            config: &config,
            displayer: &displayer,
            verbose: output.verbose,
            signal_handler,
        };
        let result = runtime.block_on(watch.run(self.input.as_deref(), output_writer));
        // Reading standard input blocks a runtime thread until the writer closes the pipe, which a
        // stuck test runner never does. Don't wait for it.
        runtime.shutdown_background();
        result
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Config file [default: .config/runwatch.toml]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self, dir: &Utf8Path) -> Result<TrackerConfig, ExpectedError> {
        match (self.config_file.as_deref(), discovered_config_file(dir).as_deref()) {
            (Some(path), _) | (None, Some(path)) => debug!("reading config from {path}"),
            (None, None) => debug!("no config file found, using defaults"),
        }
        TrackerConfig::from_sources(dir, self.config_file.as_deref())
            .map_err(ExpectedError::config_parse_error)
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Display options")]
struct DisplayOpts {
    /// Don't show a line for each passing test
    #[arg(long)]
    hide_passing: bool,

    /// Don't show a line for each skipped test
    #[arg(long)]
    hide_skip: bool,

    /// Number of slow tests to list in the summary
    #[arg(long, value_name = "N")]
    slow_limit: Option<usize>,
}

impl DisplayOpts {
    fn apply(&self, config: &mut TrackerConfig) {
        if self.hide_passing {
            config.set_show_passing(false);
        }
        if self.hide_skip {
            config.set_show_skip(false);
        }
        if let Some(slow_limit) = self.slow_limit {
            config.set_slow_limit(slow_limit);
        }
    }
}

struct Watch<'a> {
    config: &'a TrackerConfig,
    displayer: &'a TextDisplayer,
    verbose: bool,
    signal_handler: SignalHandlerKind,
}

impl Watch<'_> {
    async fn run(
        &self,
        input: Option<&Utf8Path>,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        match input {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|err| ExpectedError::input_open_failed(path, err))?;
                let source =
                    EventSource::new(BufReader::new(file), path.as_str(), self.signal_handler)?;
                self.watch(source, output_writer).await
            }
            None => {
                let source = EventSource::new(
                    BufReader::new(tokio::io::stdin()),
                    "standard input",
                    self.signal_handler,
                )?;
                self.watch(source, output_writer).await
            }
        }
    }

    async fn watch<R>(
        &self,
        mut source: EventSource<R>,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError>
    where
        R: AsyncBufRead + Unpin,
    {
        let (mut stdout, mut stderr) = output_writer.split();
        let mut tracker = Tracker::new();

        // The callback can't return errors, so keep the first one around.
        let mut write_result = Ok(());
        let consumed = tracker
            .consume(&mut source, |tracker, handled| {
                if write_result.is_ok() {
                    write_result = self
                        .write_handled(tracker, handled, &mut stdout, &mut stderr)
                        .and_then(|()| stdout.flush())
                        .and_then(|()| stderr.flush());
                }
            })
            .await;
        write_result.map_err(|err| ExpectedError::WriteFailed { err })?;

        // A read error ends the stream early, but the tests that were running are still reported.
        let (cause, read_error) = match consumed {
            Ok(cause) => (cause, None),
            Err(err) => (ShutdownCause::StreamEnded, Some(err)),
        };
        if cause.is_signal() {
            warn!("received {cause}, stopping");
        } else if read_error.is_none() {
            info!("{} ended", source.source_name());
        }

        let now = Instant::now();
        let store = tracker.store();
        let mut hook = ShutdownHook::new();
        let exit_code = match hook.fire_at(cause, store, now) {
            Some(report) => {
                self.write_final(&tracker, &report, now, &mut stderr)
                    .and_then(|()| stdout.flush())
                    .and_then(|()| stderr.flush())
                    .map_err(|err| ExpectedError::WriteFailed { err })?;
                report.exit_code()
            }
            None => store.stats_at(now).exit_code(),
        };

        match read_error {
            Some(err) => Err(err.into()),
            None => Ok(exit_code),
        }
    }

    fn write_final(
        &self,
        tracker: &Tracker,
        report: &ShutdownReport<'_>,
        now: Instant,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        for group in tracker.store().file_groups() {
            self.displayer
                .write_item(&ReportItem::file_header(group), writer)?;
        }
        self.displayer
            .write_item(&ReportItem::Incomplete(report.incomplete.clone()), writer)?;
        let summary = SummaryReport::new(tracker, self.config, now);
        self.displayer
            .write_item(&ReportItem::Summary(summary), writer)
    }

    fn write_handled(
        &self,
        tracker: &Tracker,
        handled: Handled,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> io::Result<()> {
        let store = tracker.store();
        match handled {
            Handled::Started(id) if self.verbose => {
                if let Some(item) = ReportItem::test_line(store, id, Instant::now()) {
                    self.displayer.write_item(&item, stderr)?;
                }
                Ok(())
            }
            Handled::Finished(id) => {
                if let Some(item) = ReportItem::test_line(store, id, Instant::now()) {
                    self.displayer.write_item(&item, stderr)?;
                }
                Ok(())
            }
            Handled::Output { stream, message } => {
                let item = ReportItem::Output {
                    stream,
                    message: &message,
                };
                match stream {
                    OutputStream::Stdout => self.displayer.write_item(&item, stdout),
                    OutputStream::Stderr => self.displayer.write_item(&item, stderr),
                }
            }
            Handled::Started(_) | Handled::Ignored => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use runwatch_core::exit_codes::RunwatchExitCode;

    struct Captured {
        exit_code: i32,
        stdout: String,
        stderr: String,
    }

    fn run(
        dir: &Utf8TempDir,
        events: impl AsRef<[u8]>,
        extra_args: &[&str],
    ) -> Result<Captured, ExpectedError> {
        let input = dir.path().join("events.ndjson");
        std::fs::write(&input, events).expect("wrote events");
        let config = dir.path().join("runwatch.toml");
        if !config.exists() {
            std::fs::write(&config, "").expect("wrote config");
        }

        let mut args = vec![
            "runwatch",
            input.as_str(),
            "--color",
            "never",
            "--config-file",
            config.as_str(),
        ];
        args.extend_from_slice(extra_args);
        let app = RunwatchApp::try_parse_from(args).expect("arguments are valid");
        let output = OutputContext {
            verbose: false,
            color: crate::output::Color::Never,
        };

        let mut writer = OutputWriter::Test {
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let exit_code = app.exec_with(output, &mut writer, SignalHandlerKind::Noop)?;
        let OutputWriter::Test { stdout, stderr } = writer else {
            unreachable!("writer is a test writer");
        };
        Ok(Captured {
            exit_code,
            stdout: String::from_utf8(stdout).expect("stdout is UTF-8"),
            stderr: String::from_utf8(stderr).expect("stderr is UTF-8"),
        })
    }

    #[test]
    fn clean_run_succeeds() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        let captured = run(
            &dir,
            indoc! {r#"
                {"type":"test:start","data":{"name":"a","file":"a.js","nesting":0}}
                {"type":"test:stdout","data":{"message":"hello from a\n"}}
                {"type":"test:pass","data":{"name":"a","file":"a.js","nesting":0,"duration":12}}
            "#},
            &[],
        )
        .expect("run succeeds");

        assert_eq!(captured.exit_code, RunwatchExitCode::OK);
        assert_eq!(captured.stdout, "hello from a\n");
        assert!(
            captured.stderr.starts_with("        PASS [   0.012s] a\n"),
            "stderr: {}",
            captured.stderr
        );
        assert!(captured.stderr.contains("        FILE a.js: 1/1 test passed\n"));
        assert!(!captured.stderr.contains("INCOMPLETE"));
    }

    #[test]
    fn unfinished_test_fails_run() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        let captured = run(
            &dir,
            indoc! {r#"
                {"type":"test:start","data":{"name":"A","file":"f","nesting":0}}
                {"type":"test:pass","data":{"name":"A","file":"f","nesting":0,"duration":45}}
                {"type":"test:start","data":{"name":"B","file":"f","nesting":0}}
            "#},
            &["--hide-passing"],
        )
        .expect("run succeeds");

        assert_eq!(captured.exit_code, RunwatchExitCode::TEST_RUN_FAILED);
        assert!(!captured.stderr.contains("PASS"), "stderr: {}", captured.stderr);
        assert!(captured.stderr.contains("  INCOMPLETE 1 test still running:\n"));
        assert!(captured.stderr.contains("LIKELY STUCK"));
        assert!(captured.stderr.contains("1 passed, 1 incomplete, 0 skipped"));
    }

    struct FailingReader;

    impl tokio::io::AsyncRead for FailingReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Err(io::Error::other("input went away")))
        }
    }

    #[test]
    fn read_error_still_reports_unfinished_tests() {
        use tokio::io::AsyncReadExt;

        let config = TrackerConfig::default();
        let displayer = TextDisplayerBuilder::default().build(&config);
        let watch = Watch {
            config: &config,
            displayer: &displayer,
            verbose: false,
            signal_handler: SignalHandlerKind::Noop,
        };
        let input = br#"{"type":"test:start","data":{"name":"B","file":"f","nesting":0}}"#
            .as_slice()
            .chain(&b"\n"[..])
            .chain(FailingReader);
        let source = EventSource::new(BufReader::new(input), "flaky input", SignalHandlerKind::Noop)
            .expect("noop handler always builds");

        let mut writer = OutputWriter::Test {
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime created");
        let error = runtime
            .block_on(watch.watch(source, &mut writer))
            .expect_err("the read error is returned");
        assert!(
            matches!(error, ExpectedError::EventReadError { .. }),
            "unexpected error: {error:?}"
        );
        assert_eq!(error.process_exit_code(), RunwatchExitCode::SETUP_ERROR);

        let OutputWriter::Test { stderr, .. } = writer else {
            unreachable!("writer is a test writer");
        };
        let stderr = String::from_utf8(stderr).expect("stderr is UTF-8");
        assert!(stderr.contains("  INCOMPLETE 1 test still running:\n"), "stderr: {stderr}");
        assert!(stderr.contains("LIKELY STUCK"), "stderr: {stderr}");
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        let mut events =
            br#"{"type":"test:start","data":{"name":"a","file":"a.js","nesting":0}}"#.to_vec();
        events.extend_from_slice(b"\n\xff\xfe\n");
        events.extend_from_slice(
            br#"{"type":"test:pass","data":{"name":"a","file":"a.js","nesting":0}}"#,
        );
        events.push(b'\n');

        let captured = run(&dir, events, &[]).expect("run succeeds");
        assert_eq!(captured.exit_code, RunwatchExitCode::OK);
        assert!(captured.stderr.contains("1 passed"), "stderr: {}", captured.stderr);
        assert!(!captured.stderr.contains("INCOMPLETE"));
    }

    #[test]
    fn invalid_config_is_a_setup_error() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        std::fs::write(dir.path().join("runwatch.toml"), "slow-limit = \"many\"\n")
            .expect("wrote config");
        let error = run(&dir, "", &[])
            .err()
            .expect("config is rejected");
        assert_eq!(error.process_exit_code(), RunwatchExitCode::SETUP_ERROR);
    }

    #[test]
    fn display_opts_override_config() {
        let opts = DisplayOpts {
            hide_passing: true,
            hide_skip: false,
            slow_limit: Some(2),
        };
        let mut config = TrackerConfig::default();
        opts.apply(&mut config);
        assert!(!config.show_passing());
        assert!(config.show_skip());
        assert_eq!(config.slow_limit(), 2);
    }
}
