// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tests that run the runwatch binary.

#[cfg(unix)]
mod signals {
    use camino_tempfile::Utf8TempDir;
    use std::{
        io::{BufRead, BufReader, Read, Write},
        process::{Child, Command, ExitStatus, Stdio},
        time::{Duration, Instant},
    };

    fn spawn_runwatch(dir: &Utf8TempDir) -> Child {
        Command::new(env!("CARGO_BIN_EXE_runwatch"))
            .args(["--color", "never", "--verbose"])
            .current_dir(dir.path())
            .env_remove("RUNWATCH_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawned runwatch")
    }

    fn wait_with_deadline(child: &mut Child, timeout: Duration) -> ExitStatus {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().expect("waited for runwatch") {
                return status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                panic!("runwatch didn't exit within {timeout:?} of the signal");
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    #[test]
    fn terminate_exits_while_input_stays_open() {
        let dir = Utf8TempDir::new().expect("temp dir created");
        let mut child = spawn_runwatch(&dir);

        // Hold on to stdin for the whole test, like a test runner that hangs.
        let mut stdin = child.stdin.take().expect("stdin is piped");
        writeln!(
            stdin,
            r#"{{"type":"test:start","data":{{"name":"hang","file":"hang.js","nesting":0}}}}"#
        )
        .expect("wrote start event");
        stdin.flush().expect("flushed stdin");

        // The start line is only shown once events are being read, so signal handlers are set up.
        let mut stderr = BufReader::new(child.stderr.take().expect("stderr is piped"));
        let mut line = String::new();
        loop {
            line.clear();
            let read = stderr.read_line(&mut line).expect("read from runwatch");
            assert_ne!(read, 0, "runwatch exited before showing the running test");
            if line.contains("RUNNING") && line.contains("hang") {
                break;
            }
        }

        let pid = i32::try_from(child.id()).expect("pid fits in pid_t");
        // SAFETY: kill has no memory safety preconditions.
        let result = unsafe { libc::kill(pid, libc::SIGTERM) };
        assert_eq!(result, 0, "sent SIGTERM");

        let status = wait_with_deadline(&mut child, Duration::from_secs(10));
        let mut rest = String::new();
        stderr
            .read_to_string(&mut rest)
            .expect("read the rest of stderr");

        assert_eq!(status.code(), Some(1), "stderr: {rest}");
        assert!(rest.contains("INCOMPLETE 1 test still running"), "stderr: {rest}");
        assert!(
            rest.contains("LIKELY STUCK") && rest.contains("hang (hang.js)"),
            "stderr: {rest}"
        );

        drop(stdin);
    }
}
