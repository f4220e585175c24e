// Copyright (c) The runwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listening for the signals that end a watched run.

use crate::{errors::SignalHandlerSetupError, shutdown::ShutdownCause};

/// The kind of signal handling to set up while consuming events.
///
/// A `SignalHandlerKind` can be passed into [`EventSource::new`](crate::source::EventSource::new).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SignalHandlerKind {
    /// Listen for interrupts, and on Unix for termination and hangup signals as well.
    Standard,

    /// Don't listen for anything. Useful for tests.
    Noop,
}

impl SignalHandlerKind {
    pub(crate) fn build(self) -> Result<SignalHandler, SignalHandlerSetupError> {
        let signals = match self {
            Self::Standard => Some(imp::Signals::new()?),
            Self::Noop => None,
        };
        Ok(SignalHandler { signals })
    }
}

/// Turns incoming signals into shutdown causes.
#[derive(Debug)]
pub(crate) struct SignalHandler {
    signals: Option<imp::Signals>,
}

impl SignalHandler {
    /// Waits for the next signal that should stop the run.
    ///
    /// Returns `None` once nothing is left to listen to, which is immediately for
    /// [`SignalHandlerKind::Noop`].
    pub(crate) async fn recv(&mut self) -> Option<ShutdownCause> {
        self.signals.as_mut()?.recv().await
    }
}

#[cfg(unix)]
mod imp {
    use crate::shutdown::ShutdownCause;
    use tokio::signal::unix::{Signal, SignalKind, signal};

    #[derive(Debug)]
    pub(super) struct Signals {
        interrupt: CauseSignal,
        terminate: CauseSignal,
        hangup: CauseSignal,
    }

    impl Signals {
        pub(super) fn new() -> std::io::Result<Self> {
            Ok(Self {
                interrupt: CauseSignal::new(SignalKind::interrupt(), ShutdownCause::Interrupt)?,
                terminate: CauseSignal::new(SignalKind::terminate(), ShutdownCause::Terminate)?,
                hangup: CauseSignal::new(SignalKind::hangup(), ShutdownCause::Hangup)?,
            })
        }

        pub(super) async fn recv(&mut self) -> Option<ShutdownCause> {
            loop {
                let received = tokio::select! {
                    cause = self.interrupt.recv(), if self.interrupt.is_open() => cause,
                    cause = self.terminate.recv(), if self.terminate.is_open() => cause,
                    cause = self.hangup.recv(), if self.hangup.is_open() => cause,
                    else => return None,
                };
                // A `None` means that stream closed; keep waiting on the others.
                if received.is_some() {
                    return received;
                }
            }
        }
    }

    /// A signal stream and the shutdown cause it stands for.
    #[derive(Debug)]
    struct CauseSignal {
        cause: ShutdownCause,
        signal: Option<Signal>,
    }

    impl CauseSignal {
        fn new(kind: SignalKind, cause: ShutdownCause) -> std::io::Result<Self> {
            Ok(Self {
                cause,
                signal: Some(signal(kind)?),
            })
        }

        fn is_open(&self) -> bool {
            self.signal.is_some()
        }

        async fn recv(&mut self) -> Option<ShutdownCause> {
            let received = self.signal.as_mut()?.recv().await;
            if received.is_none() {
                self.signal = None;
            }
            received.map(|()| self.cause)
        }
    }
}

#[cfg(windows)]
mod imp {
    use crate::shutdown::ShutdownCause;
    use tokio::signal::windows::{CtrlC, ctrl_c};

    #[derive(Debug)]
    pub(super) struct Signals {
        ctrl_c: Option<CtrlC>,
    }

    impl Signals {
        pub(super) fn new() -> std::io::Result<Self> {
            Ok(Self {
                ctrl_c: Some(ctrl_c()?),
            })
        }

        pub(super) async fn recv(&mut self) -> Option<ShutdownCause> {
            let received = self.ctrl_c.as_mut()?.recv().await;
            if received.is_none() {
                self.ctrl_c = None;
            }
            received.map(|()| ShutdownCause::Interrupt)
        }
    }
}
