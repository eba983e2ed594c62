//! Probe capability: one independently fault-tolerant reader per metric family.
//!
//! A probe may block (slow `/proc`, hung NFS mount under `statvfs`), so the
//! collector runs each probe on its own thread and only waits for it until a
//! deadline. A probe that misses the deadline is reported as
//! [`ProbeError::TimedOut`]; its thread keeps running until the read returns,
//! and [`PendingProbe::is_running`] tells the owner not to start another.

use std::cell::Cell;
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Instant;

use crate::collector::procfs::parser::ParseError;

/// Error type for probe failures. Every variant is recoverable.
#[derive(Debug)]
pub enum ProbeError {
    /// I/O error reading the source.
    Io(io::Error),
    /// The source was read but could not be parsed.
    Parse(String),
    /// The metric does not exist on this platform.
    Unsupported(&'static str),
    /// The probe did not answer before the deadline.
    TimedOut,
    /// The probe thread died without answering.
    Panicked,
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Io(e) => write!(f, "I/O error: {}", e),
            ProbeError::Parse(msg) => write!(f, "parse error: {}", msg),
            ProbeError::Unsupported(what) => write!(f, "{} not supported on this platform", what),
            ProbeError::TimedOut => write!(f, "timed out"),
            ProbeError::Panicked => write!(f, "probe thread panicked"),
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<io::Error> for ProbeError {
    fn from(e: io::Error) -> Self {
        ProbeError::Io(e)
    }
}

impl From<ParseError> for ProbeError {
    fn from(e: ParseError) -> Self {
        ProbeError::Parse(e.message)
    }
}

/// Reader for one metric family.
pub trait Probe: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Short name used in diagnostics and thread names.
    fn name(&self) -> &'static str;

    /// Reads the metric once.
    fn sample(&self) -> Result<Self::Output, ProbeError>;
}

/// A probe running on its own thread.
pub struct PendingProbe<T> {
    state: PendingState<T>,
    finished: Cell<bool>,
}

enum PendingState<T> {
    Running(Receiver<Result<T, ProbeError>>),
    /// The thread could not be started.
    NotStarted(io::Error),
}

impl<T> PendingProbe<T> {
    /// Waits for the probe's answer until `deadline`.
    ///
    /// After [`ProbeError::TimedOut`] the thread may still be blocked in its
    /// read; any other outcome means it has finished.
    pub fn wait(&self, deadline: Instant) -> Result<T, ProbeError> {
        match &self.state {
            PendingState::NotStarted(e) => Err(ProbeError::Io(io::Error::new(e.kind(), e.to_string()))),
            PendingState::Running(rx) => {
                let received = rx.recv_timeout(deadline.saturating_duration_since(Instant::now()));
                self.finished.set(!matches!(received, Err(RecvTimeoutError::Timeout)));
                match received {
                    Ok(result) => result,
                    Err(RecvTimeoutError::Timeout) => Err(ProbeError::TimedOut),
                    Err(RecvTimeoutError::Disconnected) => Err(ProbeError::Panicked),
                }
            }
        }
    }

    /// True while the probe thread has neither answered nor died.
    ///
    /// A late answer is consumed and dropped.
    pub fn is_running(&self) -> bool {
        if self.finished.get() {
            return false;
        }
        let running = match &self.state {
            PendingState::NotStarted(_) => false,
            PendingState::Running(rx) => matches!(rx.try_recv(), Err(TryRecvError::Empty)),
        };
        self.finished.set(!running);
        running
    }
}

/// Starts `probe` on a dedicated thread.
pub fn spawn_probe<P: Probe>(probe: Arc<P>) -> PendingProbe<P::Output> {
    let thread_name = format!("probe-{}", probe.name());
    // Capacity 1 so an abandoned probe can still send and exit.
    let (tx, rx) = mpsc::sync_channel(1);

    let spawned = thread::Builder::new()
        .name(thread_name)
        .spawn(move || {
            let _ = tx.send(probe.sample());
        });

    let state = match spawned {
        Ok(_) => PendingState::Running(rx),
        Err(e) => PendingState::NotStarted(e),
    };

    PendingProbe {
        state,
        finished: Cell::new(false),
    }
}
