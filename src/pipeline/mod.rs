//! Polling loops that tie a collector to its sink.
//!
//! ```text
//! DirectoryPipeline: scan ──> diff(previous, current) ──> DirectoryEventLog
//! MetricsPipeline:   SystemCollector::collect_once   ──> MetricsLog
//! ```
//!
//! Each pipeline owns its state and its sink and runs on its own thread. A
//! loop stops when the shared running flag is cleared, when the optional
//! sample limit is reached, or when its sink fails for good.

mod directory;
mod metrics;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::error;

use crate::storage::SinkError;

pub use directory::DirectoryPipeline;
pub use metrics::MetricsPipeline;

/// Granularity of the interruptible sleep between iterations.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// When a pipeline iterates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Period between the starts of two iterations.
    pub interval: Duration,
    /// Stop after this many iterations. `None` runs until stopped.
    pub max_samples: Option<u64>,
}

impl Schedule {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            max_samples: None,
        }
    }

    pub fn limited(mut self, max_samples: Option<u64>) -> Self {
        self.max_samples = max_samples;
        self
    }
}

/// What a finished loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub iterations: u64,
    /// Events or rows written.
    pub records: u64,
}

pub type PipelineHandle = thread::JoinHandle<Result<PipelineSummary, SinkError>>;

/// Runs `body` on a thread named `name`.
///
/// A sink failure clears `running` so the other pipeline stops too. So does a
/// thread that cannot be started, before this returns.
pub fn spawn_pipeline<B>(name: &'static str, running: Arc<AtomicBool>, body: B) -> Option<PipelineHandle>
where
    B: FnOnce(&AtomicBool) -> Result<PipelineSummary, SinkError> + Send + 'static,
{
    let flag = Arc::clone(&running);
    let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
        let result = body(&flag);
        if let Err(e) = &result {
            error!("{} pipeline stopped: {}", name, e);
            flag.store(false, Ordering::SeqCst);
        }
        result
    });

    started_or_stop(name, spawned, &running)
}

fn started_or_stop(
    name: &str,
    spawned: io::Result<PipelineHandle>,
    running: &AtomicBool,
) -> Option<PipelineHandle> {
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("Failed to start {} pipeline: {}", name, e);
            running.store(false, Ordering::SeqCst);
            None
        }
    }
}

/// Sleeps up to `duration`, returning early once `running` is cleared.
pub fn sleep_while_running(running: &AtomicBool, duration: Duration) {
    let mut remaining = duration;
    while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
        let sleep_time = remaining.min(SLEEP_SLICE);
        thread::sleep(sleep_time);
        remaining = remaining.saturating_sub(sleep_time);
    }
}

/// Drives `step` on `schedule` until stopped. `step` returns the number of
/// records it wrote; its error ends the loop.
fn run_loop<S>(schedule: &Schedule, running: &AtomicBool, mut step: S) -> Result<PipelineSummary, SinkError>
where
    S: FnMut() -> Result<usize, SinkError>,
{
    let mut summary = PipelineSummary::default();

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();

        summary.records += step()? as u64;
        summary.iterations += 1;

        if schedule
            .max_samples
            .is_some_and(|max| summary.iterations >= max)
        {
            break;
        }

        sleep_while_running(running, schedule.interval.saturating_sub(started.elapsed()));
    }

    Ok(summary)
}
