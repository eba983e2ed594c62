use std::sync::atomic::AtomicBool;

use tracing::{debug, info};

use crate::collector::{FileSystem, SystemCollector};
use crate::fmt::{format_bytes, format_percent};
use crate::pipeline::{PipelineSummary, Schedule, run_loop};
use crate::storage::{MetricsLog, SinkError};

/// Samples system metrics on a schedule and appends one row per sample.
pub struct MetricsPipeline<F: FileSystem + Clone + 'static> {
    collector: SystemCollector<F>,
    log: MetricsLog,
}

impl<F: FileSystem + Clone + 'static> MetricsPipeline<F> {
    pub fn new(collector: SystemCollector<F>, log: MetricsLog) -> Self {
        Self { collector, log }
    }

    /// Collects and persists one sample.
    pub fn step(&mut self) -> Result<usize, SinkError> {
        let sample = self.collector.collect_once();
        self.log.append(&sample)?;

        info!(
            "Sample: cpu={}% mem={}% disk={}%",
            display_or_na(format_percent(sample.cpu_percent)),
            display_or_na(format_percent(sample.memory.and_then(|m| m.percent))),
            display_or_na(format_percent(sample.disk.and_then(|d| d.percent))),
        );
        if let Some(mem) = sample.memory {
            debug!("Memory used {} of {}", format_bytes(mem.used), format_bytes(mem.total));
        }
        if let Some(disk) = sample.disk {
            debug!("Disk free {} of {}", format_bytes(disk.free), format_bytes(disk.total));
        }
        Ok(1)
    }

    pub fn run(
        &mut self,
        schedule: &Schedule,
        running: &AtomicBool,
    ) -> Result<PipelineSummary, SinkError> {
        info!(
            "Sampling system metrics every {:?}, logging to {}",
            schedule.interval,
            self.log.path().display()
        );

        run_loop(schedule, running, || self.step())
    }
}

fn display_or_na(value: String) -> String {
    if value.is_empty() { "n/a".to_string() } else { value }
}
