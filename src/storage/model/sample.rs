//! One row of the metrics log.
//!
//! Source: `/proc/{stat,loadavg,meminfo,uptime}`, `/proc/[pid]/stat`, `statvfs(3)`.
//!
//! Every field except the timestamp is optional: a probe that fails leaves its
//! fields at `None`, which is written as an empty cell.

use std::fmt;

use chrono::{DateTime, Local};

use crate::fmt::{format_optional, format_percent, format_timestamp, round2, sanitize_field};

/// Number of entries in each top-N process list.
pub const TOP_N: usize = 3;

/// Canonical column order of the metrics log.
///
/// A log file keeps the schema it was created with; changing this list
/// requires a new file.
pub const METRIC_COLUMNS: [&str; 24] = [
    "timestamp",
    "cpu_percent",
    "load_1",
    "load_5",
    "load_15",
    "running_processes",
    "mem_total_bytes",
    "mem_used_bytes",
    "mem_available_bytes",
    "mem_percent",
    "disk_total_bytes",
    "disk_used_bytes",
    "disk_free_bytes",
    "disk_percent",
    "uptime_seconds",
    "idle_seconds",
    "total_processes",
    "sleeping_processes",
    "top_cpu_1",
    "top_cpu_2",
    "top_cpu_3",
    "top_mem_1",
    "top_mem_2",
    "top_mem_3",
];

/// The three load averages, kept as the kernel prints them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadAverage {
    pub one: String,
    pub five: String,
    pub fifteen: String,
}

/// Memory usage in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MemoryUsage {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    /// `None` when `total` is zero.
    pub percent: Option<f64>,
}

impl MemoryUsage {
    /// Derives used memory and percentage from total and available.
    pub fn from_total_available(total: u64, available: u64) -> Self {
        let used = total.saturating_sub(available);
        let percent = (total > 0).then(|| round2(used as f64 / total as f64 * 100.0));
        Self {
            total,
            used,
            available,
            percent,
        }
    }
}

/// Disk usage of one filesystem in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    /// Space available to unprivileged users.
    pub free: u64,
    /// `used / (used + free)`, `None` when both are zero.
    pub percent: Option<f64>,
}

impl DiskUsage {
    pub fn new(total: u64, used: u64, free: u64) -> Self {
        let denominator = used + free;
        let percent = (denominator > 0).then(|| round2(used as f64 / denominator as f64 * 100.0));
        Self {
            total,
            used,
            free,
            percent,
        }
    }
}

/// One entry of a top-N process ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct TopProcess {
    pub name: String,
    pub pid: u32,
    /// CPU or memory percentage, depending on the ranking.
    pub percent: f64,
}

/// Renders as `name:pid:percent` with two decimals.
impl fmt::Display for TopProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{:.2}", self.name, self.pid, self.percent)
    }
}

/// One sampling interval's worth of system metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub timestamp: DateTime<Local>,
    pub cpu_percent: Option<f64>,
    pub load: Option<LoadAverage>,
    pub running_processes: Option<u64>,
    pub memory: Option<MemoryUsage>,
    pub disk: Option<DiskUsage>,
    pub uptime_seconds: Option<u64>,
    pub idle_seconds: Option<u64>,
    pub total_processes: Option<u64>,
    /// Estimated as `total - running`.
    pub sleeping_processes: Option<u64>,
    /// Up to [`TOP_N`] entries, highest first.
    pub top_cpu: Vec<TopProcess>,
    /// Up to [`TOP_N`] entries, highest first.
    pub top_mem: Vec<TopProcess>,
}

impl MetricSample {
    /// A sample with every probe field unavailable.
    pub fn empty(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            cpu_percent: None,
            load: None,
            running_processes: None,
            memory: None,
            disk: None,
            uptime_seconds: None,
            idle_seconds: None,
            total_processes: None,
            sleeping_processes: None,
            top_cpu: Vec::new(),
            top_mem: Vec::new(),
        }
    }

    /// Renders the sample as cells in [`METRIC_COLUMNS`] order.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(METRIC_COLUMNS.len());

        row.push(format_timestamp(&self.timestamp));
        row.push(format_percent(self.cpu_percent));

        match &self.load {
            Some(load) => {
                row.push(load.one.clone());
                row.push(load.five.clone());
                row.push(load.fifteen.clone());
            }
            None => row.extend(std::iter::repeat_n(String::new(), 3)),
        }
        row.push(format_optional(self.running_processes));

        let mem = self.memory.as_ref();
        row.push(format_optional(mem.map(|m| m.total)));
        row.push(format_optional(mem.map(|m| m.used)));
        row.push(format_optional(mem.map(|m| m.available)));
        row.push(format_percent(mem.and_then(|m| m.percent)));

        let disk = self.disk.as_ref();
        row.push(format_optional(disk.map(|d| d.total)));
        row.push(format_optional(disk.map(|d| d.used)));
        row.push(format_optional(disk.map(|d| d.free)));
        row.push(format_percent(disk.and_then(|d| d.percent)));

        row.push(format_optional(self.uptime_seconds));
        row.push(format_optional(self.idle_seconds));
        row.push(format_optional(self.total_processes));
        row.push(format_optional(self.sleeping_processes));

        for list in [&self.top_cpu, &self.top_mem] {
            for i in 0..TOP_N {
                row.push(list.get(i).map(|p| p.to_string()).unwrap_or_default());
            }
        }

        row.into_iter().map(|cell| sanitize_field(&cell)).collect()
    }
}
