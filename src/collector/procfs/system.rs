//! Probes for global system metrics from `/proc/`.

use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::collector::probe::{Probe, ProbeError};
use crate::collector::procfs::parser::{
    CpuTimes, parse_cpu_times, parse_loadavg, parse_meminfo, parse_uptime,
};
use crate::collector::traits::FileSystem;
use crate::fmt::round2;
use crate::storage::model::{LoadAverage, MemoryUsage};

/// Reads a `/proc` file relative to `proc_path`.
fn read_proc<F: FileSystem>(fs: &F, proc_path: &str, name: &str) -> io::Result<String> {
    let path = format!("{}/{}", proc_path, name);
    fs.read_to_string(Path::new(&path))
}

/// CPU utilization from two reads of `/proc/stat` across a short window.
pub struct CpuProbe<F: FileSystem> {
    fs: F,
    proc_path: String,
    window: Duration,
}

impl<F: FileSystem> CpuProbe<F> {
    /// Creates a new CPU probe.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `window` - Time between the two reads of `/proc/stat`
    pub fn new(fs: F, proc_path: impl Into<String>, window: Duration) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            window,
        }
    }

    fn read_times(&self) -> Result<CpuTimes, ProbeError> {
        let content = read_proc(&self.fs, &self.proc_path, "stat")?;
        Ok(parse_cpu_times(&content)?)
    }
}

/// Busy percentage (`100 - idle%`) between two reads, rounded to 2 decimals.
///
/// When no time elapsed between the reads, the since-boot breakdown of
/// `second` is used instead. Returns `None` if no CPU time is accounted at all.
pub fn cpu_percent_between(first: &CpuTimes, second: &CpuTimes) -> Option<f64> {
    let mut total = second.total().saturating_sub(first.total());
    let mut idle = second.idle.saturating_sub(first.idle);
    if total == 0 {
        total = second.total();
        idle = second.idle;
    }
    if total == 0 {
        return None;
    }
    let idle_percent = idle as f64 / total as f64 * 100.0;
    Some(round2((100.0 - idle_percent).clamp(0.0, 100.0)))
}

impl<F: FileSystem + 'static> Probe for CpuProbe<F> {
    type Output = f64;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn sample(&self) -> Result<f64, ProbeError> {
        let first = self.read_times()?;
        thread::sleep(self.window);
        let second = self.read_times()?;
        cpu_percent_between(&first, &second)
            .ok_or_else(|| ProbeError::Parse("no CPU time accounted in /proc/stat".into()))
    }
}

/// Load averages from `/proc/loadavg`.
pub struct LoadProbe<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> LoadProbe<F> {
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }
}

impl<F: FileSystem + 'static> Probe for LoadProbe<F> {
    type Output = LoadAverage;

    fn name(&self) -> &'static str {
        "load"
    }

    fn sample(&self) -> Result<LoadAverage, ProbeError> {
        let content = match read_proc(&self.fs, &self.proc_path, "loadavg") {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ProbeError::Unsupported("load average"));
            }
            Err(e) => return Err(e.into()),
        };
        let info = parse_loadavg(&content)?;

        Ok(LoadAverage {
            one: info.load1,
            five: info.load5,
            fifteen: info.load15,
        })
    }
}

/// Memory usage from `/proc/meminfo`, in bytes.
pub struct MemoryProbe<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> MemoryProbe<F> {
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }
}

impl<F: FileSystem + 'static> Probe for MemoryProbe<F> {
    type Output = MemoryUsage;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn sample(&self) -> Result<MemoryUsage, ProbeError> {
        let content = read_proc(&self.fs, &self.proc_path, "meminfo")?;
        let info = parse_meminfo(&content)?;

        Ok(MemoryUsage::from_total_available(
            info.mem_total * 1024,
            info.available() * 1024,
        ))
    }
}

/// Seconds since boot and accumulated idle seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UptimeInfo {
    pub uptime_seconds: u64,
    /// Idle time summed over all CPUs.
    pub idle_seconds: u64,
}

/// Uptime and idle time from `/proc/uptime`.
pub struct UptimeProbe<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> UptimeProbe<F> {
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }
}

impl<F: FileSystem + 'static> Probe for UptimeProbe<F> {
    type Output = UptimeInfo;

    fn name(&self) -> &'static str {
        "uptime"
    }

    fn sample(&self) -> Result<UptimeInfo, ProbeError> {
        let content = read_proc(&self.fs, &self.proc_path, "uptime")?;
        let up = parse_uptime(&content)?;

        Ok(UptimeInfo {
            uptime_seconds: up.uptime as u64,
            idle_seconds: up.idle as u64,
        })
    }
}
