//! Process table probe: counts and top-N rankings from `/proc/[pid]/stat`.

use std::collections::BTreeMap;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::collector::probe::{Probe, ProbeError};
use crate::collector::procfs::parser::{ProcStat, parse_meminfo, parse_proc_stat};
use crate::collector::traits::FileSystem;
use crate::fmt::round2;
use crate::storage::model::{TOP_N, TopProcess};
use crate::util::page_size;

/// Clock ticks per second (USER_HZ). Standard value for Linux.
const CLK_TCK: u64 = 100;

/// Process counts and rankings for one sample.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessStats {
    pub total: u64,
    /// Processes in state `R`.
    pub running: u64,
    /// `total - running`.
    pub sleeping: u64,
    pub top_cpu: Vec<TopProcess>,
    pub top_mem: Vec<TopProcess>,
}

/// Reads every process twice across the sampling window and ranks them.
pub struct ProcessProbe<F: FileSystem> {
    fs: F,
    proc_path: String,
    window: Duration,
    page_size: u64,
}

impl<F: FileSystem> ProcessProbe<F> {
    /// Creates a new process probe.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `window` - Time between the priming pass and the measuring pass
    pub fn new(fs: F, proc_path: impl Into<String>, window: Duration) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            window,
            page_size: page_size(),
        }
    }

    /// Overrides the detected page size.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Lists numeric entries of the proc directory.
    fn list_pids(&self) -> Result<Vec<u32>, ProbeError> {
        let entries = self.fs.read_dir(Path::new(&self.proc_path))?;
        let mut pids: Vec<u32> = entries
            .iter()
            .filter_map(|path| path.file_name()?.to_str()?.parse().ok())
            .collect();
        pids.sort_unstable();
        Ok(pids)
    }

    /// Reads `/proc/[pid]/stat` of every listed process.
    ///
    /// Processes that exit between listing and reading are skipped.
    fn read_pass(&self) -> Result<BTreeMap<u32, ProcStat>, ProbeError> {
        let mut stats = BTreeMap::new();
        for pid in self.list_pids()? {
            let path = format!("{}/{}/stat", self.proc_path, pid);
            let parsed = self
                .fs
                .read_to_string(Path::new(&path))
                .map_err(ProbeError::from)
                .and_then(|content| Ok(parse_proc_stat(&content)?));
            match parsed {
                Ok(stat) => {
                    stats.insert(pid, stat);
                }
                Err(e) => trace!("Skipping process {}: {}", pid, e),
            }
        }
        Ok(stats)
    }

    fn mem_total_bytes(&self) -> Option<u64> {
        let path = format!("{}/meminfo", self.proc_path);
        let content = self.fs.read_to_string(Path::new(&path)).ok()?;
        let info = parse_meminfo(&content).ok()?;
        Some(info.mem_total * 1024)
    }
}

impl<F: FileSystem + 'static> Probe for ProcessProbe<F> {
    type Output = ProcessStats;

    fn name(&self) -> &'static str {
        "processes"
    }

    fn sample(&self) -> Result<ProcessStats, ProbeError> {
        let before = self.read_pass()?;
        let started = Instant::now();
        thread::sleep(self.window);
        let after = self.read_pass()?;
        let elapsed = started.elapsed();

        Ok(build_stats(
            &before,
            &after,
            elapsed,
            self.mem_total_bytes(),
            self.page_size,
        ))
    }
}

/// Derives counts and rankings from two passes over the process table.
///
/// CPU percent is `delta_ticks / CLK_TCK / elapsed * 100`; a process absent
/// from the priming pass scores 0. Memory percent is `rss_bytes / mem_total`;
/// the memory ranking is empty when the total is unknown or zero.
pub fn build_stats(
    before: &BTreeMap<u32, ProcStat>,
    after: &BTreeMap<u32, ProcStat>,
    elapsed: Duration,
    mem_total_bytes: Option<u64>,
    page_size: u64,
) -> ProcessStats {
    let total = after.len() as u64;
    let running = after.values().filter(|s| s.state == 'R').count() as u64;
    let elapsed_secs = elapsed.as_secs_f64();

    // BTreeMap iteration is pid order, so the stable sorts below keep ties in pid order.
    let mut by_cpu: Vec<TopProcess> = after
        .values()
        .map(|stat| {
            let delta = before
                .get(&stat.pid)
                .map(|prev| stat.cpu_ticks().saturating_sub(prev.cpu_ticks()))
                .unwrap_or(0);
            let percent = if elapsed_secs > 0.0 {
                delta as f64 / CLK_TCK as f64 / elapsed_secs * 100.0
            } else {
                0.0
            };
            top_entry(stat, percent)
        })
        .collect();
    by_cpu.sort_by(|a, b| b.percent.total_cmp(&a.percent));
    by_cpu.truncate(TOP_N);

    let top_mem = match mem_total_bytes {
        Some(mem_total) if mem_total > 0 => {
            let mut by_mem: Vec<TopProcess> = after
                .values()
                .map(|stat| {
                    let rss_bytes = stat.rss.max(0) as u64 * page_size;
                    top_entry(stat, rss_bytes as f64 / mem_total as f64 * 100.0)
                })
                .collect();
            by_mem.sort_by(|a, b| b.percent.total_cmp(&a.percent));
            by_mem.truncate(TOP_N);
            by_mem
        }
        _ => Vec::new(),
    };

    ProcessStats {
        total,
        running,
        sleeping: total - running,
        top_cpu: by_cpu,
        top_mem,
    }
}

fn top_entry(stat: &ProcStat, percent: f64) -> TopProcess {
    TopProcess {
        name: stat.comm.replace(',', " "),
        pid: stat.pid,
        percent: round2(percent),
    }
}
