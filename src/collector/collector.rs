//! System collector that runs every probe and assembles one [`MetricSample`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, warn};

use crate::collector::disk::DiskProbe;
use crate::collector::probe::{PendingProbe, Probe, ProbeError, spawn_probe};
use crate::collector::procfs::{CpuProbe, LoadProbe, MemoryProbe, ProcessProbe, UptimeProbe};
use crate::collector::traits::FileSystem;
use crate::storage::model::MetricSample;

/// Where and how the probes read.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Base path of the proc filesystem.
    pub proc_path: String,
    /// Any path on the filesystem whose usage is reported.
    pub disk_path: PathBuf,
    /// Sleep between the two reads of CPU counters.
    pub cpu_window: Duration,
    /// Shared deadline for all probes of one sample.
    pub probe_timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            proc_path: "/proc".to_string(),
            disk_path: PathBuf::from("/"),
            cpu_window: Duration::from_millis(200),
            probe_timeout: Duration::from_millis(3000),
        }
    }
}

/// One probe and its most recent run.
///
/// A run that missed its deadline stays here until its thread returns, so a
/// probe stuck in the kernel occupies one thread at most.
struct ProbeSlot<P: Probe> {
    probe: Arc<P>,
    in_flight: Option<PendingProbe<P::Output>>,
    /// The current run was started for an earlier sample.
    stale: bool,
}

impl<P: Probe> ProbeSlot<P> {
    fn new(probe: P) -> Self {
        Self {
            probe: Arc::new(probe),
            in_flight: None,
            stale: false,
        }
    }

    /// Starts a run unless the previous one is still blocked.
    fn start(&mut self) {
        self.stale = self.in_flight.as_ref().is_some_and(PendingProbe::is_running);
        if !self.stale {
            self.in_flight = Some(spawn_probe(Arc::clone(&self.probe)));
        }
    }

    /// Waits for the run started by [`start`](Self::start) and degrades its
    /// failure to `None`.
    fn settle(&mut self, deadline: Instant) -> Option<P::Output> {
        let name = self.probe.name();
        if self.stale {
            warn!("Probe {} still blocked since an earlier sample", name);
            return None;
        }

        let result = self.in_flight.as_ref()?.wait(deadline);
        if !matches!(result, Err(ProbeError::TimedOut)) {
            self.in_flight = None;
        }
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Probe {} failed: {}", name, e);
                None
            }
        }
    }
}

/// Gathers all system metrics into a single sample.
///
/// Probes run concurrently, each on its own thread. A probe that fails or
/// misses the deadline leaves its fields empty; the sample is still produced.
pub struct SystemCollector<F: FileSystem + Clone + 'static> {
    cpu: ProbeSlot<CpuProbe<F>>,
    load: ProbeSlot<LoadProbe<F>>,
    memory: ProbeSlot<MemoryProbe<F>>,
    disk: ProbeSlot<DiskProbe<F>>,
    uptime: ProbeSlot<UptimeProbe<F>>,
    processes: ProbeSlot<ProcessProbe<F>>,
    probe_timeout: Duration,
}

impl<F: FileSystem + Clone + 'static> SystemCollector<F> {
    pub fn new(fs: F, config: &CollectorConfig) -> Self {
        let proc_path = config.proc_path.as_str();
        Self {
            cpu: ProbeSlot::new(CpuProbe::new(fs.clone(), proc_path, config.cpu_window)),
            load: ProbeSlot::new(LoadProbe::new(fs.clone(), proc_path)),
            memory: ProbeSlot::new(MemoryProbe::new(fs.clone(), proc_path)),
            disk: ProbeSlot::new(DiskProbe::new(fs.clone(), config.disk_path.clone())),
            uptime: ProbeSlot::new(UptimeProbe::new(fs.clone(), proc_path)),
            processes: ProbeSlot::new(ProcessProbe::new(fs, proc_path, config.cpu_window)),
            probe_timeout: config.probe_timeout,
        }
    }

    /// Collects one sample. The timestamp is taken when collection starts.
    pub fn collect_once(&mut self) -> MetricSample {
        let started = Instant::now();
        let deadline = started + self.probe_timeout;
        let mut sample = MetricSample::empty(Local::now());

        self.cpu.start();
        self.load.start();
        self.memory.start();
        self.disk.start();
        self.uptime.start();
        self.processes.start();

        sample.cpu_percent = self.cpu.settle(deadline);
        sample.load = self.load.settle(deadline);
        sample.memory = self.memory.settle(deadline);
        sample.disk = self.disk.settle(deadline);

        if let Some(up) = self.uptime.settle(deadline) {
            sample.uptime_seconds = Some(up.uptime_seconds);
            sample.idle_seconds = Some(up.idle_seconds);
        }

        if let Some(stats) = self.processes.settle(deadline) {
            sample.running_processes = Some(stats.running);
            sample.total_processes = Some(stats.total);
            sample.sleeping_processes = Some(stats.sleeping);
            sample.top_cpu = stats.top_cpu;
            sample.top_mem = stats.top_mem;
        }

        debug!("Collected metrics sample in {:?}", started.elapsed());
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::collector::traits::{FileStat, FsCapacity};
    use std::io;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn test_config() -> CollectorConfig {
        CollectorConfig {
            cpu_window: Duration::ZERO,
            probe_timeout: Duration::from_secs(2),
            ..CollectorConfig::default()
        }
    }

    /// Delegates to a mock but blocks in `statvfs`, like a hung network mount.
    ///
    /// The first `hung_calls` calls sleep for `delay`; later ones answer at once.
    #[derive(Clone)]
    struct HungDiskFs {
        inner: MockFs,
        delay: Duration,
        hung_calls: usize,
        calls: Arc<AtomicUsize>,
    }

    impl HungDiskFs {
        fn new(delay: Duration, hung_calls: usize) -> Self {
            Self {
                inner: MockFs::typical_system(),
                delay,
                hung_calls,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FileSystem for HungDiskFs {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            self.inner.read_to_string(path)
        }

        fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
            self.inner.read_dir(path)
        }

        fn metadata(&self, path: &Path) -> io::Result<FileStat> {
            self.inner.metadata(path)
        }

        fn capacity(&self, path: &Path) -> io::Result<FsCapacity> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.hung_calls {
                thread::sleep(self.delay);
            }
            self.inner.capacity(path)
        }
    }

    #[test]
    fn test_collect_typical_system() {
        let mut collector = SystemCollector::new(MockFs::typical_system(), &test_config());
        let sample = collector.collect_once();

        assert_eq!(sample.cpu_percent, Some(15.61));
        assert_eq!(sample.load.as_ref().map(|l| l.one.as_str()), Some("0.15"));
        assert_eq!(sample.memory.and_then(|m| m.percent), Some(26.76));
        assert_eq!(sample.disk.and_then(|d| d.percent), Some(63.16));
        assert_eq!(sample.uptime_seconds, Some(12345));
        assert_eq!(sample.idle_seconds, Some(98765));
        assert_eq!(sample.total_processes, Some(4));
        assert_eq!(sample.running_processes, Some(2));
        assert_eq!(sample.sleeping_processes, Some(2));
        assert_eq!(sample.top_cpu.len(), 3);

        let top_mem: Vec<&str> = sample.top_mem.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(top_mem, ["postgres", "python3", "systemd"]);
    }

    #[test]
    fn test_zero_total_memory_leaves_percent_empty() {
        let mut collector = SystemCollector::new(MockFs::with_zero_memory(), &test_config());
        let sample = collector.collect_once();

        assert_eq!(sample.memory.map(|m| m.total), Some(0));
        assert_eq!(sample.memory.and_then(|m| m.percent), None);
        assert!(sample.top_mem.is_empty());

        let row = sample.to_row();
        assert_eq!(row[9], "");
        assert_eq!(row[1], "15.61");
    }

    #[test]
    fn test_failed_probe_only_clears_its_fields() {
        let mut collector = SystemCollector::new(MockFs::without_loadavg(), &test_config());
        let sample = collector.collect_once();

        assert!(sample.load.is_none());
        assert!(sample.cpu_percent.is_some());
        assert!(sample.memory.is_some());
        assert!(sample.total_processes.is_some());
    }

    #[test]
    fn test_empty_host_yields_empty_sample() {
        let mut collector = SystemCollector::new(MockFs::new(), &test_config());
        let sample = collector.collect_once();

        let row = sample.to_row();
        assert!(!row[0].is_empty());
        assert!(row[1..].iter().all(|cell| cell.is_empty()));
    }

    #[test]
    fn test_hung_probe_is_abandoned_at_deadline() {
        let fs = HungDiskFs::new(Duration::from_secs(3), usize::MAX);
        let config = CollectorConfig {
            probe_timeout: Duration::from_millis(200),
            ..test_config()
        };
        let mut collector = SystemCollector::new(fs, &config);

        let started = Instant::now();
        let sample = collector.collect_once();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(sample.disk.is_none());
        assert_eq!(sample.cpu_percent, Some(15.61));
        assert_eq!(sample.uptime_seconds, Some(12345));
    }

    #[test]
    fn test_blocked_probe_is_not_restarted() {
        let fs = HungDiskFs::new(Duration::from_secs(5), usize::MAX);
        let calls = Arc::clone(&fs.calls);
        let config = CollectorConfig {
            probe_timeout: Duration::from_millis(100),
            ..test_config()
        };
        let mut collector = SystemCollector::new(fs, &config);

        for _ in 0..10 {
            let sample = collector.collect_once();
            assert!(sample.disk.is_none());
            assert_eq!(sample.uptime_seconds, Some(12345));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_probe_restarts_once_blocked_read_returns() {
        let fs = HungDiskFs::new(Duration::from_millis(300), 1);
        let calls = Arc::clone(&fs.calls);
        let config = CollectorConfig {
            probe_timeout: Duration::from_millis(50),
            ..test_config()
        };
        let mut collector = SystemCollector::new(fs, &config);

        assert!(collector.collect_once().disk.is_none());
        thread::sleep(Duration::from_millis(600));

        let sample = collector.collect_once();
        assert_eq!(sample.disk.and_then(|d| d.percent), Some(63.16));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
