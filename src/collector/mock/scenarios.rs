//! Canned hosts shared by the collector, pipeline and doc tests.

use std::time::{Duration, UNIX_EPOCH};

use super::filesystem::MockFs;
use crate::collector::traits::{FileStat, FsCapacity};

/// Builds a `/proc/[pid]/stat` line with the fields the probes read.
pub fn proc_stat_line(pid: u32, comm: &str, state: char, utime: u64, stime: u64, rss: i64) -> String {
    format!(
        "{pid} ({comm}) {state} 0 {pid} {pid} 0 -1 4194304 0 0 0 0 {utime} {stime} 0 0 20 0 1 0 100 10000000 {rss} 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0"
    )
}

impl MockFs {
    /// systemd, bash and two running processes (postgres, python3) on a root
    /// filesystem that is 63.16% full.
    pub fn typical_system() -> Self {
        let mut fs = MockFs::new();

        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 2/150 1234\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
",
        );
        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );

        fs.add_process(1, &proc_stat_line(1, "systemd", 'S', 100, 50, 2000));
        fs.add_process(1000, &proc_stat_line(1000, "bash", 'S', 10, 5, 1000));
        fs.add_process(1001, &proc_stat_line(1001, "postgres", 'R', 5000, 1000, 50000));
        fs.add_process(1002, &proc_stat_line(1002, "python3", 'R', 300, 20, 30000));

        // Non-process entries in /proc must be ignored by the process probe.
        fs.add_dir("/proc/sys");
        fs.add_dir("/proc/self");

        fs.set_capacity(
            "/",
            FsCapacity {
                fragment_size: 4096,
                blocks: 1_000_000,
                blocks_free: 400_000,
                blocks_available: 350_000,
            },
        );

        fs
    }

    /// A system whose `/proc/meminfo` reports zero total memory.
    pub fn with_zero_memory() -> Self {
        let mut fs = Self::typical_system();
        fs.add_file(
            "/proc/meminfo",
            "MemTotal: 0 kB\nMemFree: 0 kB\nMemAvailable: 0 kB\n",
        );
        fs
    }

    /// A platform without load averages.
    pub fn without_loadavg() -> Self {
        let mut fs = Self::typical_system();
        fs.remove_file("/proc/loadavg");
        fs
    }

    /// A process that exits between listing and reading, plus a zombie.
    pub fn with_process_churn() -> Self {
        let mut fs = Self::typical_system();
        fs.add_dir("/proc/4000");
        fs.add_process(4001, &proc_stat_line(4001, "defunct", 'Z', 0, 0, 0));
        fs
    }

    /// A watched directory with two regular files, a subdirectory and a file
    /// inside the subdirectory.
    pub fn watched_directory() -> Self {
        let mut fs = MockFs::new();
        let t = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        fs.add_file_with_stat("/watch/notes.txt", FileStat::regular(100, 0o644, t));
        fs.add_file_with_stat(
            "/watch/report.csv",
            FileStat::regular(2048, 0o600, t + Duration::from_secs(100)),
        );
        fs.add_dir("/watch/archive");
        fs.add_file("/watch/archive/old.txt", "old");

        fs
    }
}
