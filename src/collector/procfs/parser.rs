//! Pure parsers for the handful of `/proc` files the probes read.
//!
//! Everything here takes file content as a string, so the probes can be tested
//! against fixtures without touching the host.

use std::fmt;
use std::str::FromStr;

/// A `/proc` file did not have the expected shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

fn number<T: FromStr>(raw: Option<&str>, what: &str) -> Result<T, ParseError> {
    raw.and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::new(format!("bad or missing {what}")))
}

/// The subset of `/proc/[pid]/stat` used for counting and ranking processes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    /// Clock ticks in user mode.
    pub utime: u64,
    /// Clock ticks in kernel mode.
    pub stime: u64,
    /// Resident pages.
    pub rss: i64,
}

impl ProcStat {
    pub fn cpu_ticks(&self) -> u64 {
        self.utime + self.stime
    }
}

// Positions counted from the state field, which follows the closing paren.
const UTIME_FIELD: usize = 11;
const STIME_FIELD: usize = 12;
const RSS_FIELD: usize = 21;

/// Parses `/proc/[pid]/stat`.
///
/// `comm` may itself contain spaces and parentheses, so it is taken as
/// everything between the first `(` and the last `)`.
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();
    let (head, rest) = content
        .split_once('(')
        .ok_or_else(|| ParseError::new("stat has no command name"))?;
    let (comm, tail) = rest
        .rsplit_once(')')
        .ok_or_else(|| ParseError::new("stat command name is not closed"))?;

    let fields: Vec<&str> = tail.split_whitespace().collect();
    if fields.len() <= RSS_FIELD {
        return Err(ParseError::new(format!(
            "stat too short: {} fields after command name",
            fields.len()
        )));
    }

    Ok(ProcStat {
        pid: number(Some(head.trim()), "pid")?,
        comm: comm.to_string(),
        state: fields[0].chars().next().unwrap_or('?'),
        utime: number(fields.get(UTIME_FIELD).copied(), "utime")?,
        stime: number(fields.get(STIME_FIELD).copied(), "stime")?,
        rss: number(fields.get(RSS_FIELD).copied(), "rss")?,
    })
}

/// Memory figures from `/proc/meminfo`, in kB.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    /// Absent before Linux 3.14.
    pub mem_available: Option<u64>,
    pub buffers: u64,
    pub cached: u64,
}

impl MemInfo {
    /// `MemAvailable`, or free plus reclaimable caches on older kernels.
    pub fn available(&self) -> u64 {
        self.mem_available
            .unwrap_or(self.mem_free + self.buffers + self.cached)
    }
}

/// Parses `/proc/meminfo`. `MemTotal` is required; other keys default to 0.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();
    let mut total = None;

    for (key, value) in content.lines().filter_map(|line| line.split_once(':')) {
        let kb = || value.split_whitespace().next().and_then(|v| v.parse().ok());
        match key.trim() {
            "MemTotal" => total = kb(),
            "MemFree" => info.mem_free = kb().unwrap_or(0),
            "MemAvailable" => info.mem_available = kb(),
            "Buffers" => info.buffers = kb().unwrap_or(0),
            "Cached" => info.cached = kb().unwrap_or(0),
            _ => {}
        }
    }

    info.mem_total = total.ok_or_else(|| ParseError::new("meminfo has no MemTotal"))?;
    Ok(info)
}

/// Jiffy counters from the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTimes {
    /// Guest time is already part of user and nice, so it is not added again.
    pub fn total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .iter()
        .sum()
    }
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// Older kernels print fewer columns; missing trailing counters read as 0.
pub fn parse_cpu_times(content: &str) -> Result<CpuTimes, ParseError> {
    let mut columns = content
        .lines()
        .map(str::split_whitespace)
        .find_map(|mut cols| (cols.next() == Some("cpu")).then_some(cols))
        .ok_or_else(|| ParseError::new("stat has no aggregate cpu line"))?;

    let counters: Vec<u64> = columns
        .by_ref()
        .take(8)
        .map(|c| c.parse().unwrap_or(0))
        .collect();
    if counters.len() < 4 {
        return Err(ParseError::new("aggregate cpu line has fewer than 4 counters"));
    }
    let at = |i: usize| counters.get(i).copied().unwrap_or(0);

    Ok(CpuTimes {
        user: at(0),
        nice: at(1),
        system: at(2),
        idle: at(3),
        iowait: at(4),
        irq: at(5),
        softirq: at(6),
        steal: at(7),
    })
}

/// Load averages from `/proc/loadavg`, kept as the kernel prints them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadAvg {
    pub load1: String,
    pub load5: String,
    pub load15: String,
}

/// Parses `/proc/loadavg`. Each of the first three fields must be numeric.
pub fn parse_loadavg(content: &str) -> Result<LoadAvg, ParseError> {
    let mut fields = content.split_whitespace();
    let mut next = |what: &str| -> Result<String, ParseError> {
        let raw = fields.next();
        number::<f64>(raw, what)?;
        Ok(raw.unwrap_or_default().to_string())
    };

    Ok(LoadAvg {
        load1: next("1-minute load")?,
        load5: next("5-minute load")?,
        load15: next("15-minute load")?,
    })
}

/// `/proc/uptime`, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Uptime {
    pub uptime: f64,
    /// Summed over all CPUs, so it can exceed `uptime`.
    pub idle: f64,
}

pub fn parse_uptime(content: &str) -> Result<Uptime, ParseError> {
    let mut fields = content.split_whitespace();
    Ok(Uptime {
        uptime: number(fields.next(), "uptime")?,
        idle: number(fields.next(), "idle time")?,
    })
}
