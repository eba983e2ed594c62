//! Read-only reports over the two logs.
//!
//! Nothing here writes to the monitored logs. A log that does not exist yet is
//! reported as not found instead of failing the whole report.

mod directory;
mod metrics;

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::fmt::format_timestamp;

pub use directory::{DirectorySummary, RECENT_LINES, summarize_directory_log};
pub use metrics::{
    CPU_SPIKE_THRESHOLD, ColumnStats, CpuSpike, LatestSample, Measurement, MetricsSummary,
    RECENT_SAMPLES, summarize_metrics_log,
};

/// Spikes listed in the text report; the JSON output has all of them.
const LISTED_SPIKES: usize = 10;

const RULE: &str = "======================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------------";
const NOT_AVAILABLE: &str = "not available";

/// Error type for report failures.
#[derive(Debug)]
pub enum ReportError {
    Io { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Io { source, .. } => Some(source),
        }
    }
}

/// Summary of one log, or the fact that it is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LogSection<T> {
    Found { path: PathBuf, summary: T },
    NotFound { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub directory: LogSection<DirectorySummary>,
    pub metrics: LogSection<MetricsSummary>,
}

/// Reads both logs and summarizes them.
pub fn build_report(directory_log: &Path, metrics_log: &Path) -> Result<Report, ReportError> {
    Ok(Report {
        generated_at: format_timestamp(&Local::now()),
        directory: load_section(directory_log, summarize_directory_log)?,
        metrics: load_section(metrics_log, summarize_metrics_log)?,
    })
}

fn load_section<T>(path: &Path, summarize: fn(&str) -> T) -> Result<LogSection<T>, ReportError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(LogSection::Found {
            path: path.to_path_buf(),
            summary: summarize(&content),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(LogSection::NotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ReportError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{:.2}%", v))
}

fn text(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{RULE}\n{title}\n{RULE}\n");
}

/// Renders the integrated plain-text report.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{RULE}\nIntegrated Monitoring Report\n{RULE}");
    let _ = writeln!(out, "Generated: {}\n", report.generated_at);

    heading(&mut out, "DIRECTORY MONITORING SUMMARY");
    match &report.directory {
        LogSection::NotFound { path } => {
            let _ = writeln!(out, "Log file not found at: {}", path.display());
        }
        LogSection::Found { path, summary } => render_directory(&mut out, path, summary),
    }
    out.push('\n');

    heading(&mut out, "SYSTEM PERFORMANCE SUMMARY");
    match &report.metrics {
        LogSection::NotFound { path } => {
            let _ = writeln!(out, "CSV file not found at: {}", path.display());
        }
        LogSection::Found { path, summary } => render_metrics(&mut out, path, summary),
    }

    let _ = writeln!(out, "\n{RULE}\nEND OF REPORT\n{RULE}");
    out
}

fn render_directory(out: &mut String, path: &Path, summary: &DirectorySummary) {
    let _ = writeln!(out, "Log source: {}", path.display());
    let _ = writeln!(out, "Total file creations detected: {}", summary.created);
    let _ = writeln!(out, "Total file modifications detected: {}", summary.modified);
    let _ = writeln!(out, "Total file deletions detected: {}\n", summary.deleted);

    let _ = writeln!(out, "Recent events (last {} lines):", RECENT_LINES);
    let _ = writeln!(out, "{THIN_RULE}");
    for line in &summary.recent_lines {
        let _ = writeln!(out, "{}", line);
    }
}

fn render_metrics(out: &mut String, path: &Path, summary: &MetricsSummary) {
    let _ = writeln!(out, "Log source: {}", path.display());
    if summary.samples == 0 {
        let _ = writeln!(out, "No measurements recorded yet.");
        return;
    }

    let _ = writeln!(
        out,
        "Time range: {} -> {}",
        text(summary.first_timestamp.as_deref()),
        text(summary.last_timestamp.as_deref())
    );
    let _ = writeln!(out, "Total measurements: {}\n", summary.samples);

    let _ = writeln!(out, "Average CPU usage: {}", percent(summary.cpu.average));
    let _ = writeln!(out, "Average Memory usage: {}", percent(summary.memory.average));
    let _ = writeln!(out, "Average Disk usage: {}", percent(summary.disk.average));
    let _ = writeln!(out, "Peak CPU usage: {}", percent(summary.cpu.max));
    let _ = writeln!(out, "Peak Memory usage: {}", percent(summary.memory.max));
    let _ = writeln!(out, "Peak Disk usage: {}\n", percent(summary.disk.max));

    let _ = writeln!(
        out,
        "CPU spikes >= {:.0}%: {}",
        CPU_SPIKE_THRESHOLD,
        summary.cpu_spikes.len()
    );
    for spike in summary.cpu_spikes.iter().take(LISTED_SPIKES) {
        let _ = writeln!(out, "  - {} : {:.2}%", spike.timestamp, spike.cpu_percent);
    }
    out.push('\n');

    if let Some(latest) = &summary.latest {
        let _ = writeln!(out, "Latest uptime (s): {}", text(latest.uptime_seconds.as_deref()));
        let _ = writeln!(out, "Latest idle (s): {}", text(latest.idle_seconds.as_deref()));
        let _ = writeln!(out, "Total processes: {}", text(latest.total_processes.as_deref()));
        let _ = writeln!(out, "Running: {}", text(latest.running_processes.as_deref()));
        let _ = writeln!(
            out,
            "Sleeping (estimated): {}\n",
            text(latest.sleeping_processes.as_deref())
        );

        for (title, list) in [("CPU", &latest.top_cpu), ("MEMORY", &latest.top_mem)] {
            let _ = writeln!(out, "Top 3 processes by {} (latest):", title);
            if list.is_empty() {
                let _ = writeln!(out, "  {}", NOT_AVAILABLE);
            }
            for (i, entry) in list.iter().enumerate() {
                let _ = writeln!(out, "  {}) {}", i + 1, entry);
            }
        }
        out.push('\n');
    }

    let _ = writeln!(out, "Recent measurements (last {}):", RECENT_SAMPLES);
    let _ = writeln!(out, "{THIN_RULE}");
    for m in &summary.recent {
        let _ = writeln!(
            out,
            "{}: CPU={} MEM={} DISK={}",
            m.timestamp,
            cell_percent(m.cpu_percent.as_deref()),
            cell_percent(m.mem_percent.as_deref()),
            cell_percent(m.disk_percent.as_deref()),
        );
    }
}

fn cell_percent(value: Option<&str>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{}%", v.trim_end_matches('%')))
}
