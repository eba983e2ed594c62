//! Summary of the metrics CSV log.
//!
//! Columns are looked up by name, so logs with extra or reordered columns
//! still summarize. Empty or unparseable cells count as unavailable and are
//! left out of averages instead of being read as zero.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::fmt::round2;

/// CPU percentage at or above which a sample counts as a spike.
pub const CPU_SPIKE_THRESHOLD: f64 = 80.0;

/// Number of trailing samples listed in the report.
pub const RECENT_SAMPLES: usize = 10;

/// Average and maximum of one percentage column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ColumnStats {
    pub average: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnStats {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let sum: f64 = values.iter().sum();
        Self {
            average: Some(round2(sum / values.len() as f64)),
            max: values.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuSpike {
    pub timestamp: String,
    pub cpu_percent: f64,
}

/// One of the trailing samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub timestamp: String,
    pub cpu_percent: Option<String>,
    pub mem_percent: Option<String>,
    pub disk_percent: Option<String>,
}

/// Values of the most recent sample, as logged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatestSample {
    pub uptime_seconds: Option<String>,
    pub idle_seconds: Option<String>,
    pub total_processes: Option<String>,
    pub running_processes: Option<String>,
    pub sleeping_processes: Option<String>,
    pub top_cpu: Vec<String>,
    pub top_mem: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub samples: usize,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
    pub cpu: ColumnStats,
    pub memory: ColumnStats,
    pub disk: ColumnStats,
    /// Every sample at or above [`CPU_SPIKE_THRESHOLD`], oldest first.
    pub cpu_spikes: Vec<CpuSpike>,
    pub latest: Option<LatestSample>,
    /// The last [`RECENT_SAMPLES`] samples, oldest first.
    pub recent: Vec<Measurement>,
}

/// One data row keyed by column name.
struct Row<'a> {
    cells: HashMap<&'a str, &'a str>,
}

impl<'a> Row<'a> {
    /// Non-empty cell of the first column in `names` that exists.
    fn get(&self, names: &[&str]) -> Option<&'a str> {
        names
            .iter()
            .find_map(|name| self.cells.get(name).copied())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn number(&self, names: &[&str]) -> Option<f64> {
        self.get(names)?.trim_end_matches('%').parse().ok()
    }

    fn owned(&self, names: &[&str]) -> Option<String> {
        self.get(names).map(str::to_string)
    }
}

// Accepted column names, canonical first.
const TIMESTAMP: &[&str] = &["timestamp", "time"];
const CPU: &[&str] = &["cpu_percent", "cpu_usage_percent"];
const MEM: &[&str] = &["mem_percent", "mem_percentage", "memory_percent"];
const DISK: &[&str] = &["disk_percent"];
const UPTIME: &[&str] = &["uptime_seconds"];
const IDLE: &[&str] = &["idle_seconds"];
const TOTAL: &[&str] = &["total_processes", "proc_total"];
const RUNNING: &[&str] = &["running_processes", "proc_running"];
const SLEEPING: &[&str] = &["sleeping_processes", "proc_sleeping_est"];
const TOP_CPU: [&str; 3] = ["top_cpu_1", "top_cpu_2", "top_cpu_3"];
const TOP_MEM: [&str; 3] = ["top_mem_1", "top_mem_2", "top_mem_3"];

/// Summarizes the content of a metrics log.
pub fn summarize_metrics_log(content: &str) -> MetricsSummary {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return MetricsSummary::default();
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    let rows: Vec<Row> = lines
        .enumerate()
        .filter_map(|(i, line)| {
            let cells: Vec<&str> = line.split(',').collect();
            if cells.len() != columns.len() {
                debug!("Skipping malformed metrics row {}", i + 2);
                return None;
            }
            Some(Row {
                cells: columns.iter().copied().zip(cells).collect(),
            })
        })
        .collect();

    let values = |names: &[&str]| -> Vec<f64> { rows.iter().filter_map(|r| r.number(names)).collect() };

    let cpu_spikes = rows
        .iter()
        .filter_map(|row| {
            let cpu = row.number(CPU)?;
            (cpu >= CPU_SPIKE_THRESHOLD).then(|| CpuSpike {
                timestamp: row.owned(TIMESTAMP).unwrap_or_default(),
                cpu_percent: cpu,
            })
        })
        .collect();

    let latest = rows.last().map(|last| LatestSample {
        uptime_seconds: last.owned(UPTIME),
        idle_seconds: last.owned(IDLE),
        total_processes: last.owned(TOTAL),
        running_processes: last.owned(RUNNING),
        sleeping_processes: last.owned(SLEEPING),
        top_cpu: TOP_CPU.iter().filter_map(|c| last.owned(&[*c])).collect(),
        top_mem: TOP_MEM.iter().filter_map(|c| last.owned(&[*c])).collect(),
    });

    let recent = rows[rows.len().saturating_sub(RECENT_SAMPLES)..]
        .iter()
        .map(|row| Measurement {
            timestamp: row.owned(TIMESTAMP).unwrap_or_default(),
            cpu_percent: row.owned(CPU),
            mem_percent: row.owned(MEM),
            disk_percent: row.owned(DISK),
        })
        .collect();

    MetricsSummary {
        samples: rows.len(),
        first_timestamp: rows.first().and_then(|r| r.owned(TIMESTAMP)),
        last_timestamp: rows.last().and_then(|r| r.owned(TIMESTAMP)),
        cpu: ColumnStats::from_values(&values(CPU)),
        memory: ColumnStats::from_values(&values(MEM)),
        disk: ColumnStats::from_values(&values(DISK)),
        cpu_spikes,
        latest,
        recent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::header_line;

    /// Builds a canonical row from the columns that matter here.
    fn row(ts: &str, cpu: &str, mem: &str, disk: &str) -> String {
        let mut cells = vec![String::new(); 24];
        cells[0] = ts.to_string();
        cells[1] = cpu.to_string();
        cells[9] = mem.to_string();
        cells[13] = disk.to_string();
        cells[14] = "3600".to_string();
        cells[15] = "7000".to_string();
        cells[16] = "120".to_string();
        cells[5] = "2".to_string();
        cells[17] = "118".to_string();
        cells[18] = "postgres:1001:55.00".to_string();
        cells[21] = "java:77:12.40".to_string();
        cells.join(",")
    }

    fn log(rows: &[String]) -> String {
        let mut out = header_line();
        out.push('\n');
        for r in rows {
            out.push_str(r);
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_averages_and_peaks() {
        let content = log(&[
            row("2026-10-18 12:00:00", "10.00", "40.00", "50.00"),
            row("2026-10-18 12:00:10", "90.00", "60.00", "50.00"),
            row("2026-10-18 12:00:20", "20.00", "50.00", "51.00"),
        ]);
        let summary = summarize_metrics_log(&content);

        assert_eq!(summary.samples, 3);
        assert_eq!(summary.first_timestamp.as_deref(), Some("2026-10-18 12:00:00"));
        assert_eq!(summary.last_timestamp.as_deref(), Some("2026-10-18 12:00:20"));
        assert_eq!(summary.cpu.average, Some(40.0));
        assert_eq!(summary.cpu.max, Some(90.0));
        assert_eq!(summary.memory.average, Some(50.0));
        assert_eq!(summary.disk.max, Some(51.0));
        assert_eq!(
            summary.cpu_spikes,
            vec![CpuSpike {
                timestamp: "2026-10-18 12:00:10".into(),
                cpu_percent: 90.0,
            }]
        );
    }

    #[test]
    fn test_empty_cells_are_not_zero() {
        let content = log(&[
            row("2026-10-18 12:00:00", "10.00", "", "50.00"),
            row("2026-10-18 12:00:10", "30.00", "", "50.00"),
        ]);
        let summary = summarize_metrics_log(&content);

        assert_eq!(summary.cpu.average, Some(20.0));
        assert_eq!(summary.memory, ColumnStats::default());
        assert_eq!(summary.recent[0].mem_percent, None);
    }

    #[test]
    fn test_latest_sample() {
        let content = log(&[row("2026-10-18 12:00:00", "1.00", "2.00", "3.00")]);
        let latest = summarize_metrics_log(&content).latest.unwrap();

        assert_eq!(latest.uptime_seconds.as_deref(), Some("3600"));
        assert_eq!(latest.idle_seconds.as_deref(), Some("7000"));
        assert_eq!(latest.total_processes.as_deref(), Some("120"));
        assert_eq!(latest.running_processes.as_deref(), Some("2"));
        assert_eq!(latest.sleeping_processes.as_deref(), Some("118"));
        assert_eq!(latest.top_cpu, ["postgres:1001:55.00"]);
        assert_eq!(latest.top_mem, ["java:77:12.40"]);
    }

    #[test]
    fn test_recent_keeps_last_ten() {
        let rows: Vec<String> = (0..25)
            .map(|i| row(&format!("t{:02}", i), "1.00", "1.00", "1.00"))
            .collect();
        let summary = summarize_metrics_log(&log(&rows));

        assert_eq!(summary.samples, 25);
        assert_eq!(summary.recent.len(), RECENT_SAMPLES);
        assert_eq!(summary.recent[0].timestamp, "t15");
        assert_eq!(summary.recent[9].timestamp, "t24");
    }

    #[test]
    fn test_other_column_names_are_understood() {
        let content = "time,cpu_usage_percent,memory_percent\n\
                       2026-01-01 00:00:00,85%,40\n\
                       2026-01-01 00:00:05,15%,60\n";
        let summary = summarize_metrics_log(content);

        assert_eq!(summary.cpu.max, Some(85.0));
        assert_eq!(summary.memory.average, Some(50.0));
        assert_eq!(summary.disk.average, None);
        assert_eq!(summary.cpu_spikes.len(), 1);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let mut content = log(&[row("2026-10-18 12:00:00", "5.00", "5.00", "5.00")]);
        content.push_str("garbage,row\n");

        assert_eq!(summarize_metrics_log(&content).samples, 1);
    }

    #[test]
    fn test_header_only() {
        let summary = summarize_metrics_log(&log(&[]));
        assert_eq!(summary.samples, 0);
        assert!(summary.latest.is_none());
        assert_eq!(summary.cpu.average, None);
    }
}
