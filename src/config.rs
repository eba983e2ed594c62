//! Daemon configuration: command-line flags with environment fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::collector::CollectorConfig;
use crate::pipeline::Schedule;

/// Directory and system metrics monitor.
#[derive(Parser, Debug, Clone)]
#[command(name = "hostwatchd", about = "Directory and system metrics monitor", version)]
pub struct Config {
    /// Directory whose files are tracked.
    #[arg(long, env = "HOSTWATCH_WATCH_DIR", default_value = "./test_directory")]
    pub watch_dir: PathBuf,

    /// Text log of directory change events.
    #[arg(long, env = "HOSTWATCH_DIRECTORY_LOG", default_value = "./logs/directory_changes.log")]
    pub directory_log: PathBuf,

    /// CSV log of system metric samples.
    #[arg(long, env = "HOSTWATCH_METRICS_LOG", default_value = "./logs/system_metrics.csv")]
    pub metrics_log: PathBuf,

    /// Seconds between directory scans.
    #[arg(long, env = "HOSTWATCH_DIRECTORY_INTERVAL", default_value = "5")]
    pub directory_interval: u64,

    /// Seconds between metric samples.
    #[arg(long, env = "HOSTWATCH_METRICS_INTERVAL", default_value = "10")]
    pub metrics_interval: u64,

    /// Stop each pipeline after this many iterations.
    #[arg(long, env = "HOSTWATCH_SAMPLES")]
    pub samples: Option<u64>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, env = "HOSTWATCH_PROC_PATH", default_value = "/proc")]
    pub proc_path: String,

    /// Any path on the filesystem whose disk usage is reported.
    #[arg(long, env = "HOSTWATCH_DISK_PATH", default_value = "/")]
    pub disk_path: PathBuf,

    /// Milliseconds between the two reads of CPU counters.
    #[arg(long, env = "HOSTWATCH_CPU_WINDOW_MS", default_value = "200")]
    pub cpu_window_ms: u64,

    /// Milliseconds a sample waits for its probes.
    #[arg(long, env = "HOSTWATCH_PROBE_TIMEOUT_MS", default_value = "3000")]
    pub probe_timeout_ms: u64,

    /// Disable the directory pipeline.
    #[arg(long)]
    pub no_directory: bool,

    /// Disable the metrics pipeline.
    #[arg(long)]
    pub no_metrics: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Invalid configuration, reported before any pipeline starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroInterval(&'static str),
    TimeoutShorterThanWindow { timeout_ms: u64, window_ms: u64 },
    NothingToRun,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroInterval(which) => write!(f, "{} must be at least 1 second", which),
            ConfigError::TimeoutShorterThanWindow {
                timeout_ms,
                window_ms,
            } => write!(
                f,
                "probe timeout ({}ms) is shorter than the CPU sampling window ({}ms)",
                timeout_ms, window_ms
            ),
            ConfigError::NothingToRun => write!(f, "both pipelines are disabled"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory_interval == 0 {
            return Err(ConfigError::ZeroInterval("--directory-interval"));
        }
        if self.metrics_interval == 0 {
            return Err(ConfigError::ZeroInterval("--metrics-interval"));
        }
        if self.probe_timeout_ms < self.cpu_window_ms {
            return Err(ConfigError::TimeoutShorterThanWindow {
                timeout_ms: self.probe_timeout_ms,
                window_ms: self.cpu_window_ms,
            });
        }
        if self.no_directory && self.no_metrics {
            return Err(ConfigError::NothingToRun);
        }
        Ok(())
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            proc_path: self.proc_path.clone(),
            disk_path: self.disk_path.clone(),
            cpu_window: Duration::from_millis(self.cpu_window_ms),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
        }
    }

    pub fn directory_schedule(&self) -> Schedule {
        Schedule::every(Duration::from_secs(self.directory_interval)).limited(self.samples)
    }

    pub fn metrics_schedule(&self) -> Schedule {
        Schedule::every(Duration::from_secs(self.metrics_interval)).limited(self.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("hostwatchd").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);

        assert_eq!(config.watch_dir, PathBuf::from("./test_directory"));
        assert_eq!(config.metrics_log, PathBuf::from("./logs/system_metrics.csv"));
        assert_eq!(config.directory_interval, 5);
        assert_eq!(config.metrics_interval, 10);
        assert_eq!(config.samples, None);
        assert!(config.validate().is_ok());

        let collector = config.collector_config();
        assert_eq!(collector.cpu_window, Duration::from_millis(200));
        assert_eq!(collector.probe_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--watch-dir",
            "/srv/incoming",
            "--metrics-interval",
            "2",
            "--samples",
            "4",
            "-vv",
        ]);

        assert_eq!(config.watch_dir, PathBuf::from("/srv/incoming"));
        assert_eq!(config.verbose, 2);
        assert_eq!(
            config.metrics_schedule(),
            Schedule {
                interval: Duration::from_secs(2),
                max_samples: Some(4),
            }
        );
        assert_eq!(config.directory_schedule().max_samples, Some(4));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let config = parse(&["--directory-interval", "0"]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval("--directory-interval"))
        );
    }

    #[test]
    fn test_timeout_must_cover_cpu_window() {
        let config = parse(&["--cpu-window-ms", "500", "--probe-timeout-ms", "100"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TimeoutShorterThanWindow { .. })
        ));
    }

    #[test]
    fn test_both_pipelines_disabled() {
        let config = parse(&["--no-directory", "--no-metrics"]);
        assert_eq!(config.validate(), Err(ConfigError::NothingToRun));
    }
}
