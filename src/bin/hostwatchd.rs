//! hostwatchd - directory and system metrics monitor daemon.
//!
//! Runs two independent polling pipelines on their own threads:
//! - directory: scans the watched directory and logs file-level changes;
//! - metrics: samples system metrics and appends one CSV row per sample.
//!
//! Both stop on Ctrl-C. A log that cannot be written even after retries stops
//! the daemon with a non-zero exit code.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use hostwatch::collector::{RealFs, SystemCollector};
use hostwatch::config::Config;
use hostwatch::pipeline::{DirectoryPipeline, MetricsPipeline, PipelineHandle, spawn_pipeline};
use hostwatch::storage::{DirectoryEventLog, MetricsLog};

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["hostwatchd", "hostwatch"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose, config.quiet);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::from(2);
    }

    info!("hostwatchd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: watch_dir={}, directory_interval={}s, metrics_interval={}s, proc={}, disk={}",
        config.watch_dir.display(),
        config.directory_interval,
        config.metrics_interval,
        config.proc_path,
        config.disk_path.display()
    );

    // Open sinks up front so a bad path fails before anything runs.
    let directory_log = if config.no_directory {
        None
    } else {
        match DirectoryEventLog::open(&config.directory_log) {
            Ok(log) => Some(log),
            Err(e) => {
                error!("Cannot open directory log: {}", e);
                return ExitCode::FAILURE;
            }
        }
    };
    let metrics_log = if config.no_metrics {
        None
    } else {
        match MetricsLog::open(&config.metrics_log) {
            Ok(log) => Some(log),
            Err(e) => {
                error!("Cannot open metrics log: {}", e);
                return ExitCode::FAILURE;
            }
        }
    };

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut handles: Vec<(&'static str, Option<PipelineHandle>)> = Vec::new();

    if let Some(log) = directory_log {
        let mut pipeline = DirectoryPipeline::new(RealFs::new(), config.watch_dir.clone(), log);
        let schedule = config.directory_schedule();
        handles.push((
            "directory",
            spawn_pipeline("directory", running.clone(), move |running| {
                pipeline.run(&schedule, running)
            }),
        ));
    }

    if let Some(log) = metrics_log {
        let collector = SystemCollector::new(RealFs::new(), &config.collector_config());
        let mut pipeline = MetricsPipeline::new(collector, log);
        let schedule = config.metrics_schedule();
        handles.push((
            "metrics",
            spawn_pipeline("metrics", running.clone(), move |running| {
                pipeline.run(&schedule, running)
            }),
        ));
    }

    let mut failed = false;
    for (name, handle) in handles {
        let Some(handle) = handle else {
            failed = true;
            continue;
        };
        match handle.join() {
            Ok(Ok(summary)) => info!(
                "{} pipeline finished: {} iterations, {} records",
                name, summary.iterations, summary.records
            ),
            Ok(Err(_)) => failed = true,
            Err(_) => {
                error!("{} pipeline panicked", name);
                failed = true;
            }
        }
    }

    info!("Shutdown complete");
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
