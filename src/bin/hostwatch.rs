//! hostwatch - read-only report over the hostwatchd logs.
//!
//! Usage:
//!   hostwatch                          # text report to stdout
//!   hostwatch --json                   # machine-readable report
//!   hostwatch --output reports/r.txt   # write the report to a file

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;

use hostwatch::report::{Report, build_report, render_text};

/// Summarizes the directory change log and the metrics log.
#[derive(Parser)]
#[command(name = "hostwatch", about = "Monitoring report viewer", version)]
struct Args {
    /// Text log of directory change events.
    #[arg(long, env = "HOSTWATCH_DIRECTORY_LOG", default_value = "./logs/directory_changes.log")]
    directory_log: PathBuf,

    /// CSV log of system metric samples.
    #[arg(long, env = "HOSTWATCH_METRICS_LOG", default_value = "./logs/system_metrics.csv")]
    metrics_log: PathBuf,

    /// Write the report to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn render(report: &Report, json: bool) -> Result<String, serde_json::Error> {
    if json {
        serde_json::to_string_pretty(report).map(|mut s| {
            s.push('\n');
            s
        })
    } else {
        Ok(render_text(report))
    }
}

fn write_output(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

fn main() {
    let args = Args::parse();

    let report = match build_report(&args.directory_log, &args.metrics_log) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let content = match render(&report, args.json) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error rendering report: {}", e);
            std::process::exit(1);
        }
    };

    match args.output {
        Some(path) => {
            if let Err(e) = write_output(&path, &content) {
                eprintln!("Error writing '{}': {}", path.display(), e);
                std::process::exit(1);
            }
            println!("Report written to: {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout.write_all(content.as_bytes()) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
