//! Shared formatting helpers for the logs and the report.
//!
//! Everything that decides how a value looks on disk lives here, so the
//! directory log, the metrics log and the viewer agree on one rendering.

use std::time::SystemTime;

use chrono::{DateTime, Local};

/// Timestamp layout used in both logs.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `ctime(3)` layout used in the session banner.
pub const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// Round to two decimal digits.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage with exactly two decimals, empty for `None`.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => String::new(),
    }
}

/// Any displayable value, empty for `None`.
pub fn format_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Permission bits as three octal digits (`"644"`).
pub fn format_permissions(mode: u32) -> String {
    format!("{:03o}", mode & 0o777)
}

/// Format byte count as human-readable size: `"1.5G"`, `"100.3M"`, `"512B"`.
pub fn format_bytes(bytes: u64) -> String {
    const GB: u64 = 1024 * 1024 * 1024;
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    if bytes >= GB {
        format!("{:.1}G", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1}K", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Wall-clock timestamp in [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Filesystem timestamp rendered in local time.
pub fn format_system_time(ts: SystemTime) -> String {
    format_timestamp(&DateTime::<Local>::from(ts))
}

// ---------------------------------------------------------------------------
// Text normalization
// ---------------------------------------------------------------------------

/// Makes a value safe for a single CSV cell without quoting.
/// Commas, quotes and line breaks become spaces.
pub fn sanitize_field(s: &str) -> String {
    s.replace([',', '"', '\n', '\r'], " ")
}

/// Keeps a value on one log line: control characters become Rust-style
/// escapes (`\n`, `\u{1b}`). Other characters pass through unchanged.
pub fn escape_control(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}
