//! Data models for the two pipelines.
//!
//! - [`file`]: directory snapshots (`FileRecord`, `Snapshot`)
//! - [`event`]: change events derived from two snapshots
//! - [`sample`]: one row of system metrics
//!
//! ```text
//! Snapshot (prev) ─┐
//!                  ├── diff ──> ChangeEvent[] ──> directory log
//! Snapshot (curr) ─┘
//!
//! probes ──> MetricSample ──> metrics log
//! ```

mod event;
pub(crate) mod file;
mod sample;

pub use event::{AttributeChange, ChangeEvent, ChangeKind};
pub use file::{FileRecord, Snapshot};
pub use sample::{
    DiskUsage, LoadAverage, METRIC_COLUMNS, MemoryUsage, MetricSample, TOP_N, TopProcess,
};
