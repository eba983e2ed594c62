//! Data model and append-only sinks.
//!
//! Both logs are opened in append mode and never truncated. Writes take an
//! exclusive `flock` so concurrent writers (two daemons, or a daemon and a
//! manual append) never interleave a record.

mod error;
mod event_log;
mod lock;
mod metrics_log;
pub mod model;
mod retry;

pub use error::SinkError;
pub use event_log::{BANNER_RULE, BLOCK_SEPARATOR, DirectoryEventLog, format_banner, format_block};
pub use metrics_log::{MetricsLog, header_line};
pub use retry::RetryPolicy;
