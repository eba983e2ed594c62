//! Mock filesystem for testing collectors without a real host.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
pub use scenarios::proc_stat_line;
