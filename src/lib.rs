//! hostwatch - poll-based directory and system metrics monitor.
//!
//! This library provides the core functionality shared between:
//! - `hostwatchd` - daemon running the directory and metrics pipelines
//! - `hostwatch` - read-only report over the two logs

pub mod collector;
pub mod config;
pub mod diff;
pub mod fmt;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod util;
