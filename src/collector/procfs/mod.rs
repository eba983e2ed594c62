//! Probes for the Linux `/proc` filesystem.
//!
//! This module provides parsers and probes for reading system and process
//! information from the `/proc` virtual filesystem.

pub mod parser;
pub mod process;
pub mod system;

pub use process::{ProcessProbe, ProcessStats};
pub use system::{CpuProbe, LoadProbe, MemoryProbe, UptimeInfo, UptimeProbe};
