//! Collectors for the two monitoring pipelines.
//!
//! This module reads host state: the contents of a watched directory and
//! system metrics from the Linux `/proc` filesystem. All OS access goes
//! through the [`FileSystem`] trait so both collectors run against [`MockFs`]
//! in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  DirectoryScanner          SystemCollector                   │
//! │  - read_dir + stat         ┌──────┬──────┬────────┬────────┐ │
//! │                            │ Cpu  │ Load │ Memory │ Uptime │ │
//! │                            ├──────┴──┬───┴────────┴────────┤ │
//! │                            │ Process │ Disk (statvfs)      │ │
//! │                            └────┬────┴──────────┬──────────┘ │
//! │         │                       │ one thread per probe       │
//! │         └──────────────┬────────┘                            │
//! │                 ┌──────▼──────┐                              │
//! │                 │  FileSystem │ (trait)                      │
//! │                 └──────┬──────┘                              │
//! └────────────────────────┼─────────────────────────────────────┘
//!              ┌───────────┼───────────────┐
//!       ┌──────▼──────┐ ┌──▼──────────┐ ┌──▼──────────┐
//!       │   RealFs    │ │   MockFs    │ │  Scenarios  │
//!       │ (Linux)     │ │ (Testing)   │ │ (Fixtures)  │
//!       └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use hostwatch::collector::{CollectorConfig, RealFs, SystemCollector};
//!
//! let mut collector = SystemCollector::new(RealFs::new(), &CollectorConfig::default());
//! let sample = collector.collect_once();
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use std::path::Path;
//! use hostwatch::collector::{DirectoryScanner, MockFs};
//!
//! let scanner = DirectoryScanner::new(MockFs::watched_directory());
//! let report = scanner.scan(Path::new("/watch"));
//! assert_eq!(report.snapshot.len(), 2);
//! ```

#[allow(clippy::module_inception)]
mod collector;
mod directory;
mod disk;
pub mod mock;
pub mod probe;
pub mod procfs;
pub mod traits;

pub use collector::{CollectorConfig, SystemCollector};
pub use directory::{DirectoryScanner, ScanError, ScanReport};
pub use disk::DiskProbe;
pub use mock::MockFs;
pub use probe::{Probe, ProbeError};
pub use traits::{FileSystem, RealFs};
