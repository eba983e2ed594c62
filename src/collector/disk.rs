//! Disk usage probe backed by `statvfs(3)`.

use std::path::PathBuf;

use crate::collector::probe::{Probe, ProbeError};
use crate::collector::traits::FileSystem;
use crate::storage::model::DiskUsage;

/// Usage of the filesystem containing `path`.
pub struct DiskProbe<F: FileSystem> {
    fs: F,
    path: PathBuf,
}

impl<F: FileSystem> DiskProbe<F> {
    pub fn new(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }
}

impl<F: FileSystem + 'static> Probe for DiskProbe<F> {
    type Output = DiskUsage;

    fn name(&self) -> &'static str {
        "disk"
    }

    /// `free` counts only blocks available to unprivileged users, so
    /// `used + free` can be less than `total` on filesystems with reserved blocks.
    fn sample(&self) -> Result<DiskUsage, ProbeError> {
        let cap = self.fs.capacity(&self.path)?;
        let frsize = cap.fragment_size;

        Ok(DiskUsage::new(
            cap.blocks * frsize,
            cap.blocks.saturating_sub(cap.blocks_free) * frsize,
            cap.blocks_available * frsize,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::RealFs;
    use crate::collector::mock::MockFs;
    use crate::collector::traits::FsCapacity;

    #[test]
    fn test_disk_usage_from_capacity() {
        let probe = DiskProbe::new(MockFs::typical_system(), "/");
        let disk = probe.sample().unwrap();

        assert_eq!(disk.total, 4_096_000_000);
        assert_eq!(disk.used, 2_457_600_000);
        assert_eq!(disk.free, 1_433_600_000);
        assert_eq!(disk.percent, Some(63.16));
    }

    #[test]
    fn test_empty_filesystem_has_no_percent() {
        let mut fs = MockFs::new();
        fs.set_capacity("/empty", FsCapacity::default());

        let disk = DiskProbe::new(fs, "/empty").sample().unwrap();
        assert_eq!(disk.total, 0);
        assert_eq!(disk.percent, None);
    }

    #[test]
    fn test_unknown_mount_is_an_error() {
        let probe = DiskProbe::new(MockFs::new(), "/mnt/missing");
        assert!(matches!(probe.sample(), Err(ProbeError::Io(_))));
    }

    #[test]
    fn test_real_root_filesystem() {
        let disk = DiskProbe::new(RealFs::new(), "/").sample().unwrap();
        assert!(disk.total > 0);
        assert!(disk.used <= disk.total);
    }
}
