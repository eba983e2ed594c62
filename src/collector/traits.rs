//! The seam between the collectors and the host.
//!
//! The directory scanner and every probe read through [`FileSystem`], which
//! [`RealFs`] backs with `std::fs` and `statvfs(3)`. Tests swap in `MockFs`.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Kind of a filesystem entry, as far as the scanner cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    /// Sockets, fifos, device nodes.
    Other,
}

/// Metadata of a single filesystem entry (the subset of `stat(2)` we track).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,
    /// Size in bytes.
    pub size: u64,
    /// Full `st_mode`, including file type bits.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// `st_mtime`.
    pub modified: SystemTime,
    /// `st_atime`.
    pub accessed: SystemTime,
    /// `st_ctime` (status change time).
    pub changed: SystemTime,
}

/// Capacity of a mounted filesystem, as reported by `statvfs(3)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsCapacity {
    /// Fragment size (`f_frsize`), the unit of the block counters.
    pub fragment_size: u64,
    /// Total blocks (`f_blocks`).
    pub blocks: u64,
    /// Free blocks, including those reserved for root (`f_bfree`).
    pub blocks_free: u64,
    /// Free blocks available to unprivileged users (`f_bavail`).
    pub blocks_available: u64,
}

/// Host access used by the collectors.
///
/// Implementations are shared across probe threads, hence `Send + Sync`.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Full paths of the entries of `path`, in no particular order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Reads metadata for a path, following symlinks.
    fn metadata(&self, path: &Path) -> io::Result<FileStat>;

    /// Reads the capacity of the filesystem containing `path`.
    fn capacity(&self, path: &Path) -> io::Result<FsCapacity>;
}

/// The live host.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

/// `st_*time` plus `st_*time_nsec` as a `SystemTime`; pre-epoch values are allowed.
fn unix_time(secs: i64, nsecs: i64) -> SystemTime {
    let nanos = nsecs.clamp(0, 999_999_999) as u32;
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nanos)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + Duration::from_nanos(nanos as u64)
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        let file_type = meta.file_type();
        let kind = if file_type.is_file() {
            FileKind::Regular
        } else if file_type.is_dir() {
            FileKind::Directory
        } else {
            FileKind::Other
        };

        Ok(FileStat {
            kind,
            size: meta.size(),
            mode: meta.mode(),
            uid: meta.uid(),
            gid: meta.gid(),
            modified: unix_time(meta.mtime(), meta.mtime_nsec()),
            accessed: unix_time(meta.atime(), meta.atime_nsec()),
            changed: unix_time(meta.ctime(), meta.ctime_nsec()),
        })
    }

    #[allow(clippy::unnecessary_cast)]
    fn capacity(&self, path: &Path) -> io::Result<FsCapacity> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL byte"))?;

        // SAFETY: `statvfs` is plain old data; an all-zero value is valid.
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        // SAFETY: `c_path` is a valid NUL-terminated string and `stat` is a
        // valid, writable `statvfs` for the duration of the call.
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(FsCapacity {
            fragment_size: stat.f_frsize as u64,
            blocks: stat.f_blocks as u64,
            blocks_free: stat.f_bfree as u64,
            blocks_available: stat.f_bavail as u64,
        })
    }
}
