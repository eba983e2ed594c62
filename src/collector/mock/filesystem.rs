//! An in-memory host for collector tests.

use crate::collector::traits::{FileKind, FileStat, FileSystem, FsCapacity};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Fake host built up with `add_*` calls.
///
/// Files without explicit metadata stat as root-owned `0644` regular files
/// with epoch timestamps.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: HashMap<PathBuf, String>,
    directories: HashSet<PathBuf>,
    stats: HashMap<PathBuf, FileStat>,
    /// Listed by `read_dir`, but `metadata` fails.
    unreadable: HashSet<PathBuf>,
    /// Keyed by mount path.
    capacities: HashMap<PathBuf, FsCapacity>,
}

impl FileStat {
    /// Builds metadata for a regular file with the given permission bits.
    pub fn regular(size: u64, permissions: u32, modified: SystemTime) -> Self {
        Self {
            kind: FileKind::Regular,
            size,
            mode: 0o100000 | (permissions & 0o7777),
            uid: 1000,
            gid: 1000,
            modified,
            accessed: modified,
            changed: modified,
        }
    }
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_parents(&mut self, path: &Path) {
        let parents = path.ancestors().skip(1).filter(|p| !p.as_os_str().is_empty());
        self.directories.extend(parents.map(Path::to_path_buf));
    }

    /// Adds a file, creating its parent directories.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds a file with explicit metadata. The content is empty.
    pub fn add_file_with_stat(&mut self, path: impl AsRef<Path>, stat: FileStat) {
        let path = path.as_ref().to_path_buf();
        self.add_file(&path, "");
        self.stats.insert(path, stat);
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds an entry that shows up in directory listings but fails `metadata`,
    /// like a file removed between `readdir` and `stat`.
    pub fn add_unreadable(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.unreadable.insert(path);
    }

    /// Removes a file (and its metadata) if present.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.files.remove(path);
        self.stats.remove(path);
        self.unreadable.remove(path);
    }

    /// Sets the capacity reported for the filesystem mounted at `path`.
    pub fn set_capacity(&mut self, path: impl AsRef<Path>, capacity: FsCapacity) {
        self.capacities.insert(path.as_ref().to_path_buf(), capacity);
    }

    /// Adds a process with its `/proc/[pid]/stat` file.
    pub fn add_process(&mut self, pid: u32, stat: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(base.join("stat"), stat);
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("no such entry: {}", path.display()))
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(Self::not_found(path));
        }

        let children: HashSet<&PathBuf> = self
            .files
            .keys()
            .chain(&self.unreadable)
            .chain(&self.directories)
            .filter(|child| child.parent() == Some(path))
            .collect();

        Ok(children.into_iter().cloned().collect())
    }

    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        if self.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("metadata unavailable: {:?}", path),
            ));
        }
        if let Some(stat) = self.stats.get(path) {
            return Ok(stat.clone());
        }
        if let Some(content) = self.files.get(path) {
            let mut stat = FileStat::regular(content.len() as u64, 0o644, UNIX_EPOCH);
            stat.uid = 0;
            stat.gid = 0;
            return Ok(stat);
        }
        if self.directories.contains(path) {
            return Ok(FileStat {
                kind: FileKind::Directory,
                size: 4096,
                mode: 0o040755,
                uid: 0,
                gid: 0,
                modified: UNIX_EPOCH,
                accessed: UNIX_EPOCH,
                changed: UNIX_EPOCH,
            });
        }
        Err(Self::not_found(path))
    }

    fn capacity(&self, path: &Path) -> io::Result<FsCapacity> {
        self.capacities
            .get(path)
            .copied()
            .ok_or_else(|| Self::not_found(path))
    }
}
