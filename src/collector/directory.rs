//! Directory scanner: builds a [`Snapshot`] of the regular files in one directory.
//!
//! Scans tolerate partial failure. A missing directory yields an empty
//! snapshot plus a [`ScanError::DirectoryUnavailable`]; a file whose metadata
//! cannot be read is left out of the snapshot.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::collector::traits::{FileKind, FileStat, FileSystem};
use crate::storage::model::{FileRecord, Snapshot};

/// Recoverable scan failures.
#[derive(Debug)]
pub enum ScanError {
    /// The watched directory does not exist or cannot be listed.
    DirectoryUnavailable { path: PathBuf, source: io::Error },
    /// A listed entry vanished or could not be stat'ed.
    MetadataUnavailable { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::DirectoryUnavailable { path, source } => {
                write!(f, "directory {} unavailable: {}", path.display(), source)
            }
            ScanError::MetadataUnavailable { path, source } => {
                write!(f, "metadata for {} unavailable: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScanError::DirectoryUnavailable { source, .. }
            | ScanError::MetadataUnavailable { source, .. } => Some(source),
        }
    }
}

/// Result of one scan.
#[derive(Debug)]
pub struct ScanReport {
    pub snapshot: Snapshot,
    /// Set when the directory itself could not be listed.
    pub unavailable: Option<ScanError>,
    /// Number of entries left out because their metadata could not be read.
    pub omitted: usize,
}

/// Scans one directory through a [`FileSystem`].
pub struct DirectoryScanner<F: FileSystem> {
    fs: F,
}

impl<F: FileSystem> DirectoryScanner<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Lists `dir` and reads metadata of each regular file.
    ///
    /// Subdirectories and special files are skipped.
    pub fn scan(&self, dir: &Path) -> ScanReport {
        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(source) => {
                return ScanReport {
                    snapshot: Snapshot::new(),
                    unavailable: Some(ScanError::DirectoryUnavailable {
                        path: dir.to_path_buf(),
                        source,
                    }),
                    omitted: 0,
                };
            }
        };

        let mut omitted = 0;
        let mut records = Vec::with_capacity(entries.len());

        for path in entries {
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };

            match self.fs.metadata(&path) {
                Ok(stat) if stat.kind == FileKind::Regular => {
                    records.push(file_record(name, path, &stat));
                }
                Ok(_) => {}
                Err(source) => {
                    omitted += 1;
                    let err = ScanError::MetadataUnavailable { path, source };
                    debug!("Skipping entry: {}", err);
                }
            }
        }

        ScanReport {
            snapshot: records.into_iter().collect(),
            unavailable: None,
            omitted,
        }
    }
}

/// Extracts the tracked attributes of one regular file.
fn file_record(name: String, path: PathBuf, stat: &FileStat) -> FileRecord {
    FileRecord {
        name,
        path,
        size_bytes: stat.size,
        permissions: stat.mode & 0o777,
        owner_id: stat.uid,
        group_id: stat.gid,
        modified_at: stat.modified,
        accessed_at: stat.accessed,
        created_at: stat.changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::RealFs;
    use crate::collector::mock::MockFs;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_scan_tracks_regular_files_only() {
        let fs = MockFs::watched_directory();
        let scanner = DirectoryScanner::new(fs);

        let report = scanner.scan(Path::new("/watch"));

        assert!(report.unavailable.is_none());
        let names: Vec<&String> = report.snapshot.names().collect();
        assert_eq!(names, ["notes.txt", "report.csv"]);
        assert_eq!(report.omitted, 0);
    }

    #[test]
    fn test_scan_extracts_metadata() {
        let fs = MockFs::watched_directory();
        let scanner = DirectoryScanner::new(fs);

        let snapshot = scanner.scan(Path::new("/watch")).snapshot;
        let record = snapshot.get("report.csv").unwrap();

        assert_eq!(record.path, PathBuf::from("/watch/report.csv"));
        assert_eq!(record.size_bytes, 2048);
        assert_eq!(record.permissions, 0o600);
        assert_eq!(record.owner_id, 1000);
        assert_eq!(record.group_id, 1000);
        assert_eq!(
            record.modified_at,
            UNIX_EPOCH + Duration::from_secs(1_700_000_100)
        );
    }

    #[test]
    fn test_scan_missing_directory_is_empty_and_flagged() {
        let scanner = DirectoryScanner::new(MockFs::new());
        let report = scanner.scan(Path::new("/does/not/exist"));

        assert!(report.snapshot.is_empty());
        assert!(matches!(
            report.unavailable,
            Some(ScanError::DirectoryUnavailable { .. })
        ));
    }

    #[test]
    fn test_scan_omits_unreadable_files() {
        let mut fs = MockFs::watched_directory();
        fs.add_unreadable("/watch/vanished.tmp");
        let scanner = DirectoryScanner::new(fs);

        let report = scanner.scan(Path::new("/watch"));
        assert_eq!(report.snapshot.len(), 2);
        assert!(!report.snapshot.contains("vanished.tmp"));
        assert_eq!(report.omitted, 1);
    }

    #[test]
    fn test_scan_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"abc").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("inner.txt"), b"x").unwrap();

        let scanner = DirectoryScanner::new(RealFs::new());
        let report = scanner.scan(dir.path());

        assert!(report.unavailable.is_none());
        assert_eq!(report.snapshot.len(), 1);
        assert_eq!(report.snapshot.get("a.txt").unwrap().size_bytes, 3);
    }

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::DirectoryUnavailable {
            path: PathBuf::from("/x"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.to_string(), "directory /x unavailable: gone");
    }
}
