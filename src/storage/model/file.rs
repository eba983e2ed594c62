//! Directory snapshot data: one `FileRecord` per tracked file.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::path::PathBuf;
use std::time::SystemTime;

/// Metadata of one regular file, as seen by one scan.
///
/// Timestamps come from the filesystem, never from the scan's wall clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// File name within the watched directory. Unique within a snapshot.
    pub name: String,
    /// Full path at scan time.
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Permission bits, masked to `0o777`.
    pub permissions: u32,
    pub owner_id: u32,
    pub group_id: u32,
    pub modified_at: SystemTime,
    pub accessed_at: SystemTime,
    /// Status change time (`ctime`).
    pub created_at: SystemTime,
}

/// Point-in-time mapping from file name to [`FileRecord`] for one directory.
///
/// Ordered by name, so iteration and derived events are deterministic.
/// A snapshot is built once and never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<String, FileRecord>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FileRecord> {
        self.files.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Iterates records in name order.
    pub fn iter(&self) -> btree_map::Values<'_, String, FileRecord> {
        self.files.values()
    }

    /// Iterates file names in order.
    pub fn names(&self) -> btree_map::Keys<'_, String, FileRecord> {
        self.files.keys()
    }
}

/// Builds a snapshot from records. A later record with a duplicate name
/// replaces the earlier one, keeping names unique.
impl FromIterator<FileRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(|r| (r.name.clone(), r)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a FileRecord;
    type IntoIter = btree_map::Values<'a, String, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    /// A record with the given size and mtime (seconds since epoch).
    pub fn record(name: &str, size: u64, mtime_secs: u64) -> FileRecord {
        let t = UNIX_EPOCH + Duration::from_secs(mtime_secs);
        FileRecord {
            name: name.to_string(),
            path: PathBuf::from("/watch").join(name),
            size_bytes: size,
            permissions: 0o644,
            owner_id: 1000,
            group_id: 1000,
            modified_at: t,
            accessed_at: t,
            created_at: t,
        }
    }
}
