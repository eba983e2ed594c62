//! File-level change events derived by diffing two snapshots.

use std::path::PathBuf;
use std::time::SystemTime;

use super::file::FileRecord;

/// One monitored attribute that differs between two scans of the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeChange {
    Size { old: u64, new: u64 },
    /// Permission bits (`0o777` mask).
    Permissions { old: u32, new: u32 },
    ModifiedAt { old: SystemTime, new: SystemTime },
}

/// A change observed in the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// File present now, absent in the previous scan.
    Created(FileRecord),
    /// File present in both scans with at least one differing attribute.
    Modified {
        name: String,
        path: PathBuf,
        changes: Vec<AttributeChange>,
    },
    /// File present in the previous scan, absent now.
    Deleted { name: String, path: PathBuf },
}

/// Kind of a [`ChangeEvent`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    /// Marker line that opens the event's block in the directory log.
    ///
    /// Downstream reporters count events by these exact strings.
    pub const fn marker(self) -> &'static str {
        match self {
            ChangeKind::Created => "[FILE CREATED]",
            ChangeKind::Modified => "[FILE MODIFIED]",
            ChangeKind::Deleted => "[FILE DELETED]",
        }
    }
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Created(_) => ChangeKind::Created,
            ChangeEvent::Modified { .. } => ChangeKind::Modified,
            ChangeEvent::Deleted { .. } => ChangeKind::Deleted,
        }
    }

    /// Name of the affected file.
    pub fn name(&self) -> &str {
        match self {
            ChangeEvent::Created(record) => &record.name,
            ChangeEvent::Modified { name, .. } | ChangeEvent::Deleted { name, .. } => name,
        }
    }
}
