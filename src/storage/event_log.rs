//! Append-only text log of directory change events.
//!
//! Each event becomes one block that opens with its marker line and ends with
//! a separator:
//!
//! ```text
//! [FILE MODIFIED]
//! Time: 2026-10-18 12:00:05
//! File: a.txt
//! Size: 100 -> 200 bytes
//! --------------------------------------------------
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::fmt::{
    CTIME_FORMAT, escape_control, format_permissions, format_system_time, format_timestamp,
};
use crate::storage::error::SinkError;
use crate::storage::lock::{append_locked, ensure_parent_dir};
use crate::storage::model::{AttributeChange, ChangeEvent};
use crate::storage::retry::RetryPolicy;

/// Closes every event block.
pub const BLOCK_SEPARATOR: &str = "--------------------------------------------------";

/// Frames the session banner.
pub const BANNER_RULE: &str = "==================================================";

/// Directory event sink.
pub struct DirectoryEventLog {
    path: PathBuf,
    retry: RetryPolicy,
}

impl DirectoryEventLog {
    /// Opens (creating if needed) the log and its parent directories.
    /// Existing content is never truncated.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        ensure_parent_dir(&path)
            .and_then(|_| append_locked(&path, |_| Vec::new()))
            .map_err(|source| SinkError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the session banner for a pipeline watching `watch_dir`.
    pub fn write_banner(&self, watch_dir: &Path) -> Result<(), SinkError> {
        self.write_banner_at(watch_dir, Local::now())
    }

    pub fn write_banner_at(
        &self,
        watch_dir: &Path,
        started_at: DateTime<Local>,
    ) -> Result<(), SinkError> {
        self.append(format_banner(watch_dir, started_at))
    }

    /// Appends one event block stamped with the current time.
    pub fn record(&self, event: &ChangeEvent) -> Result<(), SinkError> {
        self.record_at(event, Local::now())
    }

    /// Appends one event block with an explicit detection time.
    pub fn record_at(
        &self,
        event: &ChangeEvent,
        detected_at: DateTime<Local>,
    ) -> Result<(), SinkError> {
        self.append(format_block(event, detected_at))
    }

    fn append(&self, text: String) -> Result<(), SinkError> {
        let bytes = text.into_bytes();
        self.retry
            .run("directory log append", || {
                append_locked(&self.path, |_| bytes.clone())
            })
            .map_err(|(attempts, source)| SinkError::WriteFailed {
                path: self.path.clone(),
                attempts,
                source,
            })
    }
}

/// Renders the banner written when monitoring starts.
pub fn format_banner(watch_dir: &Path, started_at: DateTime<Local>) -> String {
    format!(
        "{rule}\nMonitoring started at {}\nWatching: {}\n{rule}\n",
        started_at.format(CTIME_FORMAT),
        escape_control(&watch_dir.display().to_string()),
        rule = BANNER_RULE,
    )
}

/// Renders one event as a log block, including the trailing separator.
///
/// Names and paths are escaped so no value can start a line of its own.
pub fn format_block(event: &ChangeEvent, detected_at: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", event.kind().marker());
    let _ = writeln!(out, "Time: {}", format_timestamp(&detected_at));
    let _ = writeln!(out, "File: {}", escape_control(event.name()));

    match event {
        ChangeEvent::Created(record) => {
            let _ = writeln!(out, "Path: {}", escape_control(&record.path.display().to_string()));
            let _ = writeln!(out, "Size: {} bytes", record.size_bytes);
            let _ = writeln!(out, "Permissions: {}", format_permissions(record.permissions));
            let _ = writeln!(out, "Owner UID: {}", record.owner_id);
            let _ = writeln!(out, "Group GID: {}", record.group_id);
            let _ = writeln!(out, "Modified: {}", format_system_time(record.modified_at));
            let _ = writeln!(out, "Accessed: {}", format_system_time(record.accessed_at));
            let _ = writeln!(out, "Created: {}", format_system_time(record.created_at));
        }
        ChangeEvent::Modified { changes, .. } => {
            for change in changes {
                match change {
                    AttributeChange::Size { old, new } => {
                        let _ = writeln!(out, "Size: {} -> {} bytes", old, new);
                    }
                    AttributeChange::Permissions { old, new } => {
                        let _ = writeln!(
                            out,
                            "Permissions: {} -> {}",
                            format_permissions(*old),
                            format_permissions(*new)
                        );
                    }
                    AttributeChange::ModifiedAt { old, new } => {
                        let _ = writeln!(
                            out,
                            "Modified: {} -> {}",
                            format_system_time(*old),
                            format_system_time(*new)
                        );
                    }
                }
            }
        }
        ChangeEvent::Deleted { .. } => {}
    }

    out.push_str(BLOCK_SEPARATOR);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::model::file::fixtures::record;
    use chrono::TimeZone;
    use std::time::{Duration, UNIX_EPOCH};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 18, h, m, s).unwrap()
    }

    fn local(secs: u64) -> String {
        format_system_time(UNIX_EPOCH + Duration::from_secs(secs))
    }

    #[test]
    fn test_created_block() {
        let event = ChangeEvent::Created(record("a.txt", 100, 1_700_000_000));
        let block = format_block(&event, at(12, 0, 0));
        let t = local(1_700_000_000);

        let expected = format!(
            "[FILE CREATED]\n\
             Time: 2026-10-18 12:00:00\n\
             File: a.txt\n\
             Path: /watch/a.txt\n\
             Size: 100 bytes\n\
             Permissions: 644\n\
             Owner UID: 1000\n\
             Group GID: 1000\n\
             Modified: {t}\n\
             Accessed: {t}\n\
             Created: {t}\n\
             {BLOCK_SEPARATOR}\n"
        );
        assert_eq!(block, expected);
    }

    #[test]
    fn test_modified_block_lists_only_changed_attributes() {
        let event = ChangeEvent::Modified {
            name: "a.txt".into(),
            path: PathBuf::from("/watch/a.txt"),
            changes: vec![
                AttributeChange::Size { old: 100, new: 200 },
                AttributeChange::Permissions {
                    old: 0o644,
                    new: 0o600,
                },
            ],
        };
        let block = format_block(&event, at(12, 0, 5));

        assert_eq!(
            block,
            format!(
                "[FILE MODIFIED]\nTime: 2026-10-18 12:00:05\nFile: a.txt\n\
                 Size: 100 -> 200 bytes\nPermissions: 644 -> 600\n{BLOCK_SEPARATOR}\n"
            )
        );
    }

    #[test]
    fn test_modified_time_line() {
        let old = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let new = old + Duration::from_secs(60);
        let event = ChangeEvent::Modified {
            name: "a.txt".into(),
            path: PathBuf::from("/watch/a.txt"),
            changes: vec![AttributeChange::ModifiedAt { old, new }],
        };

        let block = format_block(&event, at(12, 0, 5));
        let expected = format!(
            "Modified: {} -> {}\n",
            format_system_time(old),
            format_system_time(new)
        );
        assert!(block.contains(&expected));
    }

    #[test]
    fn test_deleted_block() {
        let event = ChangeEvent::Deleted {
            name: "gone.txt".into(),
            path: PathBuf::from("/watch/gone.txt"),
        };
        assert_eq!(
            format_block(&event, at(9, 5, 0)),
            format!("[FILE DELETED]\nTime: 2026-10-18 09:05:00\nFile: gone.txt\n{BLOCK_SEPARATOR}\n")
        );
    }

    #[test]
    fn test_line_breaks_in_names_cannot_forge_markers() {
        let created = record("evil\n[FILE DELETED]", 1, 1_700_000_000);
        let block = format_block(&ChangeEvent::Created(created), at(12, 0, 0));

        assert!(block.contains("File: evil\\n[FILE DELETED]\n"));
        assert!(block.contains("Path: /watch/evil\\n[FILE DELETED]\n"));
        let markers = block.lines().filter(|l| l.starts_with("[FILE ")).count();
        assert_eq!(markers, 1);
    }

    #[test]
    fn test_separator_is_fifty_dashes() {
        assert_eq!(BLOCK_SEPARATOR.len(), 50);
        assert!(BLOCK_SEPARATOR.chars().all(|c| c == '-'));
        assert_eq!(BANNER_RULE.len(), 50);
    }

    #[test]
    fn test_banner() {
        let banner = format_banner(Path::new("/watch"), at(12, 0, 0));
        assert_eq!(
            banner,
            format!(
                "{BANNER_RULE}\nMonitoring started at Sun Oct 18 12:00:00 2026\nWatching: /watch\n{BANNER_RULE}\n"
            )
        );
    }

    #[test]
    fn test_log_appends_and_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("directory_changes.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "earlier content\n").unwrap();

        let log = DirectoryEventLog::open(&path).unwrap();
        log.write_banner_at(Path::new("/watch"), at(12, 0, 0)).unwrap();
        log.record_at(
            &ChangeEvent::Created(record("a.txt", 1, 1_700_000_000)),
            at(12, 0, 5),
        )
        .unwrap();
        log.record(&ChangeEvent::Deleted {
            name: "a.txt".into(),
            path: PathBuf::from("/watch/a.txt"),
        })
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("earlier content\n"));
        assert_eq!(content.matches("[FILE CREATED]").count(), 1);
        assert_eq!(content.matches("[FILE DELETED]").count(), 1);
        assert_eq!(content.matches(BLOCK_SEPARATOR).count(), 2);
        assert!(content.ends_with(&format!("{BLOCK_SEPARATOR}\n")));
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("changes.log");

        let log = DirectoryEventLog::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(log.path(), path.as_path());
    }

    #[test]
    fn test_unwritable_location_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        let result = DirectoryEventLog::open(blocker.join("changes.log"));
        assert!(matches!(result, Err(SinkError::Io { .. })));
    }
}
