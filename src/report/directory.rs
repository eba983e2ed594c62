//! Summary of the directory change log.

use serde::Serialize;

use crate::storage::model::ChangeKind;

/// Number of trailing log lines kept for display.
pub const RECENT_LINES: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectorySummary {
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
    /// The last [`RECENT_LINES`] lines of the log.
    pub recent_lines: Vec<String>,
}

/// Counts event markers and keeps the tail of the log.
///
/// A marker counts only as a whole line, never inside a `File:` value.
pub fn summarize_directory_log(content: &str) -> DirectorySummary {
    let count = |kind: ChangeKind| {
        content
            .lines()
            .filter(|line| line.trim_end() == kind.marker())
            .count()
    };

    let lines: Vec<&str> = content.trim().lines().collect();
    let start = lines.len().saturating_sub(RECENT_LINES);

    DirectorySummary {
        created: count(ChangeKind::Created),
        modified: count(ChangeKind::Modified),
        deleted: count(ChangeKind::Deleted),
        recent_lines: lines[start..].iter().map(|l| l.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BLOCK_SEPARATOR, format_block};
    use crate::storage::model::ChangeEvent;
    use crate::storage::model::file::fixtures::record;
    use chrono::Local;
    use std::path::PathBuf;

    #[test]
    fn test_counts_markers() {
        let now = Local::now();
        let mut log = String::new();
        log.push_str(&format_block(&ChangeEvent::Created(record("a", 1, 0)), now));
        log.push_str(&format_block(&ChangeEvent::Created(record("b", 1, 0)), now));
        log.push_str(&format_block(
            &ChangeEvent::Deleted {
                name: "a".into(),
                path: PathBuf::from("/watch/a"),
            },
            now,
        ));

        let summary = summarize_directory_log(&log);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.modified, 0);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.recent_lines.last().map(String::as_str), Some(BLOCK_SEPARATOR));
    }

    #[test]
    fn test_keeps_last_fifty_lines() {
        let log: String = (0..120).map(|i| format!("line {}\n", i)).collect();
        let summary = summarize_directory_log(&log);

        assert_eq!(summary.recent_lines.len(), RECENT_LINES);
        assert_eq!(summary.recent_lines[0], "line 70");
        assert_eq!(summary.recent_lines[49], "line 119");
    }

    #[test]
    fn test_empty_log() {
        let summary = summarize_directory_log("");
        assert_eq!(summary, DirectorySummary::default());
    }

    #[test]
    fn test_marker_in_file_name_is_not_counted() {
        let created = ChangeEvent::Created(record("evil\n[FILE DELETED]", 1, 0));
        let log = format_block(&created, Local::now());

        let summary = summarize_directory_log(&log);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.deleted, 0);
    }
}
