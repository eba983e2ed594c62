//! Snapshot differencing for the directory pipeline.
//!
//! Both snapshots are ordered by name, so one merge walk classifies every
//! name in `keys(previous) ∪ keys(current)` in O(n) and yields events in
//! name order.

use std::cmp::Ordering;
use std::time::{Duration, SystemTime};

use crate::storage::model::{AttributeChange, ChangeEvent, FileRecord, Snapshot};

/// Modification times closer than this are treated as equal, absorbing
/// coarse filesystem timestamp resolution.
pub const MTIME_TOLERANCE: Duration = Duration::from_secs(1);

/// Returns true when two timestamps are at least [`MTIME_TOLERANCE`] apart.
fn times_differ(a: SystemTime, b: SystemTime) -> bool {
    let delta = match a.duration_since(b) {
        Ok(d) => d,
        Err(e) => e.duration(),
    };
    delta >= MTIME_TOLERANCE
}

/// Lists the monitored attributes that differ between two records of the same file.
///
/// Size and permissions compare exactly; modification time uses [`MTIME_TOLERANCE`].
pub fn attribute_changes(old: &FileRecord, new: &FileRecord) -> Vec<AttributeChange> {
    let mut changes = Vec::new();

    if old.size_bytes != new.size_bytes {
        changes.push(AttributeChange::Size {
            old: old.size_bytes,
            new: new.size_bytes,
        });
    }
    if old.permissions != new.permissions {
        changes.push(AttributeChange::Permissions {
            old: old.permissions,
            new: new.permissions,
        });
    }
    if times_differ(old.modified_at, new.modified_at) {
        changes.push(AttributeChange::ModifiedAt {
            old: old.modified_at,
            new: new.modified_at,
        });
    }

    changes
}

/// Derives change events between two snapshots, in file name order.
///
/// A renamed file shows up as one `Deleted` and one `Created` event.
pub fn diff_snapshots(previous: &Snapshot, current: &Snapshot) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    let mut prev_iter = previous.iter().peekable();
    let mut curr_iter = current.iter().peekable();

    loop {
        let order = match (prev_iter.peek(), curr_iter.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(p), Some(c)) => p.name.cmp(&c.name),
        };

        match order {
            Ordering::Less => {
                if let Some(old) = prev_iter.next() {
                    events.push(ChangeEvent::Deleted {
                        name: old.name.clone(),
                        path: old.path.clone(),
                    });
                }
            }
            Ordering::Greater => {
                if let Some(new) = curr_iter.next() {
                    events.push(ChangeEvent::Created(new.clone()));
                }
            }
            Ordering::Equal => {
                if let (Some(old), Some(new)) = (prev_iter.next(), curr_iter.next()) {
                    let changes = attribute_changes(old, new);
                    if !changes.is_empty() {
                        events.push(ChangeEvent::Modified {
                            name: new.name.clone(),
                            path: new.path.clone(),
                            changes,
                        });
                    }
                }
            }
        }
    }

    events
}
