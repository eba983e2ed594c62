use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use tracing::{debug, info, warn};

use crate::collector::{DirectoryScanner, FileSystem};
use crate::diff::diff_snapshots;
use crate::pipeline::{PipelineSummary, Schedule, run_loop};
use crate::storage::model::Snapshot;
use crate::storage::{DirectoryEventLog, SinkError};

/// Scans one directory on a schedule and logs what changed between scans.
pub struct DirectoryPipeline<F: FileSystem> {
    scanner: DirectoryScanner<F>,
    watch_dir: PathBuf,
    log: DirectoryEventLog,
    /// Snapshot of the last scan. `None` until the baseline scan.
    previous: Option<Snapshot>,
}

impl<F: FileSystem> DirectoryPipeline<F> {
    pub fn new(fs: F, watch_dir: impl Into<PathBuf>, log: DirectoryEventLog) -> Self {
        Self {
            scanner: DirectoryScanner::new(fs),
            watch_dir: watch_dir.into(),
            log,
            previous: None,
        }
    }

    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    /// Scans once, records the events against the previous scan and keeps the
    /// new snapshot. The first scan only sets the baseline.
    ///
    /// Returns the number of events written.
    pub fn step(&mut self) -> Result<usize, SinkError> {
        let report = self.scanner.scan(&self.watch_dir);
        if let Some(err) = &report.unavailable {
            warn!("{}", err);
        }
        if report.omitted > 0 {
            debug!("{} entries omitted from scan", report.omitted);
        }
        let current = report.snapshot;

        let Some(previous) = self.previous.take() else {
            info!(
                "Baseline: {} files in {}",
                current.len(),
                self.watch_dir.display()
            );
            self.previous = Some(current);
            return Ok(0);
        };

        let events = diff_snapshots(&previous, &current);
        self.previous = Some(current);

        for event in &events {
            self.log.record(event)?;
            info!("{} {}", event.kind().marker(), event.name());
        }

        Ok(events.len())
    }

    /// Writes the session banner and loops until stopped.
    pub fn run(
        &mut self,
        schedule: &Schedule,
        running: &AtomicBool,
    ) -> Result<PipelineSummary, SinkError> {
        self.log.write_banner(&self.watch_dir)?;
        info!(
            "Watching {} every {:?}, logging to {}",
            self.watch_dir.display(),
            schedule.interval,
            self.log.path().display()
        );

        run_loop(schedule, running, || self.step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{MockFs, RealFs};
    use crate::storage::BLOCK_SEPARATOR;
    use std::fs;
    use std::time::Duration;

    fn log_in(dir: &Path) -> DirectoryEventLog {
        DirectoryEventLog::open(dir.join("logs").join("directory_changes.log")).unwrap()
    }

    fn read_log(dir: &Path) -> String {
        fs::read_to_string(dir.join("logs").join("directory_changes.log")).unwrap()
    }

    #[test]
    fn test_baseline_scan_emits_nothing() {
        let out = tempfile::tempdir().unwrap();
        let mut pipeline = DirectoryPipeline::new(MockFs::watched_directory(), "/watch", log_in(out.path()));

        assert_eq!(pipeline.step().unwrap(), 0);
        assert_eq!(pipeline.step().unwrap(), 0);
        assert_eq!(read_log(out.path()), "");
    }

    #[test]
    fn test_changes_between_scans_are_logged() {
        let watched = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(watched.path().join("a.txt"), vec![b'a'; 100]).unwrap();
        fs::write(watched.path().join("old.txt"), b"old").unwrap();

        let mut pipeline = DirectoryPipeline::new(RealFs::new(), watched.path(), log_in(out.path()));
        assert_eq!(pipeline.step().unwrap(), 0);

        fs::write(watched.path().join("a.txt"), vec![b'a'; 200]).unwrap();
        fs::write(watched.path().join("b.txt"), b"hello").unwrap();
        fs::remove_file(watched.path().join("old.txt")).unwrap();

        assert_eq!(pipeline.step().unwrap(), 3);

        let log = read_log(out.path());
        assert_eq!(log.matches("[FILE CREATED]").count(), 1);
        assert_eq!(log.matches("[FILE MODIFIED]").count(), 1);
        assert_eq!(log.matches("[FILE DELETED]").count(), 1);
        assert!(log.contains("Size: 100 -> 200 bytes"));
        assert!(log.contains("File: b.txt"));

        // Events are ordered by file name.
        let a = log.find("File: a.txt").unwrap();
        let b = log.find("File: b.txt").unwrap();
        let old = log.find("File: old.txt").unwrap();
        assert!(a < b && b < old);

        // Nothing changed since: no new events.
        assert_eq!(pipeline.step().unwrap(), 0);
        assert_eq!(read_log(out.path()).matches(BLOCK_SEPARATOR).count(), 3);
    }

    #[test]
    fn test_missing_directory_does_not_stop_the_loop() {
        let out = tempfile::tempdir().unwrap();
        let mut pipeline = DirectoryPipeline::new(MockFs::new(), "/not/there", log_in(out.path()));

        let running = AtomicBool::new(true);
        let schedule = Schedule::every(Duration::ZERO).limited(Some(3));
        let summary = pipeline.run(&schedule, &running).unwrap();

        assert_eq!(summary.iterations, 3);
        assert_eq!(summary.records, 0);
    }

    #[test]
    fn test_directory_appearing_later_reports_creations() {
        let parent = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let watched = parent.path().join("incoming");

        let mut pipeline = DirectoryPipeline::new(RealFs::new(), &watched, log_in(out.path()));
        assert_eq!(pipeline.step().unwrap(), 0);

        fs::create_dir(&watched).unwrap();
        fs::write(watched.join("first.txt"), b"1").unwrap();

        assert_eq!(pipeline.step().unwrap(), 1);
        assert!(read_log(out.path()).contains("[FILE CREATED]\n"));
    }

    #[test]
    fn test_run_writes_banner() {
        let out = tempfile::tempdir().unwrap();
        let mut pipeline = DirectoryPipeline::new(MockFs::watched_directory(), "/watch", log_in(out.path()));

        let running = AtomicBool::new(true);
        let schedule = Schedule::every(Duration::ZERO).limited(Some(1));
        pipeline.run(&schedule, &running).unwrap();

        let log = read_log(out.path());
        assert!(log.starts_with("=================================================="));
        assert!(log.contains("Monitoring started at "));
        assert!(log.contains("Watching: /watch\n"));
        assert_eq!(pipeline.watch_dir(), Path::new("/watch"));
    }
}
