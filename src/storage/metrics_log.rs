//! Append-only CSV log of metric samples.
//!
//! The first line of the file is the header in [`METRIC_COLUMNS`] order. A log
//! keeps the schema it was created with: opening a log whose header differs
//! fails with [`SinkError::SchemaMismatch`] instead of rewriting history.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::storage::error::SinkError;
use crate::storage::lock::{append_locked, ensure_parent_dir};
use crate::storage::model::{METRIC_COLUMNS, MetricSample};
use crate::storage::retry::RetryPolicy;

/// Header row of a metrics log, without line terminator.
pub fn header_line() -> String {
    METRIC_COLUMNS.join(",")
}

/// Metrics sink.
pub struct MetricsLog {
    path: PathBuf,
    retry: RetryPolicy,
}

impl MetricsLog {
    /// Opens the log, creating parent directories.
    ///
    /// The file itself is created by the first append, which also writes the
    /// header. An existing non-empty file must start with the canonical header.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        ensure_parent_dir(&path).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        validate_header(&path)?;

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

    /// Appends one row, preceded by the header if the file is empty.
    pub fn append(&self, sample: &MetricSample) -> Result<(), SinkError> {
        let row = format!("{}\n", sample.to_row().join(","));
        let header = format!("{}\n", header_line());

        self.retry
            .run("metrics log append", || {
                append_locked(&self.path, |len| {
                    if len == 0 {
                        format!("{}{}", header, row).into_bytes()
                    } else {
                        row.clone().into_bytes()
                    }
                })
            })
            .map_err(|(attempts, source)| SinkError::WriteFailed {
                path: self.path.clone(),
                attempts,
                source,
            })
    }
}

/// Checks the first line of an existing log against the canonical header.
///
/// Only a missing or zero-length file may lack the header.
fn validate_header(path: &Path) -> Result<(), SinkError> {
    let io_err = |source: io::Error| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_err(e)),
    };

    if file.metadata().map_err(io_err)?.len() == 0 {
        return Ok(());
    }

    let mut first = String::new();
    BufReader::new(file).read_line(&mut first).map_err(io_err)?;
    let found = first.trim_end_matches(['\n', '\r']);

    if found == header_line() {
        Ok(())
    } else {
        Err(SinkError::SchemaMismatch {
            path: path.to_path_buf(),
            found: found.to_string(),
        })
    }
}
