//! Sink failures. Unlike scan and probe errors, these stop the pipeline.

use std::io;
use std::path::PathBuf;

/// Error type for log sink failures.
#[derive(Debug)]
pub enum SinkError {
    /// The log could not be opened or prepared.
    Io { path: PathBuf, source: io::Error },
    /// An existing metrics log was written with a different column set.
    SchemaMismatch { path: PathBuf, found: String },
    /// An append kept failing after every retry.
    WriteFailed {
        path: PathBuf,
        attempts: u32,
        source: io::Error,
    },
}

impl SinkError {
    /// Path of the log that failed.
    pub fn path(&self) -> &PathBuf {
        match self {
            SinkError::Io { path, .. }
            | SinkError::SchemaMismatch { path, .. }
            | SinkError::WriteFailed { path, .. } => path,
        }
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            SinkError::SchemaMismatch { path, found } => write!(
                f,
                "{} has an incompatible header {:?}; use a new file",
                path.display(),
                found
            ),
            SinkError::WriteFailed {
                path,
                attempts,
                source,
            } => write!(
                f,
                "writing {} failed after {} attempts: {}",
                path.display(),
                attempts,
                source
            ),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Io { source, .. } | SinkError::WriteFailed { source, .. } => Some(source),
            SinkError::SchemaMismatch { .. } => None,
        }
    }
}
