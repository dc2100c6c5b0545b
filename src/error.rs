//! Error types for the job engine.
//!
//! Per-job failures stay inside a [`JobResult`](crate::JobResult) as a [`JobError`]; only
//! cancellation and shutdown problems surface as an [`EngineError`] from the orchestrator.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::pipeline::BatchReport;

/// Classification of a per-job failure. Used to group the error breakdown in the summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobErrorKind {
    /// Timestamp or other metadata could not be read from the file.
    Metadata,
    /// Filesystem operation (mkdir, rename, copy) failed.
    Io,
    /// No free destination filename within the duplicate-suffix limit.
    TooManyDuplicates,
    /// Job kind not handled by the handler it was given to.
    Unsupported,
    /// Handler panicked while running the job.
    Panicked,
    /// Anything a caller-provided handler reports that fits none of the above.
    Other,
}

impl JobErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            JobErrorKind::Metadata => "metadata",
            JobErrorKind::Io => "io",
            JobErrorKind::TooManyDuplicates => "too many duplicates",
            JobErrorKind::Unsupported => "unsupported",
            JobErrorKind::Panicked => "panicked",
            JobErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for JobErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure of a single job. Never propagated past the worker that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn metadata(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::new(
            JobErrorKind::Metadata,
            format!("read metadata of {}: {}", path.display(), err),
        )
    }

    pub fn io(action: &str, path: &std::path::Path, err: &std::io::Error) -> Self {
        Self::new(
            JobErrorKind::Io,
            format!("{} {}: {}", action, path.display(), err),
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(JobErrorKind::Other, message)
    }
}

/// Batch-level outcome errors returned by the orchestrator.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Processing was cancelled. Carries the best-effort report assembled after shutdown.
    #[error("processing was cancelled ({} jobs not started)", .report.summary.not_started)]
    Cancelled { report: Box<BatchReport> },

    /// Workers did not all return within the graceful shutdown window.
    #[error("graceful shutdown timeout after {0:?}")]
    ShutdownTimeout(Duration),

    /// Resume file could not be read or written.
    #[error("resume state {path}: {reason}")]
    Resume { path: PathBuf, reason: String },
}

impl EngineError {
    /// Report attached to a cancelled run, if any.
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            EngineError::Cancelled { report } => Some(report),
            _ => None,
        }
    }
}
