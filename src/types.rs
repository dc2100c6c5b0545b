//! Public types for jobs, results and engine options.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::JobError;
use crate::engine::PathLockManager;
use crate::utils::config::EngineConsts;

/// What a job does to its file. The engine does not interpret this; handlers do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Move into the destination layout.
    Process,
    /// Match against already organized files by date.
    Match,
    /// Remove duplicates.
    Clean,
    /// Copy into the destination layout, leaving the source in place.
    Merge,
    /// Fix TIFF timestamps in place.
    Tiff,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Process => "process",
            JobKind::Match => "match",
            JobKind::Clean => "clean",
            JobKind::Merge => "merge",
            JobKind::Tiff => "tiff",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work. Immutable once queued; consumed by exactly one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub source: PathBuf,
    pub dest_base: PathBuf,
    pub kind: JobKind,
    pub dry_run: bool,
}

impl Job {
    pub fn new(source: impl Into<PathBuf>, dest_base: impl Into<PathBuf>, kind: JobKind) -> Self {
        Self {
            source: source.into(),
            dest_base: dest_base.into(),
            kind,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// What a handler reports on success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The operation ran; message describes what happened.
    Done(String),
    /// Nothing needed doing (e.g. already in place).
    Skipped(String),
}

/// Terminal state of a processed job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed,
    Skipped,
}

/// Outcome of running one job. Exactly one per dequeued-and-processed job.
#[derive(Clone, Debug)]
pub struct JobResult {
    pub job: Job,
    pub status: JobStatus,
    pub error: Option<JobError>,
    pub message: String,
    pub duration: Duration,
}

impl JobResult {
    pub(crate) fn from_handler(
        job: Job,
        outcome: Result<Outcome, JobError>,
        duration: Duration,
    ) -> Self {
        let (status, error, message) = match outcome {
            Ok(Outcome::Done(msg)) => (JobStatus::Succeeded, None, msg),
            Ok(Outcome::Skipped(msg)) => (JobStatus::Skipped, None, msg),
            Err(err) => {
                let msg = err.message.clone();
                (JobStatus::Failed, Some(err), msg)
            }
        };
        Self {
            job,
            status,
            error,
            message,
            duration,
        }
    }

    pub fn success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    pub fn is_skipped(&self) -> bool {
        self.status == JobStatus::Skipped
    }
}

/// Resolved options for one orchestrator call.
#[derive(Clone)]
pub struct EngineOpts {
    /// Requested worker count. Clamped into [`EngineConsts::MIN_WORKERS`, `MAX_WORKERS`].
    pub workers: usize,
    /// Capacity of the job and result queues. `None` derives it from the worker count.
    pub queue_depth: Option<usize>,
    /// Reporter tick interval.
    pub tick: Duration,
    /// How long to wait for in-flight workers after cancellation.
    pub grace: Duration,
    /// Render periodic progress lines (the final line and summary are always rendered).
    pub show_progress: bool,
    /// Forward SIGINT/SIGTERM to this run's coordinator.
    pub handle_signals: bool,
    /// Lock table used to guard filesystem effects. Defaults to the process-wide manager.
    pub locks: Arc<PathLockManager>,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            workers: EngineConsts::DEFAULT_WORKERS,
            queue_depth: None,
            tick: EngineConsts::TICK_INTERVAL,
            grace: EngineConsts::GRACE_PERIOD,
            show_progress: true,
            handle_signals: false,
            locks: PathLockManager::global(),
        }
    }
}

impl std::fmt::Debug for EngineOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineOpts")
            .field("workers", &self.workers)
            .field("queue_depth", &self.queue_depth)
            .field("tick", &self.tick)
            .field("grace", &self.grace)
            .field("show_progress", &self.show_progress)
            .field("handle_signals", &self.handle_signals)
            .finish_non_exhaustive()
    }
}

/// Clamp a requested worker count into the supported range. Never rejects.
pub fn clamp_workers(requested: usize) -> usize {
    requested.clamp(EngineConsts::MIN_WORKERS, EngineConsts::MAX_WORKERS)
}

/// CLI-level options (config file + flags), resolved before building jobs.
#[derive(Clone, Debug, Default)]
pub struct Opts {
    pub workers: Option<usize>,
    pub dry_run: bool,
    pub progress: bool,
    pub verbose: bool,
    pub exclude: Vec<String>,
    pub grace_secs: Option<u64>,
    pub tick_ms: Option<u64>,
    pub follow_links: bool,
    pub resume: Option<PathBuf>,
}

impl Opts {
    /// Build engine options from CLI options; signals are always forwarded from the CLI.
    pub fn engine_opts(&self) -> EngineOpts {
        let mut engine = EngineOpts {
            show_progress: self.progress,
            handle_signals: true,
            ..EngineOpts::default()
        };
        if let Some(w) = self.workers {
            engine.workers = w;
        }
        if let Some(secs) = self.grace_secs {
            engine.grace = Duration::from_secs(secs);
        }
        if let Some(ms) = self.tick_ms {
            engine.tick = Duration::from_millis(ms.max(1));
        }
        engine
    }
}
