//! Final batch summary and report.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::engine::progress::{ProgressSnapshot, format_duration};
use crate::{JobErrorKind, JobResult};

/// Counts and status for one finished (or cancelled) run.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub cancelled: bool,
    pub cancel_reason: Option<String>,
    pub shutdown_timed_out: bool,
    pub workers: usize,
    pub total: usize,
    /// Jobs with a terminal result, failures included.
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Jobs taken off the queue by a worker.
    pub dequeued: usize,
    /// `total - completed - skipped`: jobs with no result.
    pub not_started: usize,
    pub elapsed: Duration,
    /// Failed results grouped by error kind.
    pub error_breakdown: BTreeMap<JobErrorKind, usize>,
}

impl Summary {
    pub(crate) fn build(
        snapshot: &ProgressSnapshot,
        results: &[JobResult],
        workers: usize,
        dequeued: usize,
        cancel_reason: Option<String>,
        shutdown_timed_out: bool,
    ) -> Self {
        let mut error_breakdown = BTreeMap::new();
        for err in results.iter().filter_map(|r| r.error.as_ref()) {
            *error_breakdown.entry(err.kind).or_insert(0) += 1;
        }
        Self {
            cancelled: cancel_reason.is_some(),
            cancel_reason,
            shutdown_timed_out,
            workers,
            total: snapshot.total,
            completed: snapshot.completed,
            succeeded: snapshot.succeeded(),
            failed: snapshot.failed,
            skipped: snapshot.skipped,
            dequeued,
            not_started: snapshot.remaining(),
            elapsed: snapshot.elapsed,
            error_breakdown,
        }
    }

    /// Jobs with a result of any kind.
    pub fn processed(&self) -> usize {
        self.completed + self.skipped
    }

    pub fn completion_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed() as f64 / self.total as f64 * 100.0
    }

    pub fn average_per_job(&self) -> Option<Duration> {
        (self.completed > 0).then(|| self.elapsed / self.completed as u32)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "Processing Summary:")?;
        match (&self.cancel_reason, self.cancelled) {
            (Some(reason), true) => writeln!(f, "  Status:        CANCELLED ({reason})")?,
            _ => writeln!(f, "  Status:        COMPLETED")?,
        }
        writeln!(
            f,
            "  Progress:      {}/{} processed ({} workers)",
            self.processed(),
            self.total,
            self.workers
        )?;
        writeln!(f, "  Successful:    {}", self.succeeded)?;
        writeln!(f, "  Failed:        {}", self.failed)?;
        writeln!(f, "  Skipped:       {}", self.skipped)?;
        if self.not_started > 0 {
            writeln!(f, "  Not started:   {}", self.not_started)?;
        }
        writeln!(f, "  Total time:    {}", format_duration(self.elapsed))?;
        if let Some(avg) = self.average_per_job() {
            writeln!(f, "  Avg per file:  {}ms", avg.as_millis())?;
        }
        writeln!(f, "  Completion:    {:.1}%", self.completion_percent())?;
        if !self.error_breakdown.is_empty() {
            writeln!(f)?;
            writeln!(f, "Error breakdown:")?;
            for (kind, count) in &self.error_breakdown {
                writeln!(f, "   - {kind}: {count} files")?;
            }
        }
        if self.shutdown_timed_out {
            writeln!(f)?;
            writeln!(
                f,
                "Warning: some workers were still running when the shutdown window closed."
            )?;
        }
        if self.cancelled {
            writeln!(f)?;
            writeln!(
                f,
                "{} jobs not started due to cancellation. Run the command again to resume.",
                self.not_started
            )?;
        }
        Ok(())
    }
}

/// Everything a run produced: the summary plus every collected result.
#[derive(Clone, Debug)]
pub struct BatchReport {
    pub summary: Summary,
    pub results: Vec<JobResult>,
}

impl BatchReport {
    pub fn failed(&self) -> impl Iterator<Item = &JobResult> {
        self.results.iter().filter(|r| r.error.is_some())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &JobResult> {
        self.results.iter().filter(|r| r.success())
    }
}
