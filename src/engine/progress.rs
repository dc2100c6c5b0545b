//! Progress tracker: thread-safe job counters with elapsed time and a linear ETA.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Counters {
    completed: usize,
    failed: usize,
    skipped: usize,
}

/// Point-in-time copy of the tracker, as returned by [`ProgressTracker::stats`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total: usize,
    /// Jobs that reached a terminal outcome, failures included.
    pub completed: usize,
    /// Subset of `completed` that failed.
    pub failed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn succeeded(&self) -> usize {
        self.completed - self.failed
    }

    pub fn processed(&self) -> usize {
        self.completed + self.skipped
    }

    /// Jobs with no result yet.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed())
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed() as f64 / self.total as f64 * 100.0
    }

    /// `remaining * elapsed / completed`; zero when nothing has completed or nothing remains.
    pub fn eta(&self) -> Duration {
        let remaining = self.remaining();
        if self.completed == 0 || remaining == 0 {
            return Duration::ZERO;
        }
        let per_job = self.elapsed.as_secs_f64() / self.completed as f64;
        Duration::from_secs_f64(per_job * remaining as f64)
    }
}

/// Counters for one run. Mutated only by the result collector; read by the reporter.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    counters: Mutex<Counters>,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self::with_start(total, Instant::now())
    }

    /// Tracker whose clock started at `started` (lets callers account for setup time).
    pub fn with_start(total: usize, started: Instant) -> Self {
        Self {
            total,
            counters: Mutex::new(Counters::default()),
            started,
        }
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one processed job. A failure still counts as completed.
    pub fn update(&self, success: bool) {
        let mut c = self.counters();
        c.completed += 1;
        if !success {
            c.failed += 1;
        }
    }

    pub fn skip(&self) {
        self.counters().skipped += 1;
    }

    pub fn stats(&self) -> ProgressSnapshot {
        let c = self.counters();
        ProgressSnapshot {
            total: self.total,
            completed: c.completed,
            failed: c.failed,
            skipped: c.skipped,
            elapsed: self.started.elapsed(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        let c = self.counters();
        c.completed + c.skipped >= self.total
    }

    pub fn estimate_remaining(&self) -> Duration {
        self.stats().eta()
    }

    /// One-line status: counts, percentage, elapsed and ETA when known.
    pub fn format_progress(&self) -> String {
        format_snapshot(&self.stats())
    }
}

/// Render a snapshot as the one-line status used by every sink.
pub fn format_snapshot(s: &ProgressSnapshot) -> String {
    let eta = s.eta();
    let eta_str = if eta > Duration::ZERO {
        format!(" (ETA: {})", format_duration(eta))
    } else {
        String::new()
    };
    format!(
        "Progress: {}/{} ({:.1}%) | Success: {} | Failed: {} | Skipped: {} | Elapsed: {}{}",
        s.processed(),
        s.total,
        s.percent(),
        s.succeeded(),
        s.failed,
        s.skipped,
        format_duration(s.elapsed),
        eta_str
    )
}

/// Whole seconds as `1h2m3s` / `2m3s` / `3s`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64().round() as u64;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}
