//! Resume file: which sources a previous run of the same operation already handled.
//!
//! Saved next to the source tree after a cancelled or partly failed run, read back on the
//! next run to drop finished jobs, and removed once a run completes cleanly.

use chrono::{DateTime, Local};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::utils::tempfiles::write_atomic;
use crate::{BatchReport, EngineError, Job, JobKind};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResumeState {
    pub operation: JobKind,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub started_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
    /// Job count of the run that first created this file.
    pub total: usize,
    /// Sources that succeeded or were skipped. Never retried.
    pub processed: BTreeSet<PathBuf>,
    /// Sources that failed on the last attempt, with the error. Retried.
    pub failed: BTreeMap<PathBuf, String>,
}

fn resume_error(path: &Path, reason: impl std::fmt::Display) -> EngineError {
    EngineError::Resume {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

impl ResumeState {
    pub fn new(operation: JobKind, source: &Path, destination: &Path, total: usize) -> Self {
        let now = Local::now();
        Self {
            operation,
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            started_at: now,
            updated_at: now,
            total,
            processed: BTreeSet::new(),
            failed: BTreeMap::new(),
        }
    }

    /// `SRC/.mediasort-progress-<operation>.json`
    pub fn default_path(source: &Path, operation: JobKind) -> PathBuf {
        source.join(PackagePaths::get().resume_filename(operation.as_str()))
    }

    /// Read a resume file. `Ok(None)` when it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, EngineError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(resume_error(path, e)),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| resume_error(path, e))
    }

    /// True when this state belongs to the same operation over the same directories.
    pub fn matches(&self, operation: JobKind, source: &Path, destination: &Path) -> bool {
        self.operation == operation && self.source == source && self.destination == destination
    }

    /// Drop jobs whose source was already handled. Returns how many were dropped.
    pub fn filter_pending(&self, jobs: &mut Vec<Job>) -> usize {
        let before = jobs.len();
        jobs.retain(|job| !self.processed.contains(&job.source));
        let dropped = before - jobs.len();
        if dropped > 0 {
            info!("Resuming: {} of {} jobs already done", dropped, before);
        }
        dropped
    }

    /// Fold a run's results in. Dry runs record nothing.
    pub fn record(&mut self, report: &BatchReport) {
        for result in &report.results {
            if result.job.dry_run {
                continue;
            }
            let source = result.job.source.clone();
            match &result.error {
                Some(err) => {
                    self.failed.insert(source, err.to_string());
                }
                None => {
                    self.failed.remove(&source);
                    self.processed.insert(source);
                }
            }
        }
        self.updated_at = Local::now();
    }

    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| resume_error(path, e))?;
        write_atomic(path, &json).map_err(|e| resume_error(path, format!("{e:#}")))?;
        debug!("resume state saved to {}", path.display());
        Ok(())
    }

    /// Delete the resume file; missing is fine.
    pub fn remove(path: &Path) -> Result<(), EngineError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(resume_error(path, e)),
        }
    }
}
