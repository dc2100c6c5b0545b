//! Worker pool: N threads pulling jobs, running the handler under path locks and
//! publishing results, with every blocking point racing cancellation.

use crossbeam_channel::{Receiver, Sender, select};
use log::debug;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::{Job, JobError, JobErrorKind, JobResult, Outcome};

use super::cancel::CancellationCoordinator;
use super::locks::{LockKey, PathLockManager, predicted_dir_token};

/// Per-job operation supplied by the caller.
///
/// `plan` runs without locks (read-only work such as metadata extraction), `lock_keys`
/// names everything `execute` will touch, and `execute` runs while those keys are held.
/// Deriving the keys from the plan means the locked directory is the directory the
/// operation actually writes to.
pub trait JobHandler: Send + Sync + 'static {
    type Plan: Send;

    fn plan(&self, job: &Job) -> Result<Self::Plan, JobError>;

    /// Keys held while `execute` runs. Default: the source path plus a hash-bucket token
    /// for its predicted destination directory.
    fn lock_keys(&self, job: &Job, _plan: &Self::Plan) -> Vec<LockKey> {
        vec![
            LockKey::path(&job.source),
            predicted_dir_token(&job.dest_base, &job.source),
        ]
    }

    fn execute(&self, job: &Job, plan: Self::Plan) -> Result<Outcome, JobError>;
}

/// Handler built from a closure; no planning step.
pub struct FnHandler<F> {
    f: F,
}

/// Adapt `f` into a [`JobHandler`] using the default lock keys.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Job) -> Result<Outcome, JobError> + Send + Sync + 'static,
{
    FnHandler { f }
}

impl<F> JobHandler for FnHandler<F>
where
    F: Fn(&Job) -> Result<Outcome, JobError> + Send + Sync + 'static,
{
    type Plan = ();

    fn plan(&self, _job: &Job) -> Result<(), JobError> {
        Ok(())
    }

    fn execute(&self, job: &Job, _plan: ()) -> Result<Outcome, JobError> {
        (self.f)(job)
    }
}

/// Shared state every worker needs.
pub struct WorkerContext<H: JobHandler> {
    pub handler: Arc<H>,
    pub locks: Arc<PathLockManager>,
    pub coordinator: Arc<CancellationCoordinator>,
    /// Jobs taken off the queue (including ones dropped because cancel raced the dequeue).
    pub dequeued: Arc<AtomicUsize>,
}

impl<H: JobHandler> Clone for WorkerContext<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            locks: Arc::clone(&self.locks),
            coordinator: Arc::clone(&self.coordinator),
            dequeued: Arc::clone(&self.dequeued),
        }
    }
}

/// Plan, lock, execute and time one job. Handler errors and panics become failed results.
pub fn run_job<H: JobHandler>(handler: &H, locks: &PathLockManager, job: Job) -> JobResult {
    let start = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let plan = handler.plan(&job)?;
        let keys = handler.lock_keys(&job, &plan);
        locks.with_locks(keys, || handler.execute(&job, plan))
    }))
    .unwrap_or_else(|payload| {
        Err(JobError::new(
            JobErrorKind::Panicked,
            panic_message(payload.as_ref()),
        ))
    });
    if let Err(ref e) = outcome {
        debug!("job {} failed: {}", job.source.display(), e);
    }
    JobResult::from_handler(job, outcome, start.elapsed())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}

/// Publish a result. Blocks while the queue is full: the collector keeps receiving through
/// the shutdown window, so a job that ran always gets its result counted. Returns false once
/// every receiver is gone.
fn publish(result_tx: &Sender<JobResult>, result: JobResult) -> bool {
    result_tx.send(result).is_ok()
}

/// Worker loop. Returns when the job queue closes or cancellation is observed.
pub fn worker_loop<H: JobHandler>(
    id: usize,
    ctx: &WorkerContext<H>,
    job_rx: &Receiver<Job>,
    result_tx: &Sender<JobResult>,
) {
    let cancel = ctx.coordinator.signal();
    loop {
        let job = select! {
            recv(job_rx) -> msg => match msg {
                Ok(job) => job,
                Err(_) => {
                    debug!("worker {id}: job queue closed");
                    return;
                }
            },
            recv(cancel) -> _ => {
                debug!("worker {id}: cancelled while waiting for a job");
                return;
            }
        };
        ctx.dequeued.fetch_add(1, Ordering::SeqCst);
        // Cancel may have fired in the same instant the job was dequeued.
        if ctx.coordinator.is_cancelled() {
            debug!("worker {id}: dropping {} (cancelled)", job.source.display());
            return;
        }
        let result = run_job(ctx.handler.as_ref(), &ctx.locks, job);
        if !publish(result_tx, result) {
            debug!("worker {id}: result queue closed");
            return;
        }
    }
}

/// Spawn `count` workers. Each is registered on the coordinator's completion barrier
/// before its thread starts, and deregistered when its loop exits for any reason.
pub fn spawn_workers<H: JobHandler>(
    count: usize,
    ctx: &WorkerContext<H>,
    job_rx: &Receiver<Job>,
    result_tx: &Sender<JobResult>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|id| {
            let registration = ctx.coordinator.register_worker();
            let ctx = ctx.clone();
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            thread::spawn(move || {
                let _registration = registration;
                debug!("worker {id}: started");
                worker_loop(id, &ctx, &job_rx, &result_tx);
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobKind;
    use crate::JobStatus;

    fn job(name: &str) -> Job {
        Job::new(format!("/src/{name}"), "/dest", JobKind::Process)
    }

    #[test]
    fn handler_error_becomes_failed_result() {
        let locks = PathLockManager::new();
        let h = handler_fn(|_| Err(JobError::other("nope")));
        let r = run_job(&h, &locks, job("a.jpg"));
        assert_eq!(r.status, JobStatus::Failed);
        assert_eq!(r.error.unwrap().kind, JobErrorKind::Other);
        assert!(locks.try_acquire(std::path::Path::new("/src/a.jpg")).is_some());
    }

    #[test]
    fn handler_panic_becomes_failed_result() {
        let locks = PathLockManager::new();
        let h = handler_fn(|_| panic!("bad file"));
        let r = run_job(&h, &locks, job("b.jpg"));
        assert_eq!(r.status, JobStatus::Failed);
        let err = r.error.unwrap();
        assert_eq!(err.kind, JobErrorKind::Panicked);
        assert!(err.message.contains("bad file"));
        assert!(locks.try_acquire(std::path::Path::new("/src/b.jpg")).is_some());
    }

    #[test]
    fn job_dequeued_after_cancel_is_dropped_unrun() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_h = Arc::clone(&ran);
        let ctx = WorkerContext {
            handler: Arc::new(handler_fn(move |_| {
                ran_h.fetch_add(1, Ordering::SeqCst);
                Ok(Outcome::Done(String::new()))
            })),
            locks: Arc::new(PathLockManager::new()),
            coordinator: Arc::new(CancellationCoordinator::new()),
            dequeued: Arc::new(AtomicUsize::new(0)),
        };
        ctx.coordinator.cancel("test");
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        // With both arms ready `select!` picks at random; repeat until the job side wins.
        for _ in 0..1000 {
            let (job_tx, job_rx) = crossbeam_channel::bounded(1);
            job_tx.send(job("d.jpg")).unwrap();
            worker_loop(0, &ctx, &job_rx, &result_tx);
            if ctx.dequeued.load(Ordering::SeqCst) > 0 {
                break;
            }
        }
        assert_eq!(ctx.dequeued.load(Ordering::SeqCst), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(result_rx.try_recv().is_err());
    }

    #[test]
    fn skipped_outcome_is_not_success() {
        let locks = PathLockManager::new();
        let h = handler_fn(|_| Ok(Outcome::Skipped("already there".into())));
        let r = run_job(&h, &locks, job("c.jpg"));
        assert!(r.is_skipped());
        assert!(!r.success());
    }
}
