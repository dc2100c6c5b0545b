//! Result collector: drains the result queue into the tracker and the result list.

use crossbeam_channel::{Receiver, Sender, select};
use log::debug;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::JobResult;
use crate::engine::{CancellationCoordinator, ProgressTracker};

/// Count one result on the tracker.
pub fn record(tracker: &ProgressTracker, result: &JobResult) {
    if result.is_skipped() {
        tracker.skip();
    } else {
        tracker.update(result.success());
    }
}

fn take(tracker: &ProgressTracker, results: &mut Vec<JobResult>, result: JobResult) {
    record(tracker, &result);
    results.push(result);
}

/// Receive up to `expected` results, or until every worker has gone.
///
/// Cancellation does not stop collection: workers finishing an in-flight job during the
/// grace window still need somewhere to publish. After cancel the collector keeps
/// receiving until the result queue disconnects or `stop` fires (the orchestrator drops
/// its sender once the shutdown wait is over).
pub fn collect_results(
    expected: usize,
    result_rx: &Receiver<JobResult>,
    tracker: &ProgressTracker,
    coordinator: &CancellationCoordinator,
    stop: &Receiver<()>,
) -> Vec<JobResult> {
    let cancel = coordinator.signal();
    let mut results = Vec::with_capacity(expected);
    let mut cancelled = false;
    while results.len() < expected && !cancelled {
        select! {
            recv(result_rx) -> msg => match msg {
                Ok(result) => take(tracker, &mut results, result),
                Err(_) => {
                    debug!("collector: result queue closed after {} results", results.len());
                    return results;
                }
            },
            recv(cancel) -> _ => cancelled = true,
        }
    }
    if cancelled {
        debug!("collector: cancelled after {} results, draining in-flight work", results.len());
    }
    while results.len() < expected && cancelled {
        select! {
            recv(result_rx) -> msg => match msg {
                Ok(result) => take(tracker, &mut results, result),
                Err(_) => break,
            },
            recv(stop) -> _ => {
                debug!("collector: shutdown window over after {} results", results.len());
                break;
            }
        }
    }
    results
}

/// Start the collector. `collected` is dropped when collection ends, which the
/// orchestrator observes as a disconnect.
pub fn spawn_collector(
    expected: usize,
    result_rx: Receiver<JobResult>,
    tracker: Arc<ProgressTracker>,
    coordinator: Arc<CancellationCoordinator>,
    collected: Sender<()>,
    stop: Receiver<()>,
) -> JoinHandle<Vec<JobResult>> {
    thread::spawn(move || {
        let _collected = collected;
        collect_results(expected, &result_rx, &tracker, &coordinator, &stop)
    })
}

/// Non-blocking pass over results still queued after the collector stopped (the shutdown
/// window closed while results were in the queue).
pub fn drain_remaining(
    result_rx: &Receiver<JobResult>,
    tracker: &ProgressTracker,
    results: &mut Vec<JobResult>,
) -> usize {
    let before = results.len();
    for result in result_rx.try_iter() {
        record(tracker, &result);
        results.push(result);
    }
    results.len() - before
}

/// Join the collector thread. A panicked collector yields no results rather than
/// taking the orchestrator down with it.
pub fn collect_joined(handle: JoinHandle<Vec<JobResult>>) -> Vec<JobResult> {
    handle.join().unwrap_or_else(|_| {
        log::warn!("result collector panicked");
        Vec::new()
    })
}
