//! Job feeder: pushes every job onto the bounded queue, racing cancellation.

use crossbeam_channel::{Sender, select};
use log::{debug, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::Job;
use crate::engine::CancellationCoordinator;

/// Feed `jobs` in order. Stops at the first cancellation without blocking on a full
/// queue; jobs already queued stay available to workers. The queue closes when this
/// returns (the sender is dropped). Returns how many jobs were queued.
pub fn feed_jobs(jobs: Vec<Job>, job_tx: Sender<Job>, coordinator: &CancellationCoordinator) -> usize {
    let cancel = coordinator.signal();
    let total = jobs.len();
    let mut fed = 0_usize;
    for job in jobs {
        if coordinator.is_cancelled() {
            break;
        }
        select! {
            send(job_tx, job) -> res => {
                if res.is_err() {
                    debug!("feeder: job queue has no receivers");
                    break;
                }
                fed += 1;
            }
            recv(cancel) -> _ => break,
        }
    }
    if fed < total {
        info!("Job distribution cancelled after {} of {} jobs", fed, total);
    } else {
        debug!("feeder: all {} jobs queued", total);
    }
    fed
}

pub fn spawn_feeder(
    jobs: Vec<Job>,
    job_tx: Sender<Job>,
    coordinator: Arc<CancellationCoordinator>,
) -> JoinHandle<usize> {
    thread::spawn(move || feed_jobs(jobs, job_tx, &coordinator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobKind;
    use crossbeam_channel::bounded;
    use std::time::Duration;

    fn jobs(n: usize) -> Vec<Job> {
        (0..n)
            .map(|i| Job::new(format!("/s/{i}.jpg"), "/d", JobKind::Process))
            .collect()
    }

    #[test]
    fn feeds_everything_and_closes_queue() {
        let coord = CancellationCoordinator::new();
        let (tx, rx) = bounded(10);
        assert_eq!(feed_jobs(jobs(5), tx, &coord), 5);
        assert_eq!(rx.iter().count(), 5);
    }

    #[test]
    fn cancel_unblocks_full_queue() {
        let coord = Arc::new(CancellationCoordinator::new());
        let (tx, rx) = bounded(2);
        let handle = spawn_feeder(jobs(100), tx, Arc::clone(&coord));
        thread::sleep(Duration::from_millis(30));
        coord.cancel("test");
        let fed = handle.join().unwrap();
        assert_eq!(fed, 2);
        // Queued jobs remain for workers, then the queue reports closed.
        assert_eq!(rx.iter().count(), 2);
    }
}
