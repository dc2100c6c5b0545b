//! Run context: the queues and shared state wired between feeder, workers,
//! collector and reporter.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::thread::JoinHandle;

use crate::engine::{CancellationCoordinator, ProgressSink, ProgressTracker};
use crate::utils::config::EngineConsts;
use crate::{Job, JobResult};

/// Queue capacities: explicit depth, or a few slots per worker.
pub fn queue_depth(requested: Option<usize>, workers: usize) -> usize {
    requested
        .unwrap_or(workers * EngineConsts::QUEUE_SLOTS_PER_WORKER)
        .max(1)
}

/// Channels for one run.
///
/// - `job`: feeder → workers (bounded, closed by the feeder)
/// - `result`: workers → collector (bounded)
/// - `collected`: collector → orchestrator, disconnects when collection ends
/// - `stop`: orchestrator → collector, disconnects when the shutdown wait is over
/// - `settled`: orchestrator → reporter, disconnects once final counts are in
pub struct RunChannels {
    pub job_tx: Sender<Job>,
    pub job_rx: Receiver<Job>,
    pub result_tx: Sender<JobResult>,
    pub result_rx: Receiver<JobResult>,
    pub collected_tx: Sender<()>,
    pub collected_rx: Receiver<()>,
    pub stop_tx: Sender<()>,
    pub stop_rx: Receiver<()>,
    pub settled_tx: Sender<()>,
    pub settled_rx: Receiver<()>,
}

pub fn create_run_channels(depth: usize) -> RunChannels {
    let (job_tx, job_rx) = bounded::<Job>(depth);
    let (result_tx, result_rx) = bounded::<JobResult>(depth);
    let (collected_tx, collected_rx) = bounded::<()>(0);
    let (stop_tx, stop_rx) = bounded::<()>(0);
    let (settled_tx, settled_rx) = bounded::<()>(0);
    RunChannels {
        job_tx,
        job_rx,
        result_tx,
        result_rx,
        collected_tx,
        collected_rx,
        stop_tx,
        stop_rx,
        settled_tx,
        settled_rx,
    }
}

/// Shared state for one run. Created per orchestrator call.
pub struct RunContext {
    pub coordinator: Arc<CancellationCoordinator>,
    pub tracker: Arc<ProgressTracker>,
    pub dequeued: Arc<AtomicUsize>,
    pub workers: usize,
}

/// Threads started for one run; the orchestrator joins or detaches them.
pub struct RunHandles {
    pub feeder: JoinHandle<usize>,
    pub collector: JoinHandle<Vec<JobResult>>,
    pub reporter: JoinHandle<Box<dyn ProgressSink>>,
    pub workers: Vec<JoinHandle<()>>,
}
