//! Orchestrator: wires coordinator, workers, feeder, collector and reporter for one batch
//! and turns the outcome into a [`BatchReport`].

use crossbeam_channel::select;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engine::signal::{self, graceful_shutdown};
use crate::engine::{
    CancellationCoordinator, JobHandler, ProgressSink, ProgressTracker, WorkerContext,
    spawn_reporter, spawn_workers,
};
use crate::pipeline::{
    RunContext, RunHandles, Summary, collector, create_run_channels, feeder, queue_depth,
};
use crate::types::clamp_workers;
use crate::{BatchReport, EngineError, EngineOpts, Job};

/// Run every job through `handler` on a clamped worker pool.
///
/// Returns the report when the batch ran to completion, or `EngineError::Cancelled` (carrying
/// the report) when cancellation was requested at any point. Per-job failures are inside the
/// report; they never turn into an error here. With `opts.handle_signals`, SIGINT/SIGTERM
/// cancel this run.
pub fn process_jobs_with_cancellation<H: JobHandler>(
    jobs: Vec<Job>,
    handler: Arc<H>,
    opts: &EngineOpts,
    sink: Box<dyn ProgressSink>,
) -> Result<BatchReport, EngineError> {
    let coordinator = Arc::new(CancellationCoordinator::new());
    let _signals = opts.handle_signals.then(|| signal::attach(&coordinator));
    run_batch(jobs, handler, opts, sink, coordinator)
}

/// Same as [`process_jobs_with_cancellation`] but driven by a caller-owned coordinator, so
/// the caller can cancel from another thread. Signals are not attached here.
pub fn run_batch<H: JobHandler>(
    jobs: Vec<Job>,
    handler: Arc<H>,
    opts: &EngineOpts,
    sink: Box<dyn ProgressSink>,
    coordinator: Arc<CancellationCoordinator>,
) -> Result<BatchReport, EngineError> {
    let total = jobs.len();
    let workers = clamp_workers(opts.workers);
    if workers != opts.workers {
        debug!("worker count {} clamped to {}", opts.workers, workers);
    }
    info!("Processing {} jobs with {} workers", total, workers);

    // Tracker and coordinator share one clock, so ETA counts from when the run began.
    let tracker = Arc::new(ProgressTracker::with_start(total, coordinator.started()));
    let ctx = RunContext {
        coordinator,
        tracker,
        dequeued: Arc::new(AtomicUsize::new(0)),
        workers,
    };
    let channels = create_run_channels(queue_depth(opts.queue_depth, workers));

    let worker_ctx = WorkerContext {
        handler,
        locks: Arc::clone(&opts.locks),
        coordinator: Arc::clone(&ctx.coordinator),
        dequeued: Arc::clone(&ctx.dequeued),
    };
    let handles = RunHandles {
        workers: spawn_workers(workers, &worker_ctx, &channels.job_rx, &channels.result_tx),
        reporter: spawn_reporter(
            Arc::clone(&ctx.tracker),
            Arc::clone(&ctx.coordinator),
            channels.settled_rx,
            sink,
            opts.tick,
            opts.show_progress,
        ),
        feeder: feeder::spawn_feeder(jobs, channels.job_tx, Arc::clone(&ctx.coordinator)),
        collector: collector::spawn_collector(
            total,
            channels.result_rx.clone(),
            Arc::clone(&ctx.tracker),
            Arc::clone(&ctx.coordinator),
            channels.collected_tx,
            channels.stop_rx,
        ),
    };
    // Only workers may hold result senders and only the feeder a job sender, so closed
    // queues mean the producing side is really gone.
    drop(worker_ctx);
    drop(channels.result_tx);
    drop(channels.job_rx);

    let cancel = ctx.coordinator.signal();
    select! {
        recv(channels.collected_rx) -> _ => {}
        recv(cancel) -> _ => {}
    }

    let mut shutdown_timed_out = false;
    let mut results;
    if ctx.coordinator.is_cancelled() {
        // The collector keeps taking results while workers finish in-flight jobs.
        if let Err(e) = graceful_shutdown(&ctx.coordinator, opts.grace) {
            warn!("{}", e);
            shutdown_timed_out = true;
        }
        drop(channels.stop_tx);
        results = collector::collect_joined(handles.collector);
        let drained =
            collector::drain_remaining(&channels.result_rx, &ctx.tracker, &mut results);
        if drained > 0 {
            debug!("collected {} results left in the queue", drained);
        }
        debug!("shutdown settled {:?} after start", ctx.coordinator.elapsed());
        // Workers still inside a handler are left running; they exit on their own.
        if !shutdown_timed_out {
            join_workers(handles.workers);
        }
    } else {
        results = collector::collect_joined(handles.collector);
        ctx.coordinator.wait_for_workers();
        join_workers(handles.workers);
    }
    let fed = handles.feeder.join().unwrap_or(0);
    debug!("feeder queued {} of {} jobs", fed, total);

    drop(channels.settled_tx);
    let mut sink = match handles.reporter.join() {
        Ok(sink) => sink,
        Err(_) => {
            warn!("progress reporter panicked");
            Box::new(crate::engine::NullSink)
        }
    };

    let snapshot = ctx.tracker.stats();
    let summary = Summary::build(
        &snapshot,
        &results,
        ctx.workers,
        ctx.dequeued.load(Ordering::SeqCst),
        ctx.coordinator.reason(),
        shutdown_timed_out,
    );
    sink.summary(&summary);
    let report = BatchReport { summary, results };

    if ctx.coordinator.is_cancelled() {
        Err(EngineError::Cancelled {
            report: Box::new(report),
        })
    } else {
        Ok(report)
    }
}

fn join_workers(workers: Vec<std::thread::JoinHandle<()>>) {
    for h in workers {
        if h.join().is_err() {
            warn!("worker thread panicked outside a job");
        }
    }
}
