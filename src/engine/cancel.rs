//! Cancellation coordinator: one cancel flag, a wake-up signal for blocking
//! waits, and a completion barrier counting live workers.

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, warn};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Lifecycle of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CancelState {
    Running = 0,
    CancelRequested = 1,
    ShutdownComplete = 2,
}

impl CancelState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => CancelState::Running,
            1 => CancelState::CancelRequested,
            _ => CancelState::ShutdownComplete,
        }
    }
}

/// Shared by the orchestrator, feeder, collector, reporter, workers and the signal bridge.
pub struct CancellationCoordinator {
    state: AtomicU8,
    reason: Mutex<Option<String>>,
    /// Dropped on cancel; every clone of `signal_rx` then reports disconnected,
    /// which makes `recv(signal)` ready in any `select!`.
    signal_tx: Mutex<Option<Sender<()>>>,
    signal_rx: Receiver<()>,
    active_workers: Mutex<usize>,
    workers_done: Condvar,
    started: Instant,
}

impl Default for CancellationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationCoordinator {
    pub fn new() -> Self {
        let (signal_tx, signal_rx) = bounded::<()>(0);
        Self {
            state: AtomicU8::new(CancelState::Running as u8),
            reason: Mutex::new(None),
            signal_tx: Mutex::new(Some(signal_tx)),
            signal_rx,
            active_workers: Mutex::new(0),
            workers_done: Condvar::new(),
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> CancelState {
        CancelState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Non-blocking read; true once cancel has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.state() != CancelState::Running
    }

    /// Request cancellation. Only the first call transitions; returns whether this call did.
    pub fn cancel(&self, reason: &str) -> bool {
        if self
            .state
            .compare_exchange(
                CancelState::Running as u8,
                CancelState::CancelRequested as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            debug!("cancel({reason}) ignored: already cancelled");
            return false;
        }
        *self.reason.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason.to_string());
        warn!("Cancellation requested: {}", reason);
        // Wake every blocked select! at once.
        self.signal_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        // A run with no live workers has nothing to wait for.
        self.mark_shutdown_if_idle(&self.workers());
        true
    }

    pub fn reason(&self) -> Option<String> {
        self.reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receiver that becomes ready (disconnected) when cancellation is requested.
    /// Never carries a message; use it as a `recv` arm in `crossbeam_channel::select!`.
    pub fn signal(&self) -> Receiver<()> {
        self.signal_rx.clone()
    }

    /// Add one worker to the completion barrier. The barrier is decremented when the
    /// returned registration is dropped, including during unwinding.
    #[must_use = "dropping the registration immediately marks the worker done"]
    pub fn register_worker(self: &Arc<Self>) -> WorkerRegistration {
        *self.workers() += 1;
        WorkerRegistration {
            coordinator: Arc::clone(self),
        }
    }

    fn workers(&self) -> MutexGuard<'_, usize> {
        self.active_workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn worker_done(&self) {
        let mut active = self.workers();
        *active = active.saturating_sub(1);
        if *active == 0 {
            self.mark_shutdown_if_idle(&active);
            self.workers_done.notify_all();
        }
    }

    fn mark_shutdown_if_idle(&self, active: &MutexGuard<'_, usize>) {
        if **active == 0 {
            let _ = self.state.compare_exchange(
                CancelState::CancelRequested as u8,
                CancelState::ShutdownComplete as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }

    pub fn active_workers(&self) -> usize {
        *self.workers()
    }

    /// Block until every registered worker has returned.
    pub fn wait_for_workers(&self) {
        let mut active = self.workers();
        while *active > 0 {
            active = self
                .workers_done
                .wait(active)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`Self::wait_for_workers`] but gives up after `timeout`. Returns true if
    /// the barrier reached zero in time.
    pub fn wait_for_workers_timeout(&self, timeout: Duration) -> bool {
        let active = self.workers();
        let (active, _) = self
            .workers_done
            .wait_timeout_while(active, timeout, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *active == 0
    }

    /// When this coordinator was created; the start of the run it governs.
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Time since this coordinator was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Live worker's slot in the completion barrier.
pub struct WorkerRegistration {
    coordinator: Arc<CancellationCoordinator>,
}

impl Drop for WorkerRegistration {
    fn drop(&mut self) {
        self.coordinator.worker_done();
    }
}
