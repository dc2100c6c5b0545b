//! Signal-to-cancellation bridge and the bounded graceful-shutdown wait.
//!
//! `ctrlc` allows one handler per process, so it is installed once and forwards every
//! termination request (SIGINT, SIGTERM, SIGHUP) to whichever runs are attached.

use log::{info, warn};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use std::time::Duration;

use crate::EngineError;
use crate::utils::config::EngineConsts;

use super::cancel::CancellationCoordinator;

pub const USER_REQUESTED: &str = "user requested";

type Targets = Mutex<Vec<Weak<CancellationCoordinator>>>;

static TARGETS: OnceLock<Targets> = OnceLock::new();
static INSTALLED: OnceLock<bool> = OnceLock::new();

fn targets() -> &'static Targets {
    TARGETS.get_or_init(|| Mutex::new(Vec::new()))
}

fn install_handler() -> bool {
    *INSTALLED.get_or_init(|| match ctrlc::set_handler(on_termination_request) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not install termination handler: {}", e);
            false
        }
    })
}

/// Cancel every attached run. The first request per run cancels it; repeats while it is
/// shutting down are logged and ignored. Returns how many runs were attached.
pub(crate) fn forward_to_attached() -> usize {
    let live: Vec<Arc<CancellationCoordinator>> = targets()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .filter_map(Weak::upgrade)
        .collect();
    for coordinator in &live {
        if coordinator.cancel(USER_REQUESTED) {
            eprintln!("\nReceived termination request, initiating graceful shutdown...");
        } else {
            warn!("Shutdown already in progress; waiting for workers to finish");
        }
    }
    live.len()
}

/// Installed as the `ctrlc` handler. With no run attached the process exits.
fn on_termination_request() {
    if forward_to_attached() == 0 {
        eprintln!();
        std::process::exit(EngineConsts::CANCELLED_EXIT_CODE);
    }
}

/// While alive, termination requests cancel the attached coordinator.
pub struct SignalGuard {
    target: Weak<CancellationCoordinator>,
}

/// Route termination requests to `coordinator` until the returned guard is dropped.
pub fn attach(coordinator: &Arc<CancellationCoordinator>) -> SignalGuard {
    install_handler();
    let target = Arc::downgrade(coordinator);
    targets()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Weak::clone(&target));
    SignalGuard { target }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        targets()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|t| !t.ptr_eq(&self.target) && t.strong_count() > 0);
    }
}

/// Wait up to `timeout` for every registered worker to return.
pub fn graceful_shutdown(
    coordinator: &CancellationCoordinator,
    timeout: Duration,
) -> Result<(), EngineError> {
    info!(
        "Waiting up to {:?} for {} worker(s) to complete...",
        timeout,
        coordinator.active_workers()
    );
    if coordinator.wait_for_workers_timeout(timeout) {
        info!("All workers completed gracefully");
        Ok(())
    } else {
        warn!("Graceful shutdown timeout reached");
        Err(EngineError::ShutdownTimeout(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn termination_request_cancels_attached_run_once() {
        let coord = Arc::new(CancellationCoordinator::new());
        let guard = attach(&coord);
        assert!(forward_to_attached() >= 1);
        assert!(coord.is_cancelled());
        assert_eq!(coord.reason().as_deref(), Some(USER_REQUESTED));
        // A second request leaves the first reason in place.
        assert!(forward_to_attached() >= 1);
        assert_eq!(coord.reason().as_deref(), Some(USER_REQUESTED));
        drop(guard);
        assert!(
            !targets()
                .lock()
                .unwrap()
                .iter()
                .any(|t| t.ptr_eq(&Arc::downgrade(&coord)))
        );
    }

    #[test]
    fn graceful_shutdown_returns_immediately_when_idle() {
        let coord = CancellationCoordinator::new();
        assert!(graceful_shutdown(&coord, Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn graceful_shutdown_times_out_on_stuck_worker() {
        let coord = Arc::new(CancellationCoordinator::new());
        let _stuck = coord.register_worker();
        let start = Instant::now();
        let err = graceful_shutdown(&coord, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, EngineError::ShutdownTimeout(_)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
