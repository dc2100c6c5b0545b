//! Job engine: path locks, cancellation, workers, progress and signal handling.

pub mod arg_parser;
pub mod cancel;
pub mod cli;
pub mod locks;
pub mod progress;
pub mod reporter;
pub mod signal;
pub mod tools;
pub mod worker;

// Re-export commonly used items
pub use arg_parser::{Cli, Commands, RunArgs};
pub use cancel::{CancelState, CancellationCoordinator, WorkerRegistration};
pub use cli::handle_run;
pub use locks::{LockKey, LockSet, PathLockGuard, PathLockManager, predicted_dir_token};
pub use progress::{ProgressSnapshot, ProgressTracker, format_duration};
pub use reporter::{BarSink, LineSink, NullSink, ProgressSink, spawn_reporter};
pub use signal::{SignalGuard, graceful_shutdown};
pub use tools::{glob_match, path_relative_to, should_include_in_walk};
pub use worker::{FnHandler, JobHandler, WorkerContext, handler_fn, run_job, spawn_workers};
