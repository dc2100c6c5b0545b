//! mediasort: organize photo and video files by date on a cancellable worker pool.
//!
//! The engine ([`engine`], [`pipeline`]) runs any [`JobHandler`](engine::JobHandler) over a
//! list of [`Job`]s with per-path locking, progress reporting and graceful shutdown. The
//! [`media`] module supplies the built-in organizer used by the CLI.

pub mod engine;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod resume;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::{EngineError, JobError, JobErrorKind};
pub use pipeline::{BatchReport, Summary, process_jobs_with_cancellation, run_batch};
pub use types::*;
