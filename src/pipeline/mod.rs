//! Batch pipeline: feeder → workers → collector, driven by the orchestrator.

pub mod collector;
pub mod context;
pub mod feeder;
pub mod orchestrator;
pub mod summary;

pub use context::{RunChannels, RunContext, RunHandles, create_run_channels, queue_depth};
pub use orchestrator::{process_jobs_with_cancellation, run_batch};
pub use summary::{BatchReport, Summary};
