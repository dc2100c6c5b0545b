pub mod config;
pub mod logger;
pub mod mediasort_toml;
pub mod tempfiles;

pub use config::*;
pub use logger::setup_logging;
pub use tempfiles::write_atomic;
