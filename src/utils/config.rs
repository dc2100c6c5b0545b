//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    resume_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                resume_prefix: format!(".{pkg}-progress"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-directory config file (`.mediasort.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Resume file name for `operation`: `.mediasort-progress-<operation>.json`.
    pub fn resume_filename(&self, operation: &str) -> String {
        format!("{}-{}.json", self.resume_prefix, operation)
    }

    /// Names never turned into jobs (our own bookkeeping files).
    pub fn default_exclude_patterns(&self) -> Vec<String> {
        vec![
            self.config_filename().to_string(),
            format!("{}-*", self.resume_prefix),
        ]
    }
}

// ---- Engine ----

/// Worker pool, reporter and shutdown tuning.
pub struct EngineConsts;

impl EngineConsts {
    /// Requests below this are raised to it.
    pub const MIN_WORKERS: usize = 1;
    /// Requests above this are capped to it.
    pub const MAX_WORKERS: usize = 16;
    pub const DEFAULT_WORKERS: usize = 4;
    /// Job/result queue slots per worker when no explicit depth is given.
    pub const QUEUE_SLOTS_PER_WORKER: usize = 4;
    /// Progress reporter tick.
    pub const TICK_INTERVAL: Duration = Duration::from_millis(500);
    /// Graceful shutdown window after cancellation.
    pub const GRACE_PERIOD: Duration = Duration::from_secs(30);
    /// Process exit code when the run was cancelled (128 + SIGINT).
    pub const CANCELLED_EXIT_CODE: i32 = 130;
}

// ---- Locking ----

/// Number of hash buckets for predicted destination directories (first byte of blake3).
pub const PREDICTED_DIR_BUCKETS: usize = 256;

/// File name appended to a directory to form its lock token.
pub const DIR_LOCK_NAME: &str = ".dir_lock";

// ---- Organizing ----

/// Subdirectory for videos under the destination base.
pub const VIDEO_DIR_NAME: &str = "VIDEO-FILES";

/// Give up looking for a free `name-N.ext` after this many attempts.
pub const MAX_DUPLICATE_SUFFIX: usize = 1000;

pub const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "tiff", "tif", "dng", "cr2", "nef", "arw", "orf", "rw2",
    "raf", "srw", "pef", "3fr", "fff", "iiq", "k25", "kdc", "dcr", "mrw", "raw",
];

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "wmv", "flv", "webm", "m4v", "3gp", "3g2", "mts", "m2ts", "ts",
    "mxf", "asf", "rm", "rmvb", "vob", "ogv", "dv", "qt",
];
