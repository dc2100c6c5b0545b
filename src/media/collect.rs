//! Turn a source tree into jobs.

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::engine::tools::{clean_path, should_include_in_walk};
use crate::utils::config::PackagePaths;
use crate::{Job, JobKind, Opts};

use super::MediaKind;

/// Jobs found under a source directory, plus what the walk could not read.
#[derive(Debug, Default)]
pub struct CollectedJobs {
    /// Sorted by source path.
    pub jobs: Vec<Job>,
    /// Paths the walk failed on, with the error message.
    pub skipped_paths: Vec<(PathBuf, String)>,
    /// Files that were neither photos nor videos.
    pub ignored: usize,
}

/// Walk `src` and build one `kind` job per photo or video file.
///
/// Hidden OS files, exclude patterns and our own bookkeeping files are filtered out, and a
/// destination nested inside `src` is not descended into.
pub fn collect_jobs(src: &Path, dest: &Path, kind: JobKind, opts: &Opts) -> Result<CollectedJobs> {
    if !src.is_dir() {
        bail!("source is not a directory: {}", src.display());
    }
    let root = src
        .canonicalize()
        .with_context(|| format!("resolve source {}", src.display()))?;
    let dest_root = dest.canonicalize().unwrap_or_else(|_| clean_path(dest));

    let mut exclude = opts.exclude.clone();
    exclude.extend(PackagePaths::get().default_exclude_patterns());

    let mut collected = CollectedJobs::default();
    let walker = WalkDir::new(&root)
        .follow_links(opts.follow_links)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.path() != dest_root);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(PathBuf::from).unwrap_or_else(|| root.clone());
                warn!("Skipping {}: {}", path.display(), err);
                collected.skipped_paths.push((path, err.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() || !should_include_in_walk(entry.path(), &root, &exclude) {
            continue;
        }
        if MediaKind::of(entry.path()).is_none() {
            collected.ignored += 1;
            continue;
        }
        collected.jobs.push(
            Job::new(entry.into_path(), dest.to_path_buf(), kind).dry_run(opts.dry_run),
        );
    }
    collected.jobs.sort_by(|a, b| a.source.cmp(&b.source));
    debug!(
        "collected {} jobs under {} ({} non-media files ignored)",
        collected.jobs.len(),
        root.display(),
        collected.ignored
    );
    Ok(collected)
}
