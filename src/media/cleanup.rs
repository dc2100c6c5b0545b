//! Remove directories that a `process` run left empty in the source tree.

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::engine::tools::{clean_path, is_os_hidden_file, path_relative_to};

/// Directories under `root` that hold nothing but OS clutter (`.DS_Store`, `Thumbs.db`, ...)
/// and other such directories. Deepest first. `root` itself and `keep` (e.g. a destination
/// nested in the source) are never candidates.
pub fn find_empty_dirs(root: &Path, keep: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut empty: Vec<PathBuf> = Vec::new();
    let mut removable: HashSet<PathBuf> = HashSet::new();
    let keep: Vec<PathBuf> = keep.iter().map(|k| clean_path(k)).collect();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_entry(|e| !keep.contains(&clean_path(e.path())));
    for entry in walker {
        let entry = entry.with_context(|| format!("scan {}", root.display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.into_path();
        let mut only_clutter = true;
        for child in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
            let child = child?.path();
            if !(removable.contains(&child) || (child.is_file() && is_os_hidden_file(&child))) {
                only_clutter = false;
                break;
            }
        }
        if only_clutter {
            removable.insert(dir.clone());
            empty.push(dir);
        }
    }
    Ok(empty)
}

/// Remove (or with `dry_run`, only list) the directories [`find_empty_dirs`] reports.
/// Returns them, deepest first.
pub fn cleanup_empty_dirs(root: &Path, keep: &[PathBuf], dry_run: bool) -> Result<Vec<PathBuf>> {
    let empty = find_empty_dirs(root, keep)?;
    for dir in &empty {
        let shown = path_relative_to(dir, root).unwrap_or_else(|| dir.clone());
        if dry_run {
            info!("[DRY RUN] Would remove empty directory: {}", shown.display());
            continue;
        }
        for child in fs::read_dir(dir)? {
            let child = child?.path();
            if child.is_file() {
                fs::remove_file(&child)
                    .with_context(|| format!("remove {}", child.display()))?;
            }
        }
        fs::remove_dir(dir).with_context(|| format!("remove directory {}", dir.display()))?;
        debug!("removed empty directory {}", shown.display());
    }
    if !empty.is_empty() {
        info!(
            "{} {} empty directories under {}",
            if dry_run { "Would remove" } else { "Removed" },
            empty.len(),
            root.display()
        );
    }
    Ok(empty)
}
