//! Organizer: moves (or copies, for merge) media into `YYYY/Month` folders with
//! date-based file names.

use chrono::NaiveDateTime;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::engine::tools::clean_path;
use crate::engine::{JobHandler, LockKey};
use crate::utils::config::{MAX_DUPLICATE_SUFFIX, VIDEO_DIR_NAME};
use crate::{Job, JobError, JobErrorKind, JobKind, Outcome};

use super::MediaKind;
use super::metadata::{FsMetadata, MetadataSource};

/// Where a job's file will go. Computed without locks; consumed under them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub media: MediaKind,
    pub taken: NaiveDateTime,
    pub dest_dir: PathBuf,
    pub file_name: String,
}

/// `JobHandler` for `Process` (move) and `Merge` (copy) jobs.
#[derive(Clone, Debug, Default)]
pub struct Organizer<M = FsMetadata> {
    metadata: M,
}

impl Organizer<FsMetadata> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: MetadataSource> Organizer<M> {
    pub fn with_metadata(metadata: M) -> Self {
        Self { metadata }
    }
}

/// `base/[VIDEO-FILES/]YYYY/Month`. A base already named after the year is not nested again.
pub fn destination_dir(base: &Path, media: MediaKind, taken: NaiveDateTime) -> PathBuf {
    let year = taken.format("%Y").to_string();
    let month = taken.format("%B").to_string();
    let mut dir = base.to_path_buf();
    if media == MediaKind::Video {
        dir.push(VIDEO_DIR_NAME);
    }
    let base_is_year = base.file_name().and_then(|n| n.to_str()) == Some(year.as_str());
    if !base_is_year {
        dir.push(&year);
    }
    dir.push(month);
    dir
}

/// `YYYY-MM-DD-HHMM.ext`, keeping the source extension as written.
pub fn target_file_name(source: &Path, taken: NaiveDateTime) -> String {
    let stem = taken.format("%Y-%m-%d-%H%M");
    match source.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

fn split_name(file_name: &str) -> (&str, String) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (file_name, String::new()),
    }
}

/// True when `source` already sits in `dir` as `file_name` or one of its `-N` duplicates.
fn already_placed(source: &Path, dir: &Path, file_name: &str) -> bool {
    let (Some(parent), Some(name)) = (source.parent(), source.file_name().and_then(|n| n.to_str()))
    else {
        return false;
    };
    if !is_same_location(parent, dir) {
        return false;
    }
    if name == file_name {
        return true;
    }
    let (stem, ext) = split_name(file_name);
    name.strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.strip_suffix(ext.as_str()))
        .and_then(|n| n.parse::<usize>().ok())
        .is_some_and(|n| (1..=MAX_DUPLICATE_SUFFIX).contains(&n))
}

/// First free path among `name`, `name-1`, ... `name-1000` in `dir`.
fn free_destination(dir: &Path, file_name: &str) -> Result<PathBuf, JobError> {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return Ok(candidate);
    }
    let (stem, ext) = split_name(file_name);
    for counter in 1..=MAX_DUPLICATE_SUFFIX {
        let candidate = dir.join(format!("{stem}-{counter}{ext}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(JobError::new(
        JobErrorKind::TooManyDuplicates,
        format!(
            "too many duplicate filenames for {} in {}",
            file_name,
            dir.display()
        ),
    ))
}

fn is_same_location(source: &Path, target: &Path) -> bool {
    if clean_path(source) == clean_path(target) {
        return true;
    }
    match (fs::canonicalize(source), fs::canonicalize(target)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Rename, falling back to copy + remove when rename cannot cross filesystems.
fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied) => {
            Err(e)
        }
        Err(e) => {
            debug!(
                "rename {} failed ({}), copying instead",
                source.display(),
                e
            );
            fs::copy(source, target)?;
            fs::remove_file(source)
        }
    }
}

impl<M: MetadataSource> JobHandler for Organizer<M> {
    type Plan = Placement;

    fn plan(&self, job: &Job) -> Result<Placement, JobError> {
        if !matches!(job.kind, JobKind::Process | JobKind::Merge) {
            return Err(JobError::new(
                JobErrorKind::Unsupported,
                format!("organizer does not handle {} jobs", job.kind),
            ));
        }
        let media = MediaKind::of(&job.source).ok_or_else(|| {
            JobError::new(
                JobErrorKind::Unsupported,
                format!("not a photo or video: {}", job.source.display()),
            )
        })?;
        let taken = self.metadata.capture_time(&job.source)?;
        Ok(Placement {
            media,
            taken,
            dest_dir: destination_dir(&job.dest_base, media, taken),
            file_name: target_file_name(&job.source, taken),
        })
    }

    /// The source file and the directory the file lands in.
    fn lock_keys(&self, job: &Job, plan: &Placement) -> Vec<LockKey> {
        vec![LockKey::path(&job.source), LockKey::directory(&plan.dest_dir)]
    }

    fn execute(&self, job: &Job, plan: Placement) -> Result<Outcome, JobError> {
        if already_placed(&job.source, &plan.dest_dir, &plan.file_name) {
            return Ok(Outcome::Skipped(format!(
                "already in place: {}",
                job.source.display()
            )));
        }
        let target = free_destination(&plan.dest_dir, &plan.file_name)?;
        let (action, verb) = match job.kind {
            JobKind::Merge => ("copy", "copied"),
            _ => ("move", "moved"),
        };
        if job.dry_run {
            return Ok(Outcome::Done(format!(
                "[DRY RUN] {} would be {} to: {}",
                plan.media,
                verb,
                target.display()
            )));
        }

        fs::create_dir_all(&plan.dest_dir)
            .map_err(|e| JobError::io("create directory", &plan.dest_dir, &e))?;
        let res = match job.kind {
            JobKind::Merge => fs::copy(&job.source, &target).map(|_| ()),
            _ => move_file(&job.source, &target),
        };
        res.map_err(|e| JobError::io(action, &job.source, &e))?;
        Ok(Outcome::Done(format!(
            "{} {} to: {}",
            plan.media,
            verb,
            target.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn photo_and_video_directories() {
        let t = at(2021, 3, 9, 14, 5);
        assert_eq!(
            destination_dir(Path::new("/lib"), MediaKind::Photo, t),
            PathBuf::from("/lib/2021/March")
        );
        assert_eq!(
            destination_dir(Path::new("/lib"), MediaKind::Video, t),
            PathBuf::from("/lib/VIDEO-FILES/2021/March")
        );
    }

    #[test]
    fn year_named_base_is_not_nested() {
        let t = at(2021, 12, 1, 0, 0);
        assert_eq!(
            destination_dir(Path::new("/lib/2021"), MediaKind::Photo, t),
            PathBuf::from("/lib/2021/December")
        );
    }

    #[test]
    fn file_name_keeps_extension_case() {
        let t = at(2020, 1, 2, 3, 4);
        assert_eq!(target_file_name(Path::new("x/IMG.JPG"), t), "2020-01-02-0304.JPG");
        assert_eq!(target_file_name(Path::new("x/noext"), t), "2020-01-02-0304");
    }

    #[test]
    fn numbered_duplicate_counts_as_placed() {
        let dir = Path::new("/lib/2021/March");
        let name = "2021-03-09-1405.jpg";
        assert!(already_placed(&dir.join(name), dir, name));
        assert!(already_placed(&dir.join("2021-03-09-1405-7.jpg"), dir, name));
        assert!(!already_placed(&dir.join("2021-03-09-1405-x.jpg"), dir, name));
        assert!(!already_placed(&dir.join("2021-03-09-1405-1.png"), dir, name));
        assert!(!already_placed(&Path::new("/lib/other").join(name), dir, name));
    }

    #[test]
    fn unsupported_kind_fails_in_plan() {
        let job = Job::new("/a/b.jpg", "/d", JobKind::Tiff);
        let err = Organizer::new().plan(&job).unwrap_err();
        assert_eq!(err.kind, JobErrorKind::Unsupported);
    }
}
