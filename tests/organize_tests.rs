use mediasort::engine::{NullSink, PathLockManager, run_job};
use mediasort::media::{FsMetadata, cleanup_empty_dirs, MediaKind, MetadataSource, Organizer, collect_jobs, destination_dir};
use mediasort::resume::ResumeState;
use mediasort::{EngineOpts, Job, JobKind, JobStatus, Opts, process_jobs_with_cancellation};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn touch(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn engine_opts() -> EngineOpts {
    EngineOpts {
        workers: 4,
        tick: Duration::from_millis(10),
        show_progress: false,
        locks: Arc::new(PathLockManager::new()),
        ..EngineOpts::default()
    }
}

fn count_files(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

#[test]
fn process_moves_media_into_dated_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dest = tmp.path().join("dest");
    touch(&src.join("a/2021-03-09-1405.jpg"), "photo");
    touch(&src.join("clip.mov"), "video");
    touch(&src.join("notes.txt"), "text");
    touch(&src.join(".DS_Store"), "");

    let collected = collect_jobs(&src, &dest, JobKind::Process, &Opts::default()).unwrap();
    assert_eq!(collected.jobs.len(), 2);
    assert_eq!(collected.ignored, 1);

    let clip_taken = FsMetadata.capture_time(&src.join("clip.mov")).unwrap();
    let report = process_jobs_with_cancellation(
        collected.jobs,
        Arc::new(Organizer::new()),
        &engine_opts(),
        Box::new(NullSink),
    )
    .unwrap();
    assert_eq!(report.summary.succeeded, 2);

    let photo = dest.join("2021/March/2021-03-09-1405.jpg");
    assert_eq!(fs::read_to_string(&photo).unwrap(), "photo");
    assert!(!src.join("a/2021-03-09-1405.jpg").exists());

    let video_dir = destination_dir(&dest, MediaKind::Video, clip_taken);
    assert!(video_dir.starts_with(dest.join("VIDEO-FILES")));
    assert!(video_dir.join(clip_taken.format("%Y-%m-%d-%H%M.mov").to_string()).exists());
    assert!(src.join("notes.txt").exists());
}

#[test]
fn same_timestamp_gets_numbered_suffix() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dest = tmp.path().join("dest");
    touch(&src.join("x/2021-03-09-1405.jpg"), "one");
    touch(&src.join("y/2021-03-09-1405-paris.jpg"), "two");

    let collected = collect_jobs(&src, &dest, JobKind::Process, &Opts::default()).unwrap();
    let report = process_jobs_with_cancellation(
        collected.jobs,
        Arc::new(Organizer::new()),
        &engine_opts(),
        Box::new(NullSink),
    )
    .unwrap();
    assert_eq!(report.summary.succeeded, 2);
    let month = dest.join("2021/March");
    assert!(month.join("2021-03-09-1405.jpg").exists());
    assert!(month.join("2021-03-09-1405-1.jpg").exists());
    assert_eq!(count_files(&dest), 2);
}

#[test]
fn merge_copies_and_keeps_source() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dest = tmp.path().join("2019");
    touch(&src.join("2019-12-31-2359.png"), "png");

    let collected = collect_jobs(&src, &dest, JobKind::Merge, &Opts::default()).unwrap();
    process_jobs_with_cancellation(
        collected.jobs,
        Arc::new(Organizer::new()),
        &engine_opts(),
        Box::new(NullSink),
    )
    .unwrap();
    // Destination already named after the year: no second year level.
    assert!(dest.join("December/2019-12-31-2359.png").exists());
    assert!(src.join("2019-12-31-2359.png").exists());
}

#[test]
fn dry_run_touches_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dest = tmp.path().join("dest");
    touch(&src.join("2020-06-01-0800.jpg"), "p");

    let opts = Opts {
        dry_run: true,
        ..Opts::default()
    };
    let collected = collect_jobs(&src, &dest, JobKind::Process, &opts).unwrap();
    assert!(collected.jobs.iter().all(|j| j.dry_run));
    let report = process_jobs_with_cancellation(
        collected.jobs,
        Arc::new(Organizer::new()),
        &engine_opts(),
        Box::new(NullSink),
    )
    .unwrap();
    assert!(report.results[0].message.starts_with("[DRY RUN] Photo would be moved to:"));
    assert!(!dest.exists());
    assert!(src.join("2020-06-01-0800.jpg").exists());
}

#[test]
fn file_already_in_place_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("lib");
    let placed = dest.join("2018/July/2018-07-04-1200.jpg");
    touch(&placed, "p");

    let locks = PathLockManager::new();
    let result = run_job(
        &Organizer::new(),
        &locks,
        Job::new(&placed, &dest, JobKind::Process),
    );
    assert_eq!(result.status, JobStatus::Skipped);
    assert!(placed.exists());
}

#[test]
fn numbered_duplicate_in_place_is_not_renamed_again() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("lib");
    let month = dest.join("2021/March");
    touch(&month.join("2021-03-09-1405.jpg"), "first");
    touch(&month.join("2021-03-09-1405-1.jpg"), "second");

    let locks = PathLockManager::new();
    let result = run_job(
        &Organizer::new(),
        &locks,
        Job::new(month.join("2021-03-09-1405-1.jpg"), &dest, JobKind::Process),
    );
    assert_eq!(result.status, JobStatus::Skipped);
    let mut names: Vec<String> = fs::read_dir(&month)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["2021-03-09-1405-1.jpg", "2021-03-09-1405.jpg"]);
}

#[test]
fn process_removes_emptied_source_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dest = src.join("sorted");
    touch(&src.join("trip/day1/2021-03-09-1405.jpg"), "photo");
    touch(&src.join("trip/day1/.DS_Store"), "");
    touch(&src.join("docs/readme.txt"), "text");
    fs::create_dir_all(&dest).unwrap();

    let collected = collect_jobs(&src, &dest, JobKind::Process, &Opts::default()).unwrap();
    process_jobs_with_cancellation(
        collected.jobs,
        Arc::new(Organizer::new()),
        &engine_opts(),
        Box::new(NullSink),
    )
    .unwrap();

    let listed = cleanup_empty_dirs(&src, &[dest.clone()], true).unwrap();
    assert_eq!(listed, vec![src.join("trip/day1"), src.join("trip")]);
    assert!(src.join("trip/day1").exists());

    let removed = cleanup_empty_dirs(&src, &[dest.clone()], false).unwrap();
    assert_eq!(removed, listed);
    assert!(!src.join("trip").exists());
    assert!(src.join("docs/readme.txt").exists());
    assert!(dest.join("2021/March/2021-03-09-1405.jpg").exists());
    assert!(src.exists());
}

#[test]
fn destination_inside_source_is_not_rescanned() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().to_path_buf();
    let dest = src.join("sorted");
    touch(&src.join("2022-01-01-0000.jpg"), "a");
    touch(&dest.join("2022/January/2022-01-01-0000.jpg"), "b");

    let collected = collect_jobs(&src, &dest, JobKind::Process, &Opts::default()).unwrap();
    assert_eq!(collected.jobs.len(), 1);
}

#[test]
fn resume_state_skips_finished_sources() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dest = tmp.path().join("dest");
    touch(&src.join("2020-01-01-0000.jpg"), "a");
    touch(&src.join("2020-01-02-0000.jpg"), "b");
    touch(&src.join("IMG_0003.heic"), "c");

    let collected = collect_jobs(&src, &dest, JobKind::Merge, &Opts::default()).unwrap();
    let mut state = ResumeState::new(JobKind::Merge, &src, &dest, collected.jobs.len());
    let report = process_jobs_with_cancellation(
        collected.jobs,
        Arc::new(Organizer::new()),
        &engine_opts(),
        Box::new(NullSink),
    )
    .unwrap();
    state.record(&report);

    let path = ResumeState::default_path(&src, JobKind::Merge);
    state.save(&path).unwrap();
    let loaded = ResumeState::load(&path).unwrap().unwrap();
    assert!(loaded.matches(JobKind::Merge, &src, &dest));
    assert!(!loaded.matches(JobKind::Process, &src, &dest));
    assert_eq!(loaded.processed.len(), 3);

    // The resume file itself is never collected.
    let mut again = collect_jobs(&src, &dest, JobKind::Merge, &Opts::default())
        .unwrap()
        .jobs;
    assert_eq!(again.len(), 3);
    assert_eq!(loaded.filter_pending(&mut again), 3);
    assert!(again.is_empty());

    ResumeState::remove(&path).unwrap();
    assert!(ResumeState::load(&path).unwrap().is_none());
}
