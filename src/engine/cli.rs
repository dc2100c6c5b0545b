//! CLI command handler: resolve options, collect jobs, run the batch, keep the resume file.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::IsTerminal;
use std::sync::Arc;

use crate::engine::arg_parser::{Cli, RunArgs};
use crate::engine::{BarSink, LineSink, ProgressSink};
use crate::engine::tools::path_relative_to;
use crate::media::{Organizer, cleanup_empty_dirs, collect_jobs};
use crate::resume::ResumeState;
use crate::utils::mediasort_toml::{apply_file_to_opts, load_mediasort_toml};
use crate::utils::setup_logging;
use crate::{JobKind, Opts, process_jobs_with_cancellation};

/// Config file first, then CLI flags on top. Returns the options and whether the file
/// asked for copies instead of moves.
fn setup_opts(args: &RunArgs) -> (Opts, bool) {
    let mut opts = Opts {
        progress: true,
        ..Opts::default()
    };
    let file = load_mediasort_toml(&args.src);
    if let Some(ref file) = file {
        apply_file_to_opts(file, &mut opts);
    }
    if args.workers.is_some() {
        opts.workers = args.workers;
    }
    if let Some(v) = args.dry_run {
        opts.dry_run = v;
    }
    if let Some(v) = args.progress {
        opts.progress = v;
    }
    if args.no_progress {
        opts.progress = false;
    }
    if let Some(v) = args.verbose {
        opts.verbose = v;
    }
    if let Some(v) = args.follow_links {
        opts.follow_links = v;
    }
    if !args.exclude.is_empty() {
        opts.exclude = args.exclude.clone();
    }
    if args.grace.is_some() {
        opts.grace_secs = args.grace;
    }
    if args.tick_ms.is_some() {
        opts.tick_ms = args.tick_ms;
    }
    opts.resume = args.resume.clone();

    setup_logging(opts.verbose);
    debug!("{} CONFIG:{:#?}", env!("CARGO_PKG_NAME").to_uppercase(), opts);
    (opts, file.is_some_and(|f| f.copy()))
}

fn make_sink(total: usize, kind: JobKind, show_progress: bool) -> Box<dyn ProgressSink> {
    if show_progress && std::io::stderr().is_terminal() {
        let desc = match kind {
            JobKind::Merge => "Merging",
            _ => "Organizing",
        };
        Box::new(BarSink::new(total, desc))
    } else {
        Box::new(LineSink::stderr())
    }
}

/// After a finished `process` run, drop source directories that now hold only OS clutter.
/// The destination is left alone when it sits inside the source.
fn cleanup_source(args: &RunArgs, dry_run: bool) -> Result<()> {
    let keep = vec![args.dest.clone()];
    let removed = cleanup_empty_dirs(&args.src, &keep, dry_run)
        .with_context(|| format!("clean up {}", args.src.display()))?;
    if removed.is_empty() {
        debug!("no empty directories under {}", args.src.display());
    }
    Ok(())
}

/// Run `process` or `merge`. A cancelled run comes back as `EngineError::Cancelled` inside the
/// error so `main` can pick the exit code.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let args = cli.command.args();
    let (opts, copy) = setup_opts(args);
    let kind = match cli.command.kind() {
        JobKind::Process if copy => JobKind::Merge,
        kind => kind,
    };

    if opts.dry_run {
        warn!("RUNNING IN DRY-RUN MODE. NO FILES WILL BE MOVED OR COPIED.");
    }

    let collected = collect_jobs(&args.src, &args.dest, kind, &opts)
        .with_context(|| format!("scan {}", args.src.display()))?;
    if !collected.skipped_paths.is_empty() {
        warn!("{} paths could not be read", collected.skipped_paths.len());
    }
    let mut jobs = collected.jobs;

    let resume_path = opts
        .resume
        .clone()
        .unwrap_or_else(|| ResumeState::default_path(&args.src, kind));
    let previous = if args.fresh {
        None
    } else {
        ResumeState::load(&resume_path)?
            .filter(|state| state.matches(kind, &args.src, &args.dest))
    };
    let mut state = match previous {
        Some(state) => state,
        None => ResumeState::new(kind, &args.src, &args.dest, jobs.len()),
    };
    state.filter_pending(&mut jobs);

    if jobs.is_empty() {
        info!("No media files left to {} in {}", kind, args.src.display());
        if !opts.dry_run {
            ResumeState::remove(&resume_path)?;
        }
        if kind == JobKind::Process {
            cleanup_source(args, opts.dry_run)?;
        }
        return Ok(());
    }

    let engine_opts = opts.engine_opts();
    let sink = make_sink(jobs.len(), kind, engine_opts.show_progress);
    let outcome =
        process_jobs_with_cancellation(jobs, Arc::new(Organizer::new()), &engine_opts, sink);

    let report = match &outcome {
        Ok(report) => Some(report),
        Err(e) => e.report(),
    };
    if let Some(report) = report {
        for result in report.results.iter() {
            match &result.error {
                Some(err) => {
                    let shown = path_relative_to(&result.job.source, &args.src)
                        .unwrap_or_else(|| result.job.source.clone());
                    warn!("{}: {}", shown.display(), err)
                }
                None => debug!("{}", result.message),
            }
        }
        if !opts.dry_run {
            let clean = outcome.is_ok() && report.summary.failed == 0;
            if clean {
                ResumeState::remove(&resume_path)?;
            } else {
                state.record(report);
                state.save(&resume_path)?;
                info!("Progress saved to {}", resume_path.display());
            }
        }
    }

    if kind == JobKind::Process && outcome.is_ok() {
        cleanup_source(args, opts.dry_run)?;
    }

    outcome.map(|_| ()).map_err(Into::into)
}
