//! Progress reporter: a ticking thread that renders tracker state to a sink.

use crossbeam_channel::{Receiver, select, tick};
use kdam::{Animation, Bar, BarExt};
use log::debug;
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::pipeline::Summary;

use super::cancel::CancellationCoordinator;
use super::progress::{ProgressSnapshot, ProgressTracker, format_duration, format_snapshot};

const CANCELLING_TAG: &str = " [CANCELLING...]";
const CANCELLED_TAG: &str = " [CANCELLED]";

/// Where progress lines and the final summary go.
pub trait ProgressSink: Send {
    /// Periodic update. `cancelling` is true between cancel and settled shutdown.
    fn render(&mut self, snapshot: &ProgressSnapshot, cancelling: bool);
    /// Last status line of the run. Always called exactly once.
    fn finish(&mut self, snapshot: &ProgressSnapshot, cancelled: bool);
    /// Final summary block.
    fn summary(&mut self, summary: &Summary);
}

/// Plain text sink: one `\r`-prefixed line per tick, unchanged lines suppressed.
pub struct LineSink<W: Write + Send> {
    out: W,
    last: String,
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl LineSink<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> ProgressSink for LineSink<W> {
    fn render(&mut self, snapshot: &ProgressSnapshot, cancelling: bool) {
        let mut line = format_snapshot(snapshot);
        if cancelling {
            line.push_str(CANCELLING_TAG);
        }
        if line != self.last {
            let _ = write!(self.out, "\r{line}");
            let _ = self.out.flush();
            self.last = line;
        }
    }

    fn finish(&mut self, snapshot: &ProgressSnapshot, cancelled: bool) {
        let tag = if cancelled { CANCELLED_TAG } else { "" };
        let _ = writeln!(self.out, "\r{}{}", format_snapshot(snapshot), tag);
        let _ = self.out.flush();
    }

    fn summary(&mut self, summary: &Summary) {
        let _ = write!(self.out, "{summary}");
        let _ = self.out.flush();
    }
}

/// Terminal progress bar (kdam) for interactive runs.
pub struct BarSink {
    bar: Bar,
}

impl BarSink {
    pub fn new(total: usize, desc: &'static str) -> Self {
        Self {
            bar: kdam::tqdm!(
                total = total,
                desc = desc,
                animation = Animation::Classic,
                unit = " files"
            ),
        }
    }

    fn sync(&mut self, snapshot: &ProgressSnapshot, tag: &str) {
        let eta = snapshot.eta();
        let eta_str = if eta > Duration::ZERO {
            format!(" eta={}", format_duration(eta))
        } else {
            String::new()
        };
        self.bar.set_postfix(format!(
            "ok={} failed={} skipped={}{}{}",
            snapshot.succeeded(),
            snapshot.failed,
            snapshot.skipped,
            eta_str,
            tag
        ));
        let _ = self.bar.update_to(snapshot.processed());
    }
}

impl ProgressSink for BarSink {
    fn render(&mut self, snapshot: &ProgressSnapshot, cancelling: bool) {
        self.sync(snapshot, if cancelling { CANCELLING_TAG } else { "" });
    }

    fn finish(&mut self, snapshot: &ProgressSnapshot, cancelled: bool) {
        self.sync(snapshot, if cancelled { CANCELLED_TAG } else { "" });
        let _ = self.bar.refresh();
        eprintln!();
    }

    fn summary(&mut self, summary: &Summary) {
        eprint!("{summary}");
    }
}

/// Sink that discards everything (library callers that only want the report).
#[derive(Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn render(&mut self, _: &ProgressSnapshot, _: bool) {}
    fn finish(&mut self, _: &ProgressSnapshot, _: bool) {}
    fn summary(&mut self, _: &Summary) {}
}

/// Start the reporter. It renders every `interval` (when `show_ticks`) until `settled`
/// disconnects, then renders the final line and hands the sink back through the join handle.
///
/// The orchestrator drops the `settled` sender only once every result that will ever be
/// counted has been counted, so the final line is never stale.
pub fn spawn_reporter(
    tracker: Arc<ProgressTracker>,
    coordinator: Arc<CancellationCoordinator>,
    settled: Receiver<()>,
    mut sink: Box<dyn ProgressSink>,
    interval: Duration,
    show_ticks: bool,
) -> JoinHandle<Box<dyn ProgressSink>> {
    thread::spawn(move || {
        let ticker = tick(interval);
        loop {
            select! {
                recv(ticker) -> _ => {
                    if show_ticks {
                        sink.render(&tracker.stats(), coordinator.is_cancelled());
                    }
                }
                recv(settled) -> _ => break,
            }
        }
        debug!("reporter: run settled, rendering final status");
        sink.finish(&tracker.stats(), coordinator.is_cancelled());
        sink
    })
}
