use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::JobKind;

/// Organize photos and videos into a dated folder layout.
#[derive(Clone, Parser)]
#[command(name = "mediasort")]
#[command(about = "Organize photos and videos into YYYY/Month folders; Ctrl-C stops gracefully.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Move media from SRC into the dated layout under DEST.
    Process(RunArgs),
    /// Copy media from SRC into the dated layout under DEST, leaving SRC untouched.
    Merge(RunArgs),
}

impl Commands {
    pub fn kind(&self) -> JobKind {
        match self {
            Commands::Process(_) => JobKind::Process,
            Commands::Merge(_) => JobKind::Merge,
        }
    }

    pub fn args(&self) -> &RunArgs {
        match self {
            Commands::Process(args) | Commands::Merge(args) => args,
        }
    }
}

#[derive(Clone, Args)]
pub struct RunArgs {
    /// Source directory to scan.
    #[arg(value_name = "SRC")]
    pub src: PathBuf,

    /// Destination base directory.
    #[arg(value_name = "DEST")]
    pub dest: PathBuf,

    /// Worker threads (clamped to 1..=16). Default: 4.
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Report what would happen without touching any file.
    #[arg(long, short = 'n', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub dry_run: Option<bool>,

    /// Show live progress.
    #[arg(long, short = 'p', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,

    /// Hide live progress (the final status line and summary are still printed).
    #[arg(long, conflicts_with = "progress")]
    pub no_progress: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Follow symbolic links while scanning SRC.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Exclude patterns (glob syntax). Can specify multiple: -e pattern1 pattern2 pattern3
    #[arg(long, short = 'e', num_args = 1..)]
    pub exclude: Vec<String>,

    /// Resume file. Default: `.mediasort-progress-<command>.json` in SRC.
    #[arg(long, value_name = "FILE")]
    pub resume: Option<PathBuf>,

    /// Ignore any existing resume file and start over.
    #[arg(long)]
    pub fresh: bool,

    /// Seconds to wait for in-flight files after Ctrl-C. Default: 30.
    #[arg(long, value_name = "SECS")]
    pub grace: Option<u64>,

    /// Progress refresh interval in milliseconds. Default: 500.
    #[arg(long, value_name = "MS")]
    pub tick_ms: Option<u64>,
}
