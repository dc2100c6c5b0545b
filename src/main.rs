//! mediasort CLI: organize photos and videos by date; Ctrl-C stops gracefully (exit 130).

use clap::Parser;
use mediasort::EngineError;
use mediasort::engine::arg_parser::Cli;
use mediasort::engine::handle_run;
use mediasort::utils::config::EngineConsts;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let code = match handle_run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<EngineError>() {
            Some(EngineError::Cancelled { .. }) => {
                ExitCode::from(EngineConsts::CANCELLED_EXIT_CODE as u8)
            }
            _ => {
                log::error!("{:#}", e);
                ExitCode::FAILURE
            }
        },
    };
    log::debug!("Total time: {:?}", start_time.elapsed());
    code
}
