//! `recordqa` command-line entry point.
//!
//! Exit status: 0 when the input was drained (skipped records included),
//! 1 on a configuration error or a fatal stream fault, 2 on usage errors.

use clap::Parser;
use recordqa::cli::{Cli, RunOptions, execute};
use recordqa::init_logging;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let options = RunOptions::from(cli);
    match execute(&options) {
        Ok(summary) => {
            info!(
                processed = summary.processed,
                skipped = summary.skipped,
                "finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
