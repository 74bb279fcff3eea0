//! talkd: conversation-driven build, merge, deploy and release bot.
//!
//! This is the main entry point for the `talkd` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

use std::process::ExitCode;
use talkd::cli::Cli;
use talkd::{commands, exit_codes, logging};

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
