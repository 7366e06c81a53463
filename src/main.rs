//! tvmode: switch a networked television's picture mode, one process at a time.
//!
//! This is the main entry point for the `tvmode` CLI. It parses arguments,
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod cli;
mod commands;
pub mod admission;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;

#[cfg(test)]
mod test_support;

use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
