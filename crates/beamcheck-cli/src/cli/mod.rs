//! Command-line surface of the secondary check.
//!
//! Parsing and dispatch stay separate from the command bodies so usage
//! problems, check failures, and system failures all funnel into the same
//! diagnostic line and exit-code mapping.

mod commands;
mod helpers;

use beamcheck_core::CheckError;
use clap::Parser;

/// Entry point for the installed binary. Failures are printed as diagnostic
/// lines on stderr and folded into the category exit code.
pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let check_error = error.as_check_error();
            eprintln!("{}", check_error.diagnostic_line());
            check_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "beamcheck",
    about = "Independent second check of Co-60 beam-on times"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Check every beam of a treatment plan against its recomputed time
    Verify(commands::VerifyArgs),
    /// Compute one beam-on time from a beam description file
    Compute(commands::ComputeArgs),
    /// Decay the source calibration to a target date
    Decay(commands::DecayArgs),
    /// Dump a parsed report, or the correction tables the check would use
    Inspect(commands::InspectArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Verify(args) => commands::run_verify_command(args),
        CliCommand::Compute(args) => commands::run_compute_command(args),
        CliCommand::Decay(args) => commands::run_decay_command(args),
        CliCommand::Inspect(args) => commands::run_inspect_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Check(CheckError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_check_error(&self) -> CheckError {
        match self {
            Self::Usage(message) => CheckError::input("INPUT.CLI_USAGE", message.clone()),
            Self::Check(error) => error.clone(),
            Self::Internal(error) => CheckError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
