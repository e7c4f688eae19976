mod commands;
mod helpers;

use clap::Parser;
use regressions_core::RegressionError;

const PROGRAM_NAME: &str = "regressions";

pub fn run_from_env() -> i32 {
    let args = std::iter::once(PROGRAM_NAME.to_string())
        .chain(std::env::args().skip(1))
        .collect::<Vec<_>>();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}", error.diagnostic_line());
            error.exit_code()
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
#[command(name = "regressions", version, about = "Inspect and maintain regression snapshots")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Compare an obtained snapshot against its expected baseline
    Compare(commands::CompareArgs),
    /// List obtained files left behind by failing checks
    Pending(commands::PendingArgs),
    /// Promote obtained files to expected baselines
    Accept(commands::AcceptArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Compare(args) => commands::run_compare_command(args),
        CliCommand::Pending(args) => commands::run_pending_command(args),
        CliCommand::Accept(args) => commands::run_accept_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Check(RegressionError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RegressionError> for CliError {
    fn from(error: RegressionError) -> Self {
        Self::Check(error)
    }
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Check(error) => error.exit_code(),
            Self::Internal(error) if is_io_failure(error) => 3,
            Self::Internal(_) => 5,
        }
    }

    fn diagnostic_line(&self) -> String {
        match self {
            Self::Usage(message) => format!("ERROR: [INPUT.CLI_USAGE] {}", message.trim_end()),
            Self::Check(error) => error.diagnostic_line(),
            Self::Internal(error) if is_io_failure(error) => {
                format!("ERROR: [IO.CLI] {error:#}")
            }
            Self::Internal(error) => format!("ERROR: [SYS.CLI] {error:#}"),
        }
    }
}

fn is_io_failure(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| cause.is::<std::io::Error>())
}
