//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod analyze;
mod check;
mod helpers;
mod init;
mod process;
mod records;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use helpers::load_settings;
use crate::config::BackendPreference;

/// Text extraction backend selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendArg {
    /// Vision model via the chat-completions API
    Remote,
    /// PaddleOCR on this machine (requires the ocr-paddle feature)
    Local,
}

impl From<BackendArg> for BackendPreference {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Remote => BackendPreference::Remote,
            BackendArg::Local => BackendPreference::Local,
        }
    }
}

#[derive(Parser)]
#[command(name = "runlog")]
#[command(about = "Extract workout records from running app screenshots")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to runlog.toml in the working directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create the screenshots directory and an empty record store
    Init,

    /// Process every screenshot in a directory and store new records
    Process {
        /// Screenshots directory (default from config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Output CSV file (default from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Text extraction backend
        #[arg(short, long, value_enum)]
        backend: Option<BackendArg>,
    },

    /// Analyze one screenshot and print the record (nothing is stored)
    Analyze {
        /// Image file to analyze
        image: PathBuf,
        /// Text extraction backend
        #[arg(short, long, value_enum)]
        backend: Option<BackendArg>,
    },

    /// Extract text from one screenshot and print it
    Ocr {
        /// Image file to read
        image: PathBuf,
        /// Text extraction backend
        #[arg(short, long, value_enum)]
        backend: Option<BackendArg>,
    },

    /// Check backend availability and API connectivity
    Check,

    /// List stored records
    Records {
        /// Output CSV file (default from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings),
        Commands::Process {
            dir,
            output,
            backend,
        } => process::cmd_process(
            settings,
            dir,
            output,
            backend.map(BackendPreference::from),
        ),
        Commands::Analyze { image, backend } => {
            analyze::cmd_analyze(settings, &image, backend.map(BackendPreference::from))
        }
        Commands::Ocr { image, backend } => {
            analyze::cmd_ocr(settings, &image, backend.map(BackendPreference::from))
        }
        Commands::Check => check::cmd_check(&settings),
        Commands::Records { output } => records::cmd_records(&settings, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_process_flags() {
        let cli = Cli::try_parse_from([
            "runlog",
            "--verbose",
            "process",
            "--dir",
            "shots",
            "--backend",
            "local",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Process { dir, output, backend } => {
                assert_eq!(dir, Some(PathBuf::from("shots")));
                assert!(output.is_none());
                assert_eq!(backend, Some(BackendArg::Local));
            }
            _ => panic!("expected process command"),
        }
    }

    #[test]
    fn test_backend_arg_conversion() {
        assert_eq!(
            BackendPreference::from(BackendArg::Remote),
            BackendPreference::Remote
        );
        assert_eq!(
            BackendPreference::from(BackendArg::Local),
            BackendPreference::Local
        );
    }
}
