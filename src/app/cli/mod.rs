//! CLI adapter.

mod check;
mod compile;
mod kinds;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::app::logging;
use crate::domain::AppError;

#[derive(Parser)]
#[command(name = "aw-compile")]
#[command(version)]
#[command(
    about = "Compile agent safe-output declarations into a GitHub Actions job graph",
    long_about = None
)]
struct Cli {
    /// Log compile passes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the safe-output job graph as YAML
    #[clap(visible_alias = "c")]
    Compile {
        /// WorkflowSpec YAML file
        spec: PathBuf,
        /// Preview safe outputs instead of applying them
        #[arg(long)]
        staged: bool,
        /// JSON pin table to use instead of the embedded one
        #[arg(long, value_name = "FILE")]
        action_pins: Option<PathBuf>,
        /// Write the YAML here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// List the supported output kinds
    #[clap(visible_alias = "k")]
    Kinds,
    /// Validate a WorkflowSpec without rendering it
    Check {
        /// WorkflowSpec YAML file
        spec: PathBuf,
        /// JSON pin table to use instead of the embedded one
        #[arg(long, value_name = "FILE")]
        action_pins: Option<PathBuf>,
    },
}

/// Entry point for the CLI.
pub fn run() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result: Result<(), AppError> = match cli.command {
        Commands::Compile { spec, staged, action_pins, output } => {
            compile::run_compile(&spec, staged, action_pins, output)
        }
        Commands::Kinds => kinds::run_kinds(),
        Commands::Check { spec, action_pins } => check::run_check(&spec, action_pins),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
