//! Vellum - a password-aware PDF render supervisor
//!
//! This is the binary entry point. All logic lives in the library crates;
//! this file parses arguments and dispatches to the subcommands.

mod commands;

use clap::{Parser, Subcommand};

use commands::open::OpenArgs;
use commands::status::StatusCommand;
use vellum_core::prelude::*;

/// Vellum - a password-aware PDF render supervisor
#[derive(Parser, Debug)]
#[command(name = "vellum")]
#[command(about = "Load PDF documents through an external render worker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a document, prompting for a password if it needs one
    Open(OpenArgs),

    /// Show or edit the saved user status
    Status {
        #[command(subcommand)]
        command: StatusCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize error report hooks
    color_eyre::install().map_err(|e| Error::config(e.to_string()))?;

    // Logging goes to a file; stdout belongs to the command output. Running
    // without logs beats refusing to start.
    if let Err(e) = vellum_core::logging::init() {
        eprintln!("warning: logging disabled: {}", e);
    }

    let result = match cli.command {
        Command::Open(args) => commands::open::run(args).await,
        Command::Status { command } => commands::status::run(command),
    };

    if let Err(ref e) = result {
        error!("Command failed: {:?}", e);
        eprintln!("error: {}", e);
    }

    result
}
