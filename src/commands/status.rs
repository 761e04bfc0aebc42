//! `vellum status` - show, set, or clear the saved user status
//!
//! Operates directly on the persisted status file; a concurrently running
//! `vellum open` picks the change up on its next start (the engine seeds
//! the store from disk).

use std::path::Path;

use clap::Subcommand;

use vellum_app::status::{clear_status, default_status_dir, load_status, save_status, UserStatus};
use vellum_core::prelude::*;

#[derive(Subcommand, Debug)]
pub enum StatusCommand {
    /// Print the saved status
    Show,

    /// Save a status: an emoji short-code plus optional text
    Set {
        /// Emoji short-code, e.g. :palm_tree:
        #[arg(value_name = "EMOJI")]
        emoji: String,

        /// Status text (remaining arguments are joined with spaces)
        #[arg(value_name = "TEXT")]
        text: Vec<String>,
    },

    /// Remove the saved status
    Clear,
}

pub fn run(command: StatusCommand) -> Result<()> {
    let Some(dir) = default_status_dir() else {
        return Err(Error::status("Could not determine the data directory"));
    };
    run_with_dir(&dir, command)
}

fn run_with_dir(dir: &Path, command: StatusCommand) -> Result<()> {
    match command {
        StatusCommand::Show => {
            match load_status(dir) {
                Some(status) => println!("{}", status.display()),
                None => println!("No status set."),
            }
            Ok(())
        }
        StatusCommand::Set { emoji, text } => {
            let status = UserStatus::new(emoji, text.join(" "));
            save_status(dir, &status)?;
            info!("Status set to {:?}", status.display());
            println!("Status set: {}", status.display());
            Ok(())
        }
        StatusCommand::Clear => {
            clear_status(dir)?;
            info!("Status cleared");
            println!("Status cleared.");
            Ok(())
        }
    }
}
