//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod fetch;
mod job;

pub use fetch::FetchArgs;
pub use job::JobCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Request a report by print code and save it
    Fetch(FetchArgs),
    /// Job inspection
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Fetch(args) => fetch::handle_fetch(args, config).await,
        Commands::Job { command } => job::handle_job_command(command, config).await,
    }
}
