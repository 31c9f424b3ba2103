//! Presto CLI
//!
//! Command-line interface for requesting reports from a Presto server and
//! following the jobs that render them.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "presto")]
#[command(about = "Presto report rendering CLI", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(long, env = "PRESTO_URL", default_value = "http://localhost:8080")]
    server_url: String,

    /// User to request reports as
    #[arg(long, env = "PRESTO_USER")]
    user: Option<String>,

    /// Session used to scope duplicate detection
    #[arg(long, env = "PRESTO_SESSION")]
    session: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url,
        user: cli.user,
        session: cli.session,
    };

    handle_command(cli.command, &config).await
}
