//! Fetch command
//!
//! Requests a report and, when the server switches to polling, follows the
//! job until it finishes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::*;
use presto_client::{Download, FetchOutcome};

use crate::config::Config;
use crate::types::parse_params;

use super::job::{save_download, wait_and_download};

/// Arguments of `presto fetch`
#[derive(Args)]
pub struct FetchArgs {
    /// Print code of the report
    print_code: String,

    /// Report parameter as key=value (repeatable)
    #[arg(short, long = "param")]
    params: Vec<String>,

    /// Where to save the artifact (defaults to the suggested file name)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also deliver the artifact to this target
    #[arg(long)]
    deliver_to: Option<String>,

    /// Return right after the server switches to polling
    #[arg(long)]
    no_wait: bool,

    /// Seconds between polls
    #[arg(long, default_value_t = 2)]
    interval: u64,
}

pub async fn handle_fetch(args: FetchArgs, config: &Config) -> Result<()> {
    let params = parse_params(&args.params)?;
    let mut client = config.client();
    if let Some(target) = &args.deliver_to {
        client = client.with_delivery_target(target);
    }

    println!("{} Requesting {}", "▸".cyan(), args.print_code.bold());

    match client.fetch_report(&args.print_code, &params).await? {
        FetchOutcome::Ready(download) => save(&download, args.output.as_deref()).await,
        FetchOutcome::Pending(pending) => {
            println!(
                "{} Rendering in background as job {}",
                "▸".cyan(),
                pending.job_code.to_string().dimmed()
            );

            if args.no_wait {
                println!(
                    "  Follow it with: {}",
                    format!("presto job wait {}", pending.job_code).cyan()
                );
                return Ok(());
            }

            wait_and_download(
                &client,
                pending.job_code,
                Duration::from_secs(args.interval),
                args.output.as_deref(),
            )
            .await
        }
        FetchOutcome::DuplicateInFlight => {
            bail!(
                "An identical request for '{}' is already being rendered; try again shortly",
                args.print_code
            )
        }
    }
}

async fn save(download: &Download, output: Option<&Path>) -> Result<()> {
    let path = save_download(download, output)
        .await
        .context("Failed to save report")?;
    println!("{} Saved {}", "✓".green(), path.display());
    Ok(())
}
