//! Job command handlers
//!
//! Handles job inspection: viewing a job, waiting for it to finish and
//! listing the jobs the server still retains.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use presto_client::{Download, PrestoClient};
use presto_core::domain::job::JobCode;
use presto_core::dto::job::{JobPhase, JobStatus};

use crate::config::Config;
use crate::id_resolver::resolve_job_code;
use crate::types::CodeOrPrefix;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// List jobs awaiting polling
    List,
    /// Get job details
    Get {
        /// Job code or unambiguous prefix
        code: String,
    },
    /// Wait for a job to finish and save its artifact
    Wait {
        /// Job code or unambiguous prefix
        code: String,

        /// Where to save the artifact (defaults to the suggested file name)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds between polls
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },
}

/// Handle job commands
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        JobCommands::List => list_jobs(&client).await,
        JobCommands::Get { code } => get_job(&client, &code).await,
        JobCommands::Wait {
            code,
            output,
            interval,
        } => {
            let code = resolve_job_code(&client, &CodeOrPrefix::parse(&code)).await?;
            wait_and_download(
                &client,
                code,
                Duration::from_secs(interval),
                output.as_deref(),
            )
            .await
        }
    }
}

/// List all retained jobs
async fn list_jobs(client: &PrestoClient) -> Result<()> {
    let jobs = client.list_jobs().await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

/// Get and display a single job
async fn get_job(client: &PrestoClient, code: &str) -> Result<()> {
    let code = resolve_job_code(client, &CodeOrPrefix::parse(code)).await?;

    let status = client.job_status(code).await?;

    print_status(&status);

    Ok(())
}

/// Polls a job until it is terminal, then saves its artifact
pub async fn wait_and_download(
    client: &PrestoClient,
    code: JobCode,
    interval: Duration,
    output: Option<&Path>,
) -> Result<()> {
    println!("{} Waiting for job {}...", "▸".cyan(), code.to_string().dimmed());

    let status = client
        .wait_for_job(code, interval)
        .await
        .with_context(|| format!("Failed to follow job {}", code))?;

    if status.phase == JobPhase::Failed {
        print_status(&status);
        bail!(
            "Job {} failed: {}",
            code,
            status.error.as_deref().unwrap_or("unknown error")
        );
    }

    let download = client.download_artifact(code).await?;
    let path = save_download(&download, output)
        .await
        .context("Failed to save report")?;
    println!("{} Saved {}", "✓".green(), path.display());

    Ok(())
}

/// Writes a download to `output`, or to its suggested name in the current directory
pub async fn save_download(download: &Download, output: Option<&Path>) -> Result<PathBuf> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => default_file_name(download),
    };

    tokio::fs::write(&path, &download.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

fn default_file_name(download: &Download) -> PathBuf {
    download
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).file_name())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("report.out"))
}

/// Print a job summary line
fn print_job_summary(status: &JobStatus) {
    println!("  {} Job {}", "▸".cyan(), status.job_code.to_string().dimmed());
    println!(
        "    Report:   {}/{}",
        status.plugin_ref, status.report_ref
    );
    println!("    Status:   {}", colorize_phase(status.phase));
    println!(
        "    Started:  {}",
        status
            .started_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed job information
pub fn print_status(status: &JobStatus) {
    println!("{}", "Job Details:".bold());
    println!("  Code:      {}", status.job_code.to_string().cyan());
    println!("  Report:    {}/{}", status.plugin_ref, status.report_ref);
    println!("  User:      {}", status.requesting_user);
    println!("  Status:    {}", colorize_phase(status.phase));
    println!("  Progress:  {}%", status.percent_completed);
    println!(
        "  Started:   {}",
        status.started_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(target) = &status.direct_delivery_target {
        println!("  Deliver:   {}", target);
    }

    if let Some(name) = &status.suggested_file_name {
        println!("\n{}", "Artifact:".bold());
        println!("  File:      {}", name);
        if let Some(mime) = &status.mime_type {
            println!("  Type:      {}", mime.dimmed());
        }
    }

    if let Some(error) = &status.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }
}

/// Colorize job phase for display
fn colorize_phase(phase: JobPhase) -> ColoredString {
    let phase_str = phase.to_string();
    match phase {
        JobPhase::Running => phase_str.cyan(),
        JobPhase::Completed => phase_str.green(),
        JobPhase::Failed => phase_str.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn download(file_name: Option<&str>) -> Download {
        Download {
            bytes: b"body".to_vec(),
            mime_type: Some("text/plain".to_string()),
            file_name: file_name.map(str::to_string),
        }
    }

    #[test]
    fn test_default_file_name_strips_directories() {
        assert_eq!(
            default_file_name(&download(Some("../../etc/invoice.txt"))),
            PathBuf::from("invoice.txt")
        );
        assert_eq!(default_file_name(&download(None)), PathBuf::from("report.out"));
    }

    #[tokio::test]
    async fn test_save_download_to_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let saved = save_download(&download(Some("invoice.txt")), Some(&path))
            .await
            .unwrap();

        assert_eq!(saved, path);
        assert_eq!(std::fs::read(&path).unwrap(), b"body");
    }
}
