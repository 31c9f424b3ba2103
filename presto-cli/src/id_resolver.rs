//! Job code resolver
//!
//! Resolves job code prefixes to full codes by listing the jobs the server
//! still retains, so users can type a short prefix instead of a full UUID.

use anyhow::{Context, Result, anyhow};
use presto_client::PrestoClient;
use presto_core::domain::job::JobCode;

use crate::types::CodeOrPrefix;

/// Resolve a job code or prefix to a full code
///
/// # Errors
/// Returns an error if:
/// - No retained job matches the prefix
/// - Multiple jobs match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_job_code(client: &PrestoClient, input: &CodeOrPrefix) -> Result<JobCode> {
    let prefix = match input {
        CodeOrPrefix::Full(code) => return Ok(*code),
        CodeOrPrefix::Prefix(prefix) => prefix,
    };

    let jobs = client
        .list_jobs()
        .await
        .context("Failed to fetch jobs for code resolution")?;

    match_prefix(jobs.iter().map(|j| j.job_code), prefix)
}

fn match_prefix(codes: impl Iterator<Item = JobCode>, prefix: &str) -> Result<JobCode> {
    let matches: Vec<JobCode> = codes
        .filter(|code| code.to_string().starts_with(prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No job found with code starting with '{}'", prefix)),
        [code] => Ok(*code),
        _ => {
            let codes: Vec<String> = matches.iter().map(|c| c.to_string()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple jobs: {}",
                prefix,
                codes.join(", ")
            ))
        }
    }
}
