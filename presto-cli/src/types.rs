//! Common types used across CLI modules

use anyhow::{Result, anyhow};
use presto_core::domain::job::JobCode;
use presto_core::domain::report::ReportParams;

/// Job code given in full or as an unambiguous prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeOrPrefix {
    /// Full job code
    Full(JobCode),
    /// Prefix that should uniquely identify a retained job
    Prefix(String),
}

impl CodeOrPrefix {
    /// Parses a full job code first, otherwise treats the input as a prefix
    pub fn parse(input: &str) -> Self {
        match input.parse::<JobCode>() {
            Ok(code) => CodeOrPrefix::Full(code),
            Err(_) => CodeOrPrefix::Prefix(input.to_lowercase()),
        }
    }
}

impl std::fmt::Display for CodeOrPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeOrPrefix::Full(code) => write!(f, "{}", code),
            CodeOrPrefix::Prefix(prefix) => write!(f, "{}", prefix),
        }
    }
}

/// Parses repeated `key=value` arguments into report parameters
pub fn parse_params(pairs: &[String]) -> Result<ReportParams> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Invalid parameter '{}', expected key=value", pair))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(anyhow!("Invalid parameter '{}', empty key", pair));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}
