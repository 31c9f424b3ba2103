//! Error types for the job engine

use presto_core::domain::job::JobCode;
use thiserror::Error;

/// Errors raised before a job exists
///
/// Nothing in the caches is touched when one of these is returned.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The print code could not be turned into a report target
    #[error("Failed to resolve print code '{print_code}': {message}")]
    Resolve { print_code: String, message: String },
}

impl DispatchError {
    pub fn resolve(print_code: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::Resolve {
            print_code: print_code.into(),
            message: format!("{:#}", err),
        }
    }
}

/// Errors from the job lifecycle
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Job {0} was already started")]
    AlreadyStarted(JobCode),
}

/// Invalid engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
