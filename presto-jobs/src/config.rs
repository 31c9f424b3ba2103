//! Engine configuration
//!
//! Defines the timing parameters of the dispatch protocol and the locations
//! used by the standard collaborators.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Engine configuration
///
/// All windows are configurable to allow tuning for different deployments
/// (fast renderers vs. slow batch reports, chatty vs. patient clients).
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a dispatch blocks before switching the caller to polling
    pub wait_window: Duration,

    /// How long a finished job stays pollable after its last refresh
    pub job_cache_ttl: Duration,

    /// How long a rendered artifact is reused for identical requests
    pub artifact_freshness: Duration,

    /// How often the background sweeper runs
    pub sweep_interval: Duration,

    /// Where the text renderer writes artifacts
    pub output_dir: PathBuf,

    /// Spool directory for direct delivery (disabled when unset)
    pub spool_dir: Option<PathBuf>,

    /// JSON catalog of print codes
    pub catalog_path: Option<PathBuf>,

    /// Artificial delay added to every text render
    pub render_delay: Duration,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognised environment variables:
    /// - PRESTO_WAIT_WINDOW (optional, seconds, default: 10)
    /// - PRESTO_JOB_CACHE_TTL (optional, seconds, default: 600)
    /// - PRESTO_ARTIFACT_FRESHNESS (optional, seconds, default: 10)
    /// - PRESTO_SWEEP_INTERVAL (optional, seconds, default: 60)
    /// - PRESTO_OUTPUT_DIR (optional, default: <tmp>/presto)
    /// - PRESTO_SPOOL_DIR (optional)
    /// - PRESTO_CATALOG (optional)
    /// - PRESTO_RENDER_DELAY_MS (optional, milliseconds, default: 0)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        let render_delay = lookup("PRESTO_RENDER_DELAY_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.render_delay);

        Self {
            wait_window: secs("PRESTO_WAIT_WINDOW", defaults.wait_window),
            job_cache_ttl: secs("PRESTO_JOB_CACHE_TTL", defaults.job_cache_ttl),
            artifact_freshness: secs("PRESTO_ARTIFACT_FRESHNESS", defaults.artifact_freshness),
            sweep_interval: secs("PRESTO_SWEEP_INTERVAL", defaults.sweep_interval),
            output_dir: lookup("PRESTO_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            spool_dir: lookup("PRESTO_SPOOL_DIR").map(PathBuf::from),
            catalog_path: lookup("PRESTO_CATALOG").map(PathBuf::from),
            render_delay,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wait_window.is_zero() {
            return Err(ConfigError::Invalid(
                "wait_window must be greater than 0".to_string(),
            ));
        }

        if self.job_cache_ttl.is_zero() {
            return Err(ConfigError::Invalid(
                "job_cache_ttl must be greater than 0".to_string(),
            ));
        }

        if self.artifact_freshness.is_zero() {
            return Err(ConfigError::Invalid(
                "artifact_freshness must be greater than 0".to_string(),
            ));
        }

        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "sweep_interval must be greater than 0".to_string(),
            ));
        }

        if self.artifact_freshness > self.job_cache_ttl {
            return Err(ConfigError::Invalid(
                "artifact_freshness must not exceed job_cache_ttl".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wait_window: Duration::from_secs(10),
            job_cache_ttl: Duration::from_secs(600),
            artifact_freshness: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(60),
            output_dir: std::env::temp_dir().join("presto"),
            spool_dir: None,
            catalog_path: None,
            render_delay: Duration::ZERO,
        }
    }
}
