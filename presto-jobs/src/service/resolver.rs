//! Print code resolution
//!
//! A print code is a short name for a report. Resolving it yields the report
//! target plus the final parameter set. Resolution happens before any job
//! exists; its failures go straight back to the caller.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use presto_core::domain::report::{ReportParams, ReportTarget};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// A print code turned into something renderable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReport {
    pub target: ReportTarget,
    pub params: ReportParams,
}

/// Service trait for resolving print codes
#[async_trait]
pub trait ReportResolver: Send + Sync {
    async fn resolve(&self, print_code: &str, params: ReportParams) -> Result<ResolvedReport>;
}

/// One print code in a catalog file
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub target: ReportTarget,

    /// Values used when the request does not supply the parameter
    #[serde(default)]
    pub defaults: ReportParams,

    /// Parameters that must be present after defaults are applied
    #[serde(default)]
    pub required: Vec<String>,
}

/// Resolves print codes from a fixed catalog
///
/// The catalog file is a JSON object mapping print codes to entries:
///
/// ```json
/// {
///   "invoice": {
///     "plugin_ref": "billing",
///     "report_ref": "invoice",
///     "info": { "title": "Invoice", "format": "text" },
///     "defaults": { "lang": "en" },
///     "required": ["id"]
///   }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CatalogResolver {
    entries: HashMap<String, CatalogEntry>,
}

impl CatalogResolver {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid catalog {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: HashMap<String, CatalogEntry> = serde_json::from_str(raw)?;
        Ok(Self { entries })
    }

    pub fn with_entry(mut self, print_code: impl Into<String>, entry: CatalogEntry) -> Self {
        self.entries.insert(print_code.into(), entry);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ReportResolver for CatalogResolver {
    async fn resolve(&self, print_code: &str, params: ReportParams) -> Result<ResolvedReport> {
        let entry = self
            .entries
            .get(print_code)
            .ok_or_else(|| anyhow!("Unknown print code '{}'", print_code))?;

        let mut merged = entry.defaults.clone();
        merged.extend(params);

        let missing: Vec<&str> = entry
            .required
            .iter()
            .filter(|name| !merged.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            bail!("Missing required parameter(s): {}", missing.join(", "));
        }

        Ok(ResolvedReport {
            target: entry.target.clone(),
            params: merged,
        })
    }
}
