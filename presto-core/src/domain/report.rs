//! Report domain types
//!
//! What a caller asks to have rendered, on whose behalf, and the signature
//! used to recognise duplicate submissions of the same request.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::job::Origin;

/// Report parameters, kept sorted by name
pub type ReportParams = BTreeMap<String, String>;

/// Descriptive metadata the renderer needs besides the report identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInfo {
    #[serde(default)]
    pub title: String,

    /// Requested output format (e.g. "text", "csv")
    #[serde(default)]
    pub format: String,
}

/// A fully resolved report: which plugin renders it, and which report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTarget {
    pub plugin_ref: String,
    pub report_ref: String,
    #[serde(default)]
    pub info: ReportInfo,
}

impl ReportTarget {
    pub fn origin(&self) -> Origin {
        Origin {
            plugin_ref: self.plugin_ref.clone(),
            report_ref: self.report_ref.clone(),
        }
    }
}

/// The requester a dispatch is performed for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: String,

    /// Isolation key for duplicate detection (typically the caller's session)
    pub scope: String,

    /// Optional out-of-band destination for the rendered artifact
    pub delivery_target: Option<String>,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            scope: scope.into(),
            delivery_target: None,
        }
    }

    pub fn with_delivery_target(mut self, target: impl Into<String>) -> Self {
        self.delivery_target = Some(target.into());
        self
    }
}

/// Stable key of a logical report request
///
/// Two submissions of the same report with the same parameters produce the
/// same signature regardless of parameter order. Every field is hashed with
/// its length in front, so no choice of names or values can shift a field
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn of(target: &ReportTarget, params: &ReportParams) -> Self {
        Self::digest(target, params, None)
    }

    /// Signature of a request that also asks for direct delivery
    ///
    /// Without a delivery target this equals [`Signature::of`]. Requests
    /// naming different targets never share a render, since each completed
    /// job is delivered to its own target only.
    pub fn of_request(
        target: &ReportTarget,
        params: &ReportParams,
        delivery_target: Option<&str>,
    ) -> Self {
        Self::digest(target, params, delivery_target)
    }

    fn digest(target: &ReportTarget, params: &ReportParams, delivery_target: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        for part in [
            &target.plugin_ref,
            &target.report_ref,
            &target.info.title,
            &target.info.format,
        ] {
            update_field(&mut hasher, part.as_bytes());
        }
        hasher.update((params.len() as u64).to_be_bytes());
        for (name, value) in params {
            update_field(&mut hasher, name.as_bytes());
            update_field(&mut hasher, value.as_bytes());
        }
        if let Some(delivery_target) = delivery_target {
            hasher.update([1u8]);
            update_field(&mut hasher, delivery_target.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
