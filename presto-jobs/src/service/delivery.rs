//! Direct delivery
//!
//! A job may carry a direct-delivery target (e.g. a printer queue). Once the
//! job completes, its artifact is handed to a [`DeliverySink`] exactly once,
//! in addition to being available to the caller.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use presto_core::domain::job::{Artifact, JobDescriptor};
use std::path::PathBuf;
use tracing::info;

/// Service trait for out-of-band artifact delivery
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(
        &self,
        target: &str,
        descriptor: &JobDescriptor,
        artifact: &Artifact,
    ) -> Result<()>;
}

/// Sink used when no delivery backend is configured
pub struct NoDelivery;

#[async_trait]
impl DeliverySink for NoDelivery {
    async fn deliver(
        &self,
        target: &str,
        descriptor: &JobDescriptor,
        _artifact: &Artifact,
    ) -> Result<()> {
        info!(
            "No delivery backend configured, job {} not sent to '{}'",
            descriptor.job_code, target
        );
        Ok(())
    }
}

/// Copies artifacts into `<spool_dir>/<target>/`
///
/// Something else (a print daemon, a mail relay) picks them up from there.
pub struct SpoolDelivery {
    spool_dir: PathBuf,
}

impl SpoolDelivery {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
        }
    }

    fn validate_target(target: &str) -> Result<()> {
        let valid = !target.is_empty()
            && target != "."
            && target != ".."
            && target
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            bail!("Invalid delivery target '{}'", target);
        }
        Ok(())
    }
}

#[async_trait]
impl DeliverySink for SpoolDelivery {
    async fn deliver(
        &self,
        target: &str,
        descriptor: &JobDescriptor,
        artifact: &Artifact,
    ) -> Result<()> {
        Self::validate_target(target)?;

        let queue = self.spool_dir.join(target);
        tokio::fs::create_dir_all(&queue)
            .await
            .with_context(|| format!("Failed to create spool queue {}", queue.display()))?;

        let destination = queue.join(format!(
            "{}-{}",
            descriptor.job_code, artifact.suggested_file_name
        ));
        tokio::fs::copy(&artifact.path, &destination)
            .await
            .with_context(|| format!("Failed to spool {}", artifact.path.display()))?;

        info!(
            "Delivered job {} to '{}' ({})",
            descriptor.job_code,
            target,
            destination.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presto_core::domain::job::{JobCode, Origin};

    fn completed(path: PathBuf) -> (JobDescriptor, Artifact) {
        let artifact = Artifact {
            path,
            mime_type: "text/plain".to_string(),
            suggested_file_name: "invoice.txt".to_string(),
        };
        let descriptor = JobDescriptor::new(
            JobCode::generate(),
            "alice",
            Origin {
                plugin_ref: "billing".to_string(),
                report_ref: "invoice".to_string(),
            },
            Some("printer-1".to_string()),
        )
        .completed(artifact.clone());
        (descriptor, artifact)
    }

    #[tokio::test]
    async fn test_spool_copies_artifact() {
        let out = tempfile::tempdir().unwrap();
        let spool = tempfile::tempdir().unwrap();
        let source = out.path().join("rendered.txt");
        std::fs::write(&source, "report body").unwrap();
        let (descriptor, artifact) = completed(source);

        SpoolDelivery::new(spool.path())
            .deliver("printer-1", &descriptor, &artifact)
            .await
            .unwrap();

        let expected = spool
            .path()
            .join("printer-1")
            .join(format!("{}-invoice.txt", descriptor.job_code));
        assert_eq!(std::fs::read_to_string(expected).unwrap(), "report body");
    }

    #[tokio::test]
    async fn test_spool_rejects_path_traversal() {
        let spool = tempfile::tempdir().unwrap();
        let (descriptor, artifact) = completed(PathBuf::from("/nonexistent"));
        let sink = SpoolDelivery::new(spool.path());

        for target in ["", "..", "../etc", "a/b"] {
            assert!(sink.deliver(target, &descriptor, &artifact).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_spool_reports_missing_artifact() {
        let spool = tempfile::tempdir().unwrap();
        let (descriptor, artifact) = completed(PathBuf::from("/nonexistent/file.txt"));

        let err = SpoolDelivery::new(spool.path())
            .deliver("printer-1", &descriptor, &artifact)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to spool"));
    }
}
