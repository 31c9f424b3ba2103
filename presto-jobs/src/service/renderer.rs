//! Renderer service
//!
//! The rendering engine is an opaque, possibly slow, possibly failing call
//! that turns a report target and its parameters into a file on disk.
//! [`TextRenderer`] is the built-in implementation: it writes a plain text or
//! CSV listing of the parameters.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use presto_core::domain::job::Artifact;
use presto_core::domain::report::{ReportParams, ReportTarget, RequestContext};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Everything a renderer needs to produce one report
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub target: ReportTarget,
    pub params: ReportParams,
    pub context: RequestContext,
}

/// Service trait for rendering reports
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders a report
    ///
    /// # Returns
    /// The produced file with its mime type and suggested download name
    async fn render(&self, request: &RenderRequest) -> Result<Artifact>;
}

/// Renders reports as plain text or CSV files
pub struct TextRenderer {
    output_dir: PathBuf,
    delay: Duration,
}

impl TextRenderer {
    /// Creates a renderer writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            delay: Duration::ZERO,
        }
    }

    /// Makes every render take at least `delay`
    ///
    /// Useful to exercise the polling path against a fast renderer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn layout(format: &str) -> Result<(&'static str, &'static str)> {
        match format {
            "" | "text" | "txt" => Ok(("txt", "text/plain")),
            "csv" => Ok(("csv", "text/csv")),
            other => bail!("Unsupported report format '{}'", other),
        }
    }

    fn body(request: &RenderRequest, format: &str) -> String {
        let mut out = String::new();
        if format == "csv" {
            out.push_str("parameter,value\n");
            for (name, value) in &request.params {
                out.push_str(&format!("{},{}\n", csv_field(name), csv_field(value)));
            }
            return out;
        }

        let title = if request.target.info.title.is_empty() {
            &request.target.report_ref
        } else {
            &request.target.info.title
        };
        out.push_str(&format!("{}\n", title));
        out.push_str(&format!("{}\n", "=".repeat(title.chars().count())));
        out.push_str(&format!(
            "report: {}/{}\n",
            request.target.plugin_ref, request.target.report_ref
        ));
        out.push_str(&format!("requested by: {}\n", request.context.user_id));
        if !request.params.is_empty() {
            out.push('\n');
            for (name, value) in &request.params {
                out.push_str(&format!("{} = {}\n", name, value));
            }
        }
        out
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[async_trait]
impl Renderer for TextRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<Artifact> {
        let (extension, mime_type) = Self::layout(&request.target.info.format)?;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.output_dir.display()))?;

        let path = self
            .output_dir
            .join(format!("{}-{}.{}", request.target.report_ref, Uuid::new_v4(), extension));
        let body = Self::body(request, &request.target.info.format);

        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("Rendered {}", path.display());

        Ok(Artifact {
            path,
            mime_type: mime_type.to_string(),
            suggested_file_name: format!("{}.{}", request.target.report_ref, extension),
        })
    }
}
