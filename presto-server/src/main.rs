//! Presto Server
//!
//! HTTP front end of the report-rendering job engine.
//!
//! Requests are answered with the rendered artifact when it is ready within
//! the wait window, and with a redirect to a pollable job otherwise.

use std::sync::Arc;

use anyhow::{Context, Result};
use presto_jobs::service::{
    CatalogResolver, DeliverySink, NoDelivery, ReportResolver, SpoolDelivery, TextRenderer,
};
use presto_jobs::{CacheSweeper, Config, DedupCache, Dispatcher, JobCache};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "presto_server=debug,presto_jobs=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Presto Server...");

    let config = Config::from_env();
    config.validate().expect("Invalid configuration");

    tracing::info!(
        "Loaded configuration: wait_window={:?}, job_cache_ttl={:?}, artifact_freshness={:?}",
        config.wait_window,
        config.job_cache_ttl,
        config.artifact_freshness
    );

    let (dispatcher, sweeper) = build(config).expect("Failed to initialize job engine");
    let _sweeper = sweeper.spawn();

    // Build router with all API endpoints
    let app = api::create_router(api::AppState::new(dispatcher));

    // Get bind address
    let addr = std::env::var("PRESTO_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

/// Wires the caches and collaborators described by `config`
fn build(config: Config) -> Result<(Arc<Dispatcher>, CacheSweeper)> {
    let jobs = Arc::new(JobCache::new());
    let dedup = Arc::new(DedupCache::new(config.artifact_freshness));

    let renderer =
        Arc::new(TextRenderer::new(config.output_dir.clone()).with_delay(config.render_delay));
    tracing::info!("Rendering into {}", config.output_dir.display());

    let resolver: Arc<dyn ReportResolver> = match &config.catalog_path {
        Some(path) => {
            let catalog = CatalogResolver::from_file(path).context("Failed to load catalog")?;
            tracing::info!("Loaded {} print code(s) from {}", catalog.len(), path.display());
            Arc::new(catalog)
        }
        None => {
            tracing::warn!("No print code catalog configured, only POST /report is usable");
            Arc::new(CatalogResolver::empty())
        }
    };

    let delivery: Arc<dyn DeliverySink> = match &config.spool_dir {
        Some(dir) => {
            tracing::info!("Spooling direct deliveries to {}", dir.display());
            Arc::new(SpoolDelivery::new(dir.clone()))
        }
        None => Arc::new(NoDelivery),
    };

    let sweeper = CacheSweeper::new(jobs.clone(), dedup.clone(), config.sweep_interval);
    let dispatcher = Dispatcher::new(config, jobs, dedup, renderer)
        .with_resolver(resolver)
        .with_delivery(delivery);

    Ok((Arc::new(dispatcher), sweeper))
}
