// crates/server/src/main.rs
//! Datajobs server binary.
//!
//! Serves the job API, runs file processing in the background, and on
//! Ctrl-C stops accepting requests before cancelling in-flight processing.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use datajobs_server::{create_app, init_metrics, AppState, ServerConfig};
use datajobs_store::{JobStore, SimulatedFileProcessor};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn,datajobs_server=info,datajobs_store=info";

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .compact()
        .init();

    let config = ServerConfig::parse();
    let startup_start = Instant::now();

    // Initialize Prometheus metrics
    init_metrics();

    let store_config = config.store_config();
    let processor = SimulatedFileProcessor::new(config.processing_delay());
    let jobs = JobStore::new(Arc::new(processor), store_config);
    let state = AppState::new(jobs.clone());
    let app = create_app(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        processing_delay_ms = config.processing_delay_ms,
        lock_timeout_secs = store_config.exclusive_lock_timeout.as_secs(),
        startup_ms = startup_start.elapsed().as_millis() as u64,
        "Datajobs server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let in_flight = jobs.in_flight();
    if in_flight > 0 {
        tracing::warn!(in_flight, "Cancelling in-flight processing; jobs stay in Processing");
    }
    jobs.shutdown().await;

    Ok(())
}
