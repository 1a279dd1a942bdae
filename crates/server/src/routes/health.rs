// crates/server/src/routes/health.rs
//! Health check endpoint for the API.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use datajobs_store::JobCounts;
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

/// Response for the health check endpoint.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub jobs: JobCounts,
    pub in_flight: usize,
    pub index_consistent: bool,
}

/// GET /api/health - Health check endpoint.
///
/// Reports `degraded` when the id and status indices disagree. Lock
/// timeouts propagate as 503.
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let jobs = state.jobs.counts().await?;
    let index_consistent = match state.jobs.check_consistency().await {
        Ok(()) => true,
        Err(e) if e.is_retryable() => return Err(e.into()),
        Err(_) => false,
    };

    Ok(Json(HealthResponse {
        status: if index_consistent { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        jobs,
        in_flight: state.jobs.in_flight(),
        index_consistent,
    }))
}

/// Create the health routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}
