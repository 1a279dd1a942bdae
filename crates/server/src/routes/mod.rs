//! API route handlers for the datajobs server.

pub mod data_jobs;
pub mod health;
pub mod metrics;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - GET    /api/health - Health check with per-status job counts
/// - GET    /api/dataJobs - List all jobs
/// - GET    /api/dataJobs/{status} - List jobs in one status
/// - GET    /api/dataJob/{id} - Get one job
/// - POST   /api/dataJob - Create a job
/// - PUT    /api/dataJob - Update a job
/// - DELETE /api/dataJob/{id} - Delete a job
/// - POST   /api/dataJob/start/{id} - Start background processing
/// - GET    /api/dataJob/{id}/status - Current status
/// - GET    /api/dataJob/{id}/results - Processing results
/// - GET    /metrics - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router().merge(data_jobs::router()))
        .merge(metrics::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datajobs_store::{JobStore, SimulatedFileProcessor, StoreConfig};

    #[test]
    fn test_api_routes_creation() {
        let jobs = JobStore::new(Arc::new(SimulatedFileProcessor::default()), StoreConfig::default());
        let _router = api_routes(AppState::new(jobs));
    }
}
