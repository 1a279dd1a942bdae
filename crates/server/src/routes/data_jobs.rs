// crates/server/src/routes/data_jobs.rs
//! Data job endpoints.
//!
//! - GET    /dataJobs - all jobs
//! - GET    /dataJobs/{status} - jobs in one status
//! - GET    /dataJob/{id} - one job
//! - POST   /dataJob - create
//! - PUT    /dataJob - update
//! - DELETE /dataJob/{id} - delete
//! - POST   /dataJob/start/{id} - start background processing
//! - GET    /dataJob/{id}/status - current status
//! - GET    /dataJob/{id}/results - processing results

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use datajobs_store::{Job, JobId, JobStatus};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::metrics::RequestTimer;
use crate::state::AppState;

/// Response for `POST /dataJob/start/{id}`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartResponse {
    pub started: bool,
}

fn parse_id(raw: &str) -> ApiResult<JobId> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid job id: {raw}")))
}

fn parse_status(raw: &str) -> ApiResult<JobStatus> {
    raw.parse().map_err(|e| ApiError::BadRequest(format!("{e}")))
}

fn json_body(body: Result<Json<Job>, JsonRejection>) -> ApiResult<Job> {
    body.map(|Json(job)| job)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// GET /api/dataJobs
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Job>>> {
    let timer = RequestTimer::new("list_jobs");
    let result = state.jobs.list_all().await;
    timer.finish_result(&result);
    Ok(Json(result?))
}

/// GET /api/dataJobs/{status}
///
/// Accepts status names in any case or their numeric codes (`0`, `1`, `2`).
pub async fn list_jobs_by_status(
    State(state): State<Arc<AppState>>,
    Path(status): Path<String>,
) -> ApiResult<Json<Vec<Job>>> {
    let status = parse_status(&status)?;
    let timer = RequestTimer::new("list_jobs_by_status");
    let result = state.jobs.list_by_status(status).await;
    timer.finish_result(&result);
    Ok(Json(result?))
}

/// GET /api/dataJob/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    let id = parse_id(&id)?;
    let timer = RequestTimer::new("get_job");
    let result = state.jobs.get(id).await;
    timer.finish_result(&result);
    Ok(Json(result?))
}

/// POST /api/dataJob
///
/// An omitted id is generated. The stored job always starts as `New`.
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Job>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let job = json_body(body)?;
    let timer = RequestTimer::new("create_job");
    let result = state.jobs.create(job).await;
    timer.finish_result(&result);
    Ok((StatusCode::CREATED, Json(result?)))
}

/// PUT /api/dataJob
pub async fn update_job(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Job>, JsonRejection>,
) -> ApiResult<Json<Job>> {
    let job = json_body(body)?;
    if job.id.is_nil() {
        return Err(ApiError::BadRequest("job id is required".to_string()));
    }
    let timer = RequestTimer::new("update_job");
    let result = state.jobs.update(job).await;
    timer.finish_result(&result);
    Ok(Json(result?))
}

/// DELETE /api/dataJob/{id}
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    let timer = RequestTimer::new("delete_job");
    let result = state.jobs.delete(id).await;
    timer.finish_result(&result);
    result?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/dataJob/start/{id}
///
/// 202 when processing was dispatched, 200 with `started: false` when the
/// job had already been started.
pub async fn start_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<StartResponse>)> {
    let id = parse_id(&id)?;
    let timer = RequestTimer::new("start_job");
    let result = state.jobs.start_background_process(id).await;
    timer.finish_result(&result);

    let started = result?;
    let status = if started {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(StartResponse { started })))
}

/// GET /api/dataJob/{id}/status
pub async fn get_job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobStatus>> {
    let id = parse_id(&id)?;
    let timer = RequestTimer::new("get_job_status");
    let result = state.jobs.get_status(id).await;
    timer.finish_result(&result);
    Ok(Json(result?))
}

/// GET /api/dataJob/{id}/results
pub async fn get_job_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let id = parse_id(&id)?;
    let timer = RequestTimer::new("get_job_results");
    let result = state.jobs.get_results(id).await;
    timer.finish_result(&result);
    Ok(Json(result?))
}

/// Build the data job router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dataJobs", get(list_jobs))
        .route("/dataJobs/{status}", get(list_jobs_by_status))
        .route("/dataJob", post(create_job).put(update_job))
        .route("/dataJob/{id}", get(get_job).delete(delete_job))
        .route("/dataJob/start/{id}", post(start_job))
        .route("/dataJob/{id}/status", get(get_job_status))
        .route("/dataJob/{id}/results", get(get_job_results))
}
