use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};
use serde_json::Value;

use crate::aggregate::ConfigurationResponse;
use crate::error::{ApiError, ApiResult};
use crate::handler::AppState;

pub async fn job_status(
    State(state): State<AppState>,
    job_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(job_id) = job_id.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    match state.jobs.job_status(job_id) {
        Some(status) => Ok(Json(status)),
        None => Err(ApiError::NotFound(format!("no job with id {}", job_id))),
    }
}

pub async fn configuration(State(state): State<AppState>) -> Json<ConfigurationResponse> {
    let response = state.aggregator.configuration().await;
    log_response("dshelper_configuration", &response);
    Json(response)
}

pub async fn configuration_v1(
    State(state): State<AppState>,
    Path(library_id): Path<String>,
) -> Json<ConfigurationResponse> {
    let response = state.aggregator.configuration_for_library(&library_id).await;
    log_response("dshelper_configuration_v1", &response);
    Json(response)
}

fn log_response(endpoint: &str, response: &ConfigurationResponse) {
    if tracing::enabled!(tracing::Level::DEBUG) {
        match serde_json::to_string(response) {
            Ok(body) => tracing::debug!("{} {}", endpoint, body),
            Err(e) => tracing::warn!("{} response not serializable: {}", endpoint, e),
        }
    }
}
