use axum::{Router, routing::get};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status/:job_id", get(handler::job_status))
        .route("/configuration", get(handler::configuration))
        .route("/1/configuration/:library_id", get(handler::configuration_v1))
}
