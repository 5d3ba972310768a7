use std::sync::Arc;

use axum::{
    Json, Router,
    http::Method,
    middleware,
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::aggregate::Aggregator;
use crate::auth::Credentials;
use crate::dshelper;
use crate::jobs::JobTracker;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobTracker>,
    pub aggregator: Arc<Aggregator>,
    pub credentials: Credentials,
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(serde_json::json!({"status": "ok"}))
}

/// The full application router.
pub fn app(state: AppState) -> Router {
    let dshelper_routes = dshelper::routes().route_layer(middleware::from_fn_with_state(
        state.credentials.clone(),
        crate::auth::require_auth,
    ));

    // the reader app may run in a browser on another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/", get(healthcheck))
        .nest("/dshelper", dshelper_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
