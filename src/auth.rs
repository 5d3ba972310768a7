//! HTTP Basic authentication for the dshelper endpoints.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};

#[derive(Clone, Default)]
pub struct Credentials {
    users: Arc<BTreeMap<String, String>>,
}

impl Credentials {
    pub fn new(users: BTreeMap<String, String>) -> Self {
        Self { users: Arc::new(users) }
    }

    pub fn is_enabled(&self) -> bool {
        !self.users.is_empty()
    }

    /// Checks an `Authorization` header value, returning the user name.
    pub fn verify(&self, authorization: Option<&str>) -> ApiResult<String> {
        let encoded = authorization
            .and_then(|value| value.strip_prefix("Basic "))
            .ok_or_else(|| ApiError::Unauthorized("missing basic credentials".to_string()))?;

        let decoded = STANDARD
            .decode(encoded.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| ApiError::Unauthorized("malformed credentials".to_string()))?;

        let (user, password) = decoded
            .split_once(':')
            .ok_or_else(|| ApiError::Unauthorized("malformed credentials".to_string()))?;

        match self.users.get(user) {
            Some(expected) if expected == password => Ok(user.to_string()),
            _ => Err(ApiError::Unauthorized("invalid username or password".to_string())),
        }
    }
}

pub async fn require_auth(
    State(credentials): State<Credentials>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if credentials.is_enabled() {
        let authorization = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        match credentials.verify(authorization) {
            Ok(user) => tracing::debug!(user = %user, path = %request.uri().path(), "authenticated"),
            Err(e) => {
                tracing::info!(path = %request.uri().path(), "rejected request: {}", e);
                return Err(e);
            }
        }
    }

    Ok(next.run(request).await)
}
