use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

use crate::extensions::ExtensionKind;

#[derive(Debug)]
pub enum LibraryError {
    UnknownLibrary(String),
    NotFound(String),
    Database(libsql::Error),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::error::Error for LibraryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use LibraryError::*;
        match self {
            Database(e) => Some(e),
            Io(e) => Some(e),
            Json(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LibraryError::*;
        match self {
            UnknownLibrary(s) => write!(f, "UnknownLibrary: {}", s),
            NotFound(s) => write!(f, "NotFound: {}", s),
            Database(e) => write!(f, "DatabaseError: {}", e),
            Io(e) => write!(f, "IoError: {}", e),
            Json(e) => write!(f, "JsonError: {}", e),
        }
    }
}

impl From<libsql::Error> for LibraryError {
    fn from(error: libsql::Error) -> Self {
        LibraryError::Database(error)
    }
}

impl From<std::io::Error> for LibraryError {
    fn from(error: std::io::Error) -> Self {
        LibraryError::Io(error)
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(error: serde_json::Error) -> Self {
        LibraryError::Json(error)
    }
}

#[derive(Debug)]
pub enum PrefsError {
    Io(std::io::Error),
    Json(serde_json::Error),
    LockPoisoned,
}

impl std::error::Error for PrefsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use PrefsError::*;
        match self {
            Io(e) => Some(e),
            Json(e) => Some(e),
            LockPoisoned => None,
        }
    }
}

impl fmt::Display for PrefsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PrefsError::*;
        match self {
            Io(e) => write!(f, "IoError: {}", e),
            Json(e) => write!(f, "JsonError: {}", e),
            LockPoisoned => write!(f, "LockPoisoned"),
        }
    }
}

impl From<std::io::Error> for PrefsError {
    fn from(error: std::io::Error) -> Self {
        PrefsError::Io(error)
    }
}

impl From<serde_json::Error> for PrefsError {
    fn from(error: serde_json::Error) -> Self {
        PrefsError::Json(error)
    }
}

#[derive(Debug)]
pub enum ExtensionError {
    /// The extension is not installed in this host.
    Unavailable(ExtensionKind),
    /// The extension has no library-scoped configuration.
    Unsupported(ExtensionKind),
    Prefs(PrefsError),
    Library(LibraryError),
}

impl std::error::Error for ExtensionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use ExtensionError::*;
        match self {
            Prefs(e) => Some(e),
            Library(e) => Some(e),
            Unavailable(_) | Unsupported(_) => None,
        }
    }
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ExtensionError::*;
        match self {
            Unavailable(k) => write!(f, "ExtensionUnavailable: {}", k),
            Unsupported(k) => write!(f, "Unsupported: {} has no library configuration", k),
            Prefs(e) => write!(f, "PrefsError: {}", e),
            Library(e) => write!(f, "LibraryError: {}", e),
        }
    }
}

impl From<PrefsError> for ExtensionError {
    fn from(error: PrefsError) -> Self {
        ExtensionError::Prefs(error)
    }
}

impl From<LibraryError> for ExtensionError {
    fn from(error: LibraryError) -> Self {
        ExtensionError::Library(error)
    }
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorDetails {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };

        if let ApiError::Unauthorized(_) = self {
            return (
                status,
                [(header::WWW_AUTHENTICATE, r#"Basic realm="dshelper""#)],
                Json(body),
            )
                .into_response();
        }

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
