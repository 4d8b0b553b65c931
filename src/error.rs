use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for the trade data service.
///
/// The first three variants are ingestion errors and only occur during
/// startup loading; the rest are per-request and map onto HTTP statuses.
#[derive(Debug)]
pub enum ServiceError {
    /// Source file or directory missing. Fatal at startup.
    NotFound(String),
    /// A row failed positional type conversion under the strict policy.
    MalformedRecord(String),
    /// A file or document could not be parsed as JSON.
    MalformedJson(String),
    Unauthorized,
    BadRequest(String),
    Internal(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "not_found: {msg}"),
            Self::MalformedRecord(msg) => write!(f, "malformed_record: {msg}"),
            Self::MalformedJson(msg) => write!(f, "malformed_json: {msg}"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::BadRequest(msg) => write!(f, "bad_request: {msg}"),
            Self::Internal(msg) => write!(f, "internal_error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Unauthorized => (StatusCode::FORBIDDEN, "Invalid API key".to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg)
            | Self::MalformedRecord(msg)
            | Self::MalformedJson(msg)
            | Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = json!({ "detail": detail });
        (status, axum::Json(body)).into_response()
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedJson(e.to_string())
    }
}
