//! Response handling.
//!
//! # Responsibilities
//! - Define the structured JSON error body returned by the gateway
//! - Map gateway-generated errors to HTTP responses
//!
//! # Design Decisions
//! - Upstream responses are streamed back unmodified
//! - Every gateway-generated error has the same shape, whatever its cause

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// JSON body of every error the gateway itself produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub message: String,
    pub error: String,
    /// ISO-8601, UTC, millisecond precision.
    pub timestamp: String,
    pub path: String,
    pub method: String,
}

impl ErrorBody {
    pub fn new(
        status: StatusCode,
        error: impl Into<String>,
        message: impl Into<String>,
        method: &Method,
        path: &str,
    ) -> Self {
        Self {
            status_code: status.as_u16(),
            message: message.into(),
            error: error.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            path: path.to_string(),
            method: method.to_string(),
        }
    }

    /// 404 for paths the gateway neither dispatches nor serves itself.
    pub fn not_found(method: &Method, path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "Not Found",
            format!("Cannot {} {}", method, path),
            method,
            path,
        )
    }
}

impl IntoResponse for ErrorBody {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
