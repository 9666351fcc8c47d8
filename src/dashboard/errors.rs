use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::MonitorError;

impl MonitorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MonitorError::UnknownQueue(_) => StatusCode::NOT_FOUND,
            MonitorError::InvalidRange(_) | MonitorError::InvalidState(_) => StatusCode::BAD_REQUEST,
            MonitorError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            MonitorError::Storage(_) | MonitorError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Malformed query strings get the same JSON error shape as bad ranges.
impl From<QueryRejection> for MonitorError {
    fn from(rejection: QueryRejection) -> Self {
        MonitorError::InvalidRange(rejection.body_text())
    }
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            MonitorError::UnknownQueue(queue) => json!({
                "error": self.kind(),
                "queue": queue,
            }),
            other => json!({
                "error": other.kind(),
                "message": other.to_string(),
            }),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "dashboard request failed");
        }
        (status, Json(body)).into_response()
    }
}
