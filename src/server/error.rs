//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for the tool-layer error type so route
//! handlers can return `Result<T, AppError>` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(castable_av::Error);

impl From<castable_av::Error> for AppError {
    fn from(e: castable_av::Error) -> Self {
        Self(e)
    }
}

impl AppError {
    /// A 400 response for malformed or out-of-bounds request input.
    pub fn validation(message: impl Into<String>) -> Self {
        Self(castable_av::Error::InvalidInput(message.into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use castable_av::Error;

        let (status, code) = match &self.0 {
            Error::FileNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Error::ToolNotFound { .. } => (StatusCode::SERVICE_UNAVAILABLE, "tool_unavailable"),
            Error::ToolFailed { .. } => (StatusCode::BAD_GATEWAY, "tool_error"),
            Error::ParseError { .. } | Error::Json(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "probe_unreadable")
            }
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "server error in API handler");
        }

        let body = json!({
            "error": self.0.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_produces_404() {
        let err = AppError::from(castable_av::Error::file_not_found("/media/x.mkv"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_produces_400() {
        let err = AppError::validation("path escapes the library root");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn tool_failure_produces_502() {
        let err = AppError::from(castable_av::Error::tool_failed("ffprobe", "boom"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
