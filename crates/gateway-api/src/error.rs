//! # API Error Types
//!
//! Errors surfaced to gateway callers. Cache failures never appear here:
//! the cache layer is fail-open.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gateway_domain::{BackendService, RouteName, TransportFailure};
use serde_json::{Value, json};
use thiserror::Error;

/// API-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Backend could not be reached or gave an unusable answer
    #[error("{detail}: {backend} unreachable ({failure}): {cause}")]
    BackendUnreachable {
        route: RouteName,
        backend: BackendService,
        detail: &'static str,
        failure: TransportFailure,
        cause: String,
    },

    /// Backend answered with a non-success status
    #[error("{detail}: {backend} returned status {status}")]
    BackendRejected {
        route: RouteName,
        backend: BackendService,
        detail: &'static str,
        status: u16,
        body: String,
    },

    #[error("Key not found in cache: {0}")]
    KeyNotFound(String),

    /// Request body rejected before dispatch; status is the extractor's (400, 413, 415, 422)
    #[error("Invalid input: {message}")]
    InvalidInput { status: StatusCode, message: String },
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BackendUnreachable { failure, .. } => match failure {
                TransportFailure::Timeout => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            },
            // Backend status passed through; anything outside 4xx/5xx still
            // has to read as a server error
            Self::BackendRejected { status, .. } if (400..600).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::BackendRejected { .. } => StatusCode::BAD_GATEWAY,
            Self::KeyNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput { status, .. } => *status,
        }
    }

    /// Get machine-readable error code
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BackendUnreachable { .. } => "BACKEND_UNREACHABLE",
            Self::BackendRejected { .. } => "BACKEND_REJECTED",
            Self::KeyNotFound(_) => "KEY_NOT_FOUND",
            Self::InvalidInput { .. } => "INVALID_INPUT",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut error = json!({
            "message": self.to_string(),
            "code": self.error_code(),
            "status": status.as_u16(),
        });

        match &self {
            Self::BackendUnreachable { route, failure, .. } => {
                error["route"] = json!(route);
                error["failure"] = json!(failure);
            }
            Self::BackendRejected {
                route,
                status: backend_status,
                body,
                ..
            } => {
                error["route"] = json!(route);
                error["backend_status"] = json!(backend_status);
                // Keep the backend's diagnostics, structured when possible
                error["backend_body"] = serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.clone()));
            }
            Self::KeyNotFound(key) => {
                error["key"] = json!(key);
            }
            Self::InvalidInput { .. } => {}
        }

        (status, axum::Json(json!({ "error": error }))).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(status: u16) -> ApiError {
        ApiError::BackendRejected {
            route: RouteName::Train,
            backend: BackendService::ModelTraining,
            detail: "training failed",
            status,
            body: r#"{"detail": "boom"}"#.to_string(),
        }
    }

    #[test]
    fn test_rejected_status_preserved() {
        assert_eq!(rejected(500).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rejected(503).status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(rejected(422).status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(rejected(302).status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_unreachable_is_server_error() {
        let err = |failure| ApiError::BackendUnreachable {
            route: RouteName::Predict,
            backend: BackendService::ModelServing,
            detail: "inference failed",
            failure,
            cause: "connection refused".to_string(),
        };

        assert_eq!(err(TransportFailure::Connect).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err(TransportFailure::Timeout).status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err(TransportFailure::Malformed).status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_input_keeps_extractor_status() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            StatusCode::UNPROCESSABLE_ENTITY,
        ] {
            let err = ApiError::InvalidInput {
                status,
                message: "bad body".to_string(),
            };

            assert_eq!(err.status_code(), status);
            assert_eq!(err.error_code(), "INVALID_INPUT");
        }
    }

    #[test]
    fn test_error_message_names_operation() {
        let message = rejected(500).to_string();
        assert_eq!(message, "training failed: model-training returned status 500");
    }

    #[tokio::test]
    async fn test_error_body_keeps_backend_diagnostics() {
        let response = rejected(500).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error"]["code"], "BACKEND_REJECTED");
        assert_eq!(body["error"]["route"], "train");
        assert_eq!(body["error"]["backend_status"], 500);
        assert_eq!(body["error"]["backend_body"]["detail"], "boom");
    }
}
