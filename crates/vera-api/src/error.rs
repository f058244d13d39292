//! # API Error Types
//!
//! Maps [`VeraError`] families to HTTP status codes with a JSON body of the
//! form `{"error": {"code", "message", "details"?}}`. Messages of 5xx errors
//! are logged and replaced before they reach the client.

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vera_core::{ErrorClass, VeraError};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (`NOT_FOUND`, `VALIDATION_ERROR`, ...).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Extra context, client errors only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Arguments, proofs or payloads were rejected (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A key store, resolver or other backend failed (502).
    #[error("backend error: {0}")]
    Backend(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Backend(_) => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            match self {
                Self::Backend(_) => "A backend service failed".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<VeraError> for AppError {
    fn from(err: VeraError) -> Self {
        match err.class() {
            ErrorClass::NotFound => Self::NotFound(err.to_string()),
            ErrorClass::Validation => Self::Validation(err.to_string()),
            ErrorClass::Backend => Self::Backend(err.to_string()),
            ErrorClass::Configuration => Self::Internal(err.to_string()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        Self::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use vera_core::{BackendError, ConfigurationError, NotFoundError, ValidationError};

    async fn response_body(err: AppError) -> (StatusCode, ErrorBody) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn families_map_to_status_codes() {
        let cases: Vec<(VeraError, StatusCode)> = vec![
            (
                NotFoundError::MethodNotFound("x".into()).into(),
                StatusCode::NOT_FOUND,
            ),
            (
                ValidationError::Malformed("x".into()).into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                BackendError::Storage("disk full".into()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ConfigurationError::MissingPlugin("x".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_and_code().0, status);
        }
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let (status, body) = response_body(AppError::Validation("bad field".into())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error.code, "VALIDATION_ERROR");
        assert!(body.error.message.contains("bad field"));
    }

    #[tokio::test]
    async fn server_errors_hide_their_message() {
        let (status, body) = response_body(AppError::Backend("key store at /secret/path".into())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body.error.message.contains("/secret/path"));

        let (status, body) = response_body(AppError::Internal("lock poisoned".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
    }
}
