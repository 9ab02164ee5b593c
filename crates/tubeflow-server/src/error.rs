//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::pipeline::error::AdmissionError;

/// Result type alias for handlers
pub type ApiResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Admission(err) => match err {
                AdmissionError::Busy => (StatusCode::CONFLICT, "BUSY"),
                AdmissionError::NotReady => (StatusCode::CONFLICT, "NOT_READY"),
                AdmissionError::InvalidIndex { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_INDEX")
                },
                AdmissionError::InvalidChannel => (StatusCode::BAD_REQUEST, "INVALID_CHANNEL"),
                AdmissionError::WorkerUnavailable => {
                    (StatusCode::SERVICE_UNAVAILABLE, "WORKER_UNAVAILABLE")
                },
            },
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = match self {
            AppError::Admission(AdmissionError::InvalidIndex { index, len }) => {
                ErrorResponse::with_details(
                    code,
                    self.to_string(),
                    json!({ "index": index, "available": len }),
                )
            },
            ref other => {
                tracing::debug!(code, "Request rejected: {}", other);
                ErrorResponse::new(code, other.to_string())
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_mapping() {
        let cases = [
            (AdmissionError::Busy, StatusCode::CONFLICT, "BUSY"),
            (AdmissionError::NotReady, StatusCode::CONFLICT, "NOT_READY"),
            (
                AdmissionError::InvalidIndex { index: 5, len: 3 },
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_INDEX",
            ),
            (AdmissionError::InvalidChannel, StatusCode::BAD_REQUEST, "INVALID_CHANNEL"),
            (
                AdmissionError::WorkerUnavailable,
                StatusCode::SERVICE_UNAVAILABLE,
                "WORKER_UNAVAILABLE",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(AppError::from(err).status_and_code(), (status, code));
        }
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::from(AdmissionError::Busy).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::BadRequest("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
