use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vetrina_api_types::ErrorBody;

use crate::application::AppError;
use crate::domain::error::DomainError;

/// JSON error envelope for the edge API.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "valid bearer token required")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        let status = error.status_code();
        let message = match &error {
            AppError::Domain(DomainError::NotFound { entity }) => {
                format!("{entity} not found")
            }
            AppError::NotFound => "resource not found".to_string(),
            AppError::Domain(DomainError::Validation { message }) => message.clone(),
            AppError::Validation(message) => message.clone(),
            // Internal detail stays in the logs, not on the wire.
            _ => {
                tracing::error!(error = %error, "request failed");
                "internal error".to_string()
            }
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
