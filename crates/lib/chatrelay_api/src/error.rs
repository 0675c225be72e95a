//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chatrelay_core::ChatError;
use thiserror::Error;

use crate::models::ErrorResponse;

/// Body sent when the inbound message is missing or blank.
pub const MESSAGE_REQUIRED: &str = "Message is required.";

/// Body sent for every downstream failure.
pub const UNAVAILABLE: &str = "Unable to get a response right now.";

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
///
/// Only fixed, user-safe strings reach the client. Internal detail stays in
/// the wrapped error for logging.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(&'static str),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, *m),
            AppError::Chat(_) => (StatusCode::INTERNAL_SERVER_ERROR, UNAVAILABLE),
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
        });
        (status, body).into_response()
    }
}
