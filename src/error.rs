//! Application error type and its mapping to HTTP responses.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request body or parameters failed validation.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Bad login credentials, or a missing, invalid or stale bearer token.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Anything else. The message is logged on the server and not sent to the
    /// client.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) | AppError::Store(StoreError::IdsExhausted(_)) => {
                StatusCode::CONFLICT
            }
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Store(e @ StoreError::Corrupt { .. }) => {
                error!(error = %e, "user store corrupt");
                "User store is corrupt".to_string()
            }
            AppError::Store(e @ StoreError::IdsExhausted(_)) => {
                error!(error = %e, "user ids exhausted");
                "No user ids left".to_string()
            }
            AppError::Store(e) => {
                error!(error = %e, "user store failure");
                "Internal server error".to_string()
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
