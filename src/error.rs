//! Error taxonomy for the HTTP surface
//!
//! Validation and not-found are detected before any mutation; database and
//! other internal failures surface as 500 with a diagnostic detail. Upstream
//! archive failures never reach this type on the story read path - the
//! backfill swallows them - so `Upstream` only appears through the proxy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("upstream error: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("{0}")]
    Internal(String),
}

/// JSON error body: `{"message": "...", "error": "..."}`
#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Database(e) => {
                error!("Database error: {}", e);
                ErrorBody {
                    message: "Server error".to_string(),
                    error: Some(e.to_string()),
                }
            }
            ApiError::Upstream(e) => {
                error!("Upstream error: {}", e);
                ErrorBody {
                    message: "Upstream request failed".to_string(),
                    error: Some(e.to_string()),
                }
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                ErrorBody {
                    message: "Server error".to_string(),
                    error: Some(msg.clone()),
                }
            }
            other => ErrorBody {
                message: other.to_string(),
                error: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
