//! Error responses of the mock backend.
//!
//! [`MockError`] implements [`axum::response::IntoResponse`] so handlers
//! can return `Result<…, MockError>` directly.  Bodies have the
//! `{"message": …}` shape the real backend uses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failure modes of the mock endpoints.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// Missing, unknown or revoked access token.
    #[error("unauthorized")]
    Unauthorized,

    /// Wrong email/password pair.
    #[error("Invalid email or password")]
    InvalidLogin,

    /// Unknown or already rotated refresh token.
    #[error("refresh token rejected")]
    RefreshRejected,

    /// No such entity.
    #[error("{0} not found")]
    NotFound(String),

    /// Failure injected through a knob.
    #[error("{0}")]
    Injected(String),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized | Self::InvalidLogin | Self::RefreshRejected => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Injected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::debug!(%status, error = %self, "mock request failed");
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
