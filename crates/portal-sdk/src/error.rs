//! SDK error types.
//!
//! [`SdkError`] is the single error type returned by every fallible
//! operation in the SDK.  HTTP-level failures are *not* errors at the
//! gateway layer (callers get the raw response); they only become
//! [`SdkError::Status`] once a facade decides a non-2xx is a failure.

use std::sync::Arc;

use reqwest::StatusCode;

/// Error type for all SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Invalid or missing configuration (e.g. no base address for a
    /// relative path).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level HTTP failure (connection refused, reset, …).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization / deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A payload failed model validation.
    #[error("invalid payload: {0}")]
    Model(#[from] portal_models::ModelError),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: StatusCode,
        /// Message from the response body, or a generic fallback.
        message: String,
    },

    /// The operation needs credentials and none are stored.
    #[error("not authenticated")]
    Unauthenticated,

    /// A background fetch task panicked or was aborted.
    #[error("background task failed: {0}")]
    Task(String),

    /// A failure observed by every caller that joined the same fetch.
    #[error(transparent)]
    Shared(Arc<SdkError>),
}

impl SdkError {
    /// The innermost error, looking through [`SdkError::Shared`].
    pub fn root(&self) -> &SdkError {
        match self {
            Self::Shared(inner) => inner.root(),
            other => other,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self.root() {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }

    /// `true` for a 401 answer or a missing session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.root(), Self::Unauthenticated)
            || self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_is_displayed_verbatim() {
        let err = SdkError::Status {
            status: StatusCode::FORBIDDEN,
            message: "admins only".into(),
        };
        assert_eq!(err.to_string(), "admins only");
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    }

    #[test]
    fn shared_errors_expose_their_root() {
        let inner = Arc::new(SdkError::Status {
            status: StatusCode::UNAUTHORIZED,
            message: "expired".into(),
        });
        let err = SdkError::Shared(Arc::clone(&inner));
        assert_eq!(err.to_string(), "expired");
        assert!(err.is_unauthorized());
        assert!(matches!(err.root(), SdkError::Status { .. }));
    }

    #[test]
    fn config_error_display() {
        let err = SdkError::Config("PORTAL_API_URL is not set".into());
        assert_eq!(
            err.to_string(),
            "configuration error: PORTAL_API_URL is not set"
        );
    }
}
