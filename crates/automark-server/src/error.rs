//! HTTP error mapping.

use automark_core::GradeError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

/// Status used for every rejected request. Clients only distinguish success
/// from failure and read the message from the body.
pub const ERROR_STATUS: StatusCode = StatusCode::MULTIPLE_CHOICES;

const INTERNAL_MESSAGE: &str = "internal error";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Grade(#[from] GradeError),

    /// Challenge id in the path is not an integer.
    #[error("malformed challenge id '{0}'")]
    InvalidChallengeId(String),

    /// A blocking task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        ERROR_STATUS
    }

    /// Message sent to the client. Server-side failures are reported
    /// generically; their detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            Self::Grade(e) if e.is_client_error() => e.to_string(),
            Self::InvalidChallengeId(_) => self.to_string(),
            _ => INTERNAL_MESSAGE.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Grade(e) if e.is_client_error() => {
                warn!(kind = e.kind(), error = %e, "request rejected")
            }
            Self::InvalidChallengeId(_) => warn!(error = %self, "request rejected"),
            Self::Grade(e) => error!(kind = e.kind(), error = %e, "request failed"),
            Self::Task(_) => error!(error = %self, "request failed"),
        }
        let body = json!({ "error": self.public_message() });
        (self.status_code(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let err = ApiError::from(GradeError::UnknownUser {
            user: "ghost".into(),
        });
        assert_eq!(err.public_message(), "user 'ghost' is not registered.");
        assert_eq!(err.status_code(), StatusCode::MULTIPLE_CHOICES);
    }

    #[test]
    fn storage_errors_do_not_leak_details() {
        let err = ApiError::from(GradeError::Storage {
            message: "failed to write /srv/data/users/alice.json".into(),
        });
        assert_eq!(err.public_message(), "internal error");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::MULTIPLE_CHOICES);
    }

    #[test]
    fn bad_challenge_id_is_a_client_error() {
        let err = ApiError::InvalidChallengeId("abc".into());
        assert_eq!(err.public_message(), "malformed challenge id 'abc'");
    }
}
