use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Everything a request can fail with, mapped to a fixed status code and a
/// stable `{"error": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("option does not belong to this poll")]
    InvalidOption,

    #[error("already voted in this poll")]
    AlreadyVoted,

    #[error("poll has ended")]
    PollEnded,

    #[error("authentication required")]
    Unauthenticated,

    #[error("access denied")]
    AccessDenied,

    #[error("poll not found")]
    PollNotFound,

    #[error("profile not found")]
    ProfileNotFound,

    /// The storage-level uniqueness constraint rejected a vote that passed
    /// the engine's pre-check. Distinct from [`ApiError::AlreadyVoted`] so
    /// the race path stays observable.
    #[error("vote already recorded")]
    DuplicateVote,

    #[error("storage unavailable")]
    Storage(#[from] sqlx::Error),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidOption | Self::AlreadyVoted | Self::PollEnded => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::PollNotFound | Self::ProfileNotFound => StatusCode::NOT_FOUND,
            Self::DuplicateVote => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Storage details go to the log, never into the response body.
        if let Self::Storage(source) = &self {
            error!(%source, "storage operation failed");
        }

        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
