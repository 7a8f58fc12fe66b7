//! HTTP API handlers for the core service

pub mod discussion;
pub mod enrollments;
pub mod episodes;
pub mod health;
pub mod identity;
pub mod quizzes;
pub mod rewards;
pub mod rooms;

pub use health::health_routes;
pub use identity::Identity;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skillforge_common::Error;
use tracing::error;

/// Handler result carrying the common error taxonomy
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// HTTP wrapper for the common error taxonomy
///
/// Maps each error class to its status code and renders the body as
/// `{"error": "..."}`. Claim-gate failures surface as 409: they are
/// state conflicts, not header-conditional requests.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::PreconditionFailed(_) => StatusCode::CONFLICT,
            Error::Database(_)
            | Error::Io(_)
            | Error::Config(_)
            | Error::Transport(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
        }

        let body = Json(json!({
            "error": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}
