use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::views;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// The requesting user's Steam data is access-restricted.
    #[error("Steam profile is private")]
    PrivateProfile,

    #[error("Steam API unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid share link: {0}")]
    InvalidShareToken(String),

    #[error("Not signed in: {0}")]
    Unauthorized(String),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Every failing path renders a human-readable fragment; a bare transport
/// error must never reach the browser. Upstream trouble is reported with 200
/// so htmx swaps the notice into the page like any other fragment.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::PrivateProfile => (StatusCode::OK, views::private_profile_page()),
            AppError::ServiceUnavailable(_) => (
                StatusCode::OK,
                views::error_notice(
                    "Steam is not responding right now. Please try again in a moment.",
                ),
            ),
            AppError::InvalidShareToken(_) => (StatusCode::OK, views::invalid_link_notice()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, views::error_notice(msg)),
            AppError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                views::error_notice("Please sign in through Steam first."),
            ),
            AppError::Cache(_)
            | AppError::HttpClient(_)
            | AppError::Session(_)
            | AppError::Internal(_) => {
                tracing::error!(error = %self, "Unexpected failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    views::error_notice("Something went wrong on our end."),
                )
            }
        };

        (status, Html(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
