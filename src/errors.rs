//! Application error type. Every handler returns `AppResult<T>`; the
//! `IntoResponse` impl maps each variant to a status code and a
//! `{ "error": "..." }` JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Please wait {0} seconds before requesting another link")]
    TooManyRequests(u64),

    /// A required secret or provider setting is missing from the environment.
    #[error("{0}")]
    Configuration(String),

    /// The transactional-email provider rejected or failed the send.
    #[error("Failed to send email: {0}")]
    Delivery(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(anyhow::anyhow!(e))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_)      => StatusCode::BAD_REQUEST,
            AppError::Unauthorized       => StatusCode::UNAUTHORIZED,
            AppError::NotFound           => StatusCode::NOT_FOUND,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Configuration(_)   => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Delivery(_)        => StatusCode::BAD_GATEWAY,
            AppError::Internal(_)        => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "Internal error");
                "Internal server error".to_owned()
            }
            AppError::Configuration(msg) => {
                tracing::error!(%msg, "Configuration error");
                msg.clone()
            }
            AppError::Delivery(msg) => {
                tracing::warn!(%msg, "Email delivery failed");
                self.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
