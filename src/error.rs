use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("database connection failed: {0}")]
    Connection(String),
    #[error("missing svix headers")]
    MissingHeaders,
    #[error("webhook verification failed: {0}")]
    Verification(String),
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
    #[error("{0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("identity provider error: {0}")]
    IdentityProvider(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::MissingHeaders => (
                StatusCode::BAD_REQUEST,
                "Error occured -- no svix headers".to_string(),
            )
                .into_response(),
            AppError::Verification(_) | AppError::InvalidPayload(_) => {
                (StatusCode::BAD_REQUEST, "Error occured".to_string()).into_response()
            }
            // Repository and upstream failures are not distinguished for the caller.
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            )
                .into_response(),
        }
    }
}
