use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::orchestrator::decommission::DecommissionError;
use crate::orchestrator::onboarding::OnboardingError;
use crate::orchestrator::store::StoreError;
use crate::services::encryption_service::CipherError;
use crate::services::token_service::TokenError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Probe failed: {0}")]
    ProbeFailed(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            // Probing failures are reported as client errors: the usual cause
            // is wrong credentials or an unreachable host.
            AppError::ProbeFailed(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {msg}"),
            ),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateName => AppError::Conflict("Resource name already exists".to_string()),
            StoreError::Database(msg) => AppError::DatabaseError(msg),
        }
    }
}

impl From<OnboardingError> for AppError {
    fn from(err: OnboardingError) -> Self {
        match err {
            OnboardingError::DuplicateName(name) => {
                AppError::Conflict(format!("Resource name already exists: {name}"))
            }
            OnboardingError::NotFound => AppError::NotFound("Resource not found".to_string()),
            OnboardingError::InvalidInput(msg) => AppError::InvalidInput(msg),
            OnboardingError::Probe(e) => AppError::ProbeFailed(format!("Auto-discovery failed: {e}")),
            OnboardingError::Cipher(e) => AppError::InternalServerError(e.to_string()),
            OnboardingError::Store(msg) => AppError::DatabaseError(msg),
        }
    }
}

impl From<DecommissionError> for AppError {
    fn from(err: DecommissionError) -> Self {
        match err {
            DecommissionError::NotFound => AppError::NotFound("Resource not found".to_string()),
            DecommissionError::Store(msg) => AppError::DatabaseError(msg),
        }
    }
}

impl From<CipherError> for AppError {
    fn from(err: CipherError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}
